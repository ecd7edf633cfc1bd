//! magnet-coils: CLI tool for solving coil voltages from a field setpoint
//!
//! Runs against an in-memory analog output, so it is safe to use away from
//! the bench to check what a setpoint would write.

use anyhow::{Context, Result};
use clap::Parser;
use field_solver::Axis;
use magnet_coils::{FieldUpdate, MagnetCoils, MagnetCoilsSettings, RecordingOutput};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "magnet-coils")]
#[command(about = "Solve magnet coil voltages for a requested field")]
#[command(version)]
struct Args {
    /// Driver settings JSON file (defaults to the bench settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// x field in Gauss
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,

    /// y field in Gauss
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,

    /// z field in Gauss
    #[arg(long, allow_negative_numbers = true)]
    z: Option<f64>,

    /// Fail on unreachable fields instead of approximating
    #[arg(long)]
    strict: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_settings: bool,
}

#[derive(Serialize)]
struct Report {
    requested_field: [f64; 3],
    voltages: [f64; 3],
    achieved_field: [f64; 3],
    reachable: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => MagnetCoilsSettings::from_json_file(path)
            .with_context(|| format!("Failed to load settings: {:?}", path))?,
        None => MagnetCoilsSettings::default(),
    };
    if args.strict {
        settings.use_approximate_fields = false;
    }

    if args.print_settings {
        println!("{}", settings.to_json()?);
        return Ok(());
    }

    let mut coils = MagnetCoils::new(settings, RecordingOutput::new())
        .context("Invalid coil settings")?;

    let target = FieldUpdate {
        x: args.x,
        y: args.y,
        z: args.z,
    }
    .apply_to(&coils.field());
    let solution = coils.set_field(target).with_context(|| {
        format!("Cannot output field ({}, {}, {}) G", target.x, target.y, target.z)
    })?;
    let achieved = coils.calibration().field_for(&solution.voltages);

    if args.json {
        let report = Report {
            requested_field: target.into(),
            voltages: solution.voltages.into(),
            achieved_field: achieved.into(),
            reachable: solution.reachable,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for axis in Axis::ALL {
            println!(
                "{} coil ({}): {:.6} V",
                axis,
                coils.settings().magnet_channels.channel_for(axis),
                solution.voltages[axis.index()]
            );
        }
        if !solution.reachable {
            println!(
                "Requested field not reachable, closest field ({:.3}, {:.3}, {:.3}) G",
                achieved.x, achieved.y, achieved.z
            );
        }
    }

    Ok(())
}
