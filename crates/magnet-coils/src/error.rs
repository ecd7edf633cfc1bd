use field_solver::{Axis, SolveError};
use thiserror::Error;

use crate::output::OutputError;

#[derive(Debug, Error)]
pub enum CoilsError {
    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("{axis} coil voltage {voltage} V outside range [{min}, {max}] V of channel {channel}")]
    ChannelRange {
        axis: Axis,
        channel: String,
        voltage: f64,
        min: f64,
        max: f64,
    },

    #[error("analog output failed: {0}")]
    Output(#[from] OutputError),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}
