//! Field and coil axes

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three field axes. Coil `X` is the coil primarily responsible
/// for the x field, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Row/column index of this axis in vectors and the calibration matrix
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered set of axes, displayed comma separated (`x,z`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisList(pub Vec<Axis>);

impl AxisList {
    /// Collect the axes whose component satisfies `predicate`
    pub fn matching(mut predicate: impl FnMut(Axis) -> bool) -> Self {
        Self(Axis::ALL.into_iter().filter(|&axis| predicate(axis)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.0.contains(&axis)
    }

    pub fn as_slice(&self) -> &[Axis] {
        &self.0
    }
}

impl fmt::Display for AxisList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|axis| axis.name()).collect();
        f.write_str(&names.join(","))
    }
}
