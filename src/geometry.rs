//! The two axial directions the DG scheme sweeps over.

/// Cardinal sweep direction on the Cartesian mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    X,
    Y,
}

impl Direction {
    /// Index of this direction's velocity component within a `Primitive`
    /// or momentum component within a `Conserved` (0-based, after density).
    pub fn index(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
        }
    }
}
