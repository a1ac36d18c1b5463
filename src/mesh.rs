//! The uniform Cartesian mesh and the selectable execution backend.

use crate::error::Error;

/// Grid dimensions and uniform cell widths. The present scheme assumes
/// `dx == dy`; `Mesh::new` enforces this.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mesh {
    pub ni: i64,
    pub nj: i64,
    pub dx: f64,
    pub dy: f64,
}

impl Mesh {
    pub fn new(ni: i64, nj: i64, dx: f64, dy: f64) -> anyhow::Result<Self> {
        if ni <= 0 || nj <= 0 {
            return Err(Error::InvalidMeshDimensions { ni, nj }.into());
        }
        if (dx - dy).abs() > 1e-12 * dx.abs().max(dy.abs()).max(1.0) {
            return Err(Error::NonSquareMesh { dx, dy }.into());
        }
        Ok(Self { ni, nj, dx, dy })
    }

    /// Cell-center coordinate of cell `(i, j)`, measured from the
    /// domain's lower corner. Out-of-range indexes (including guard
    /// cells) are allowed.
    pub fn cell_center(&self, i: i64, j: i64) -> (f64, f64) {
        ((i as f64 + 0.5) * self.dx, (j as f64 + 0.5) * self.dy)
    }

    pub fn shape(&self) -> (i64, i64) {
        (self.ni, self.nj)
    }
}

/// Backend a pass (`advance_rk`, `limit_slopes`, `wavespeed`) is
/// dispatched on. Per-cell work is identical across all three; only
/// the iteration strategy differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExecutionMode {
    Cpu,
    Omp,
    Gpu,
}

impl ExecutionMode {
    /// Whether this mode's backend is compiled into this build. `Gpu`
    /// is only available behind the `gpu` feature; requesting it
    /// otherwise is a documented no-op rather than an error.
    pub fn is_available(self) -> bool {
        match self {
            ExecutionMode::Cpu | ExecutionMode::Omp => true,
            ExecutionMode::Gpu => cfg!(feature = "gpu"),
        }
    }
}
