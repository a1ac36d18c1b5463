//! A 2-D discontinuous Galerkin core for the compressible Euler
//! equations on a uniform Cartesian mesh: modal polynomial cells,
//! HLLE/HLLC numerical fluxes, a TVB slope limiter, and a dispatch
//! shell selectable between sequential, multi-threaded, and
//! (feature-gated) GPU execution.
//!
//! This crate owns the per-substep numerics; a driver (time stepping,
//! initial conditions, I/O, checkpointing) is out of scope.

pub mod cell;
pub mod constants;
pub mod dg;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod limiter;
pub mod mesh;
pub mod patch;
pub mod primitive;
pub mod wavespeed;

pub use cell::{Cell, Face, NodeData};
pub use constants::{GAMMA, NCONS, NUM_GUARD};
pub use error::{Error, Result};
pub use geometry::Direction;
pub use mesh::{ExecutionMode, Mesh};
pub use patch::{Patch, PatchView, PatchViewMut};
pub use primitive::{Conserved, Primitive, RiemannSolver};

pub use dg::advance_rk;
pub use limiter::{limit_slopes, limit_slopes_conserved};
pub use wavespeed::{maximum, wavespeed};
