//! Structural error type for the core's fallible entry points.
//!
//! Physically-invalid floating point states (negative density or
//! pressure) are not represented here: per the design notes, those
//! propagate as NaNs rather than as `Result::Err`. This type only names
//! the handful of structural misuses a caller can make before a single
//! kernel pass even starts.

/// Errors raised by the core's constructors and dispatch entry points.
///
/// `Cell::new` and `Mesh::new` return `anyhow::Result`, wrapping a
/// variant here with `.into()` so a caller gets a `Display`-able chain
/// while tests can still recover the original variant via
/// `anyhow::Error::downcast_ref`. The per-pass dispatch entry points
/// (`advance_rk`, `limit_slopes`, `wavespeed`) have no such wrapping to
/// do and return `Result<(), Error>` directly.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("cell order {0} is out of range; must be in 1..=5")]
    InvalidOrder(u32),

    #[error("node data length {actual} does not match the {expected} points required by order {order}")]
    NodeDataLength { order: u32, expected: usize, actual: usize },

    #[error("mesh dimensions must be positive, got ({ni}, {nj})")]
    InvalidMeshDimensions { ni: i64, nj: i64 },

    #[error("mesh requires dx == dy, got ({dx}, {dy})")]
    NonSquareMesh { dx: f64, dy: f64 },

    #[error("patch shape ({ni}, {nj}) does not match mesh shape ({mesh_ni}, {mesh_nj})")]
    ShapeMismatch { ni: i64, nj: i64, mesh_ni: i64, mesh_nj: i64 },

    #[error("read and write patches alias the same storage")]
    AliasedPatches,

    #[error("patch field width {actual} does not match the {expected} fields required for this cell")]
    FieldWidthMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
