//! Per-cell maximum signal speed, used by a driver to pick a
//! CFL-stable timestep.

use crate::cell::Cell;
use crate::constants::NCONS;
use crate::dispatch::for_each_interior_cell;
use crate::error::{Error, Result};
use crate::mesh::{ExecutionMode, Mesh};
use crate::patch::PatchView;
use crate::primitive::Conserved;

fn reconstruct_mean(weights: &[f64], n_poly: usize) -> Conserved {
    let mut u = [0.0; NCONS];
    for q in 0..NCONS {
        u[q] = weights[q * n_poly];
    }
    Conserved::from(u)
}

/// Writes each interior cell's maximum wavespeed (evaluated at its
/// mean state) into `out`, which must have one entry per interior cell
/// in row-major `(i, j)` order with no guard layer.
pub fn wavespeed(cell: &Cell, mesh: &Mesh, weights: &PatchView, out: &mut [f64], gamma: f64, mode: ExecutionMode) -> Result<()> {
    let num_fields = NCONS * cell.n_poly();
    if weights.count() != (mesh.ni + 2, mesh.nj + 2) {
        return Err(Error::ShapeMismatch { ni: weights.count().0, nj: weights.count().1, mesh_ni: mesh.ni, mesh_nj: mesh.nj });
    }
    if weights.num_fields() != num_fields {
        return Err(Error::FieldWidthMismatch { expected: num_fields, actual: weights.num_fields() });
    }
    let (ni, nj) = mesh.shape();
    if out.len() != (ni * nj) as usize {
        return Err(Error::ShapeMismatch { ni, nj, mesh_ni: ni, mesh_nj: nj });
    }

    if !mode.is_available() {
        return Ok(());
    }

    let n_poly = cell.n_poly();
    match mode {
        ExecutionMode::Cpu | ExecutionMode::Gpu => {
            for i in 0..ni {
                for j in 0..nj {
                    let u = reconstruct_mean(weights.get((i, j)), n_poly);
                    out[(i * nj + j) as usize] = u.to_primitive(gamma).max_wavespeed(gamma);
                }
            }
        }
        ExecutionMode::Omp => {
            use rayon::prelude::*;
            out.par_chunks_mut(nj as usize).enumerate().for_each(|(i, row)| {
                for (j, slot) in row.iter_mut().enumerate() {
                    let u = reconstruct_mean(weights.get((i as i64, j as i64)), n_poly);
                    *slot = u.to_primitive(gamma).max_wavespeed(gamma);
                }
            });
        }
    }
    Ok(())
}

/// The largest value in `data`, reduced sequentially or with `rayon`
/// depending on `mode`. The GPU backend does not support this
/// reduction; requesting it is a no-op that leaves
/// `None`.
pub fn maximum(data: &[f64], mode: ExecutionMode) -> Option<f64> {
    match mode {
        ExecutionMode::Cpu => data.iter().copied().fold(None, |acc, x| Some(acc.map_or(x, |a: f64| a.max(x)))),
        ExecutionMode::Omp => {
            use rayon::prelude::*;
            data.par_iter().copied().reduce_with(f64::max)
        }
        ExecutionMode::Gpu => None,
    }
}

#[allow(dead_code)]
fn unused_generic_dispatch_hint(ni: i64, nj: i64, mode: ExecutionMode) {
    for_each_interior_cell(ni, nj, mode, |_, _| {});
}
