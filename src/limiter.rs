//! The TVB (total-variation-bounded) slope limiter, in both its
//! conserved-variable and characteristic-variable forms. Grounded in
//! the minmod-slope reconstruction shape of `tbreslein-corries`'s
//! Kurganov-Tadmor flux (`numflux/kt.rs`), adapted
//! to a modal DG setting: the limiter acts on a cell's linear modes
//! rather than on face-reconstructed values.
//!
//! For a modal basis in total-degree order, mode `0` is the cell mean,
//! mode `1` the y-slope, and mode `2` the x-slope; limiting only ever
//! touches these three modes directly, and zeroes every mode of degree
//! two and up when a slope is altered (the classical Cockburn-Shu
//! "troubled cell falls back to piecewise-linear" rule).

use crate::cell::Cell;
use crate::constants::{LIMITER_BETA, NCONS, TVB_M_CHARACTERISTIC};
use crate::dispatch::for_each_interior_cell;
use crate::error::{Error, Result};
use crate::geometry::Direction;
use crate::mesh::{ExecutionMode, Mesh};
use crate::patch::{PatchView, PatchViewMut};
use crate::primitive::{Conserved, Primitive};

const MODE_MEAN: usize = 0;
const MODE_Y: usize = 1;
const MODE_X: usize = 2;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Core of both minmod variants: returns `a` unmodified whenever it is
/// already smaller than the parabola `m * h^2` dictates (a cell deemed
/// smooth), and the ordinary three-argument minmod of `(a, b, c)`
/// otherwise.
fn minmod_core(a: f64, b: f64, c: f64, m: f64, h: f64) -> f64 {
    if a.abs() <= m * h * h {
        return a;
    }
    minmod3(a, b, c)
}

fn minmod3(a: f64, b: f64, c: f64) -> f64 {
    if a.signum() == b.signum() && b.signum() == c.signum() {
        a.signum() * a.abs().min(b.abs()).min(c.abs())
    } else {
        0.0
    }
}

/// TVB minmod limiter on a conserved-variable slope `w1` against its
/// neighbor means `w0l`, `w0`, `w0r` across a cell of width `dl`. The
/// slope is rescaled by `sqrt(3)` before both the smoothness test and
/// the minmod selection (the modal-to-nodal scaling that makes the TVB
/// parameter `m` comparable to the nodal slope literature), and the
/// result is rescaled back down before it's returned.
fn minmod_tvb(w1: f64, w0l: f64, w0: f64, w0r: f64, m: f64, dl: f64) -> f64 {
    let a = w1 * SQRT_3;
    let b = (w0 - w0l) * LIMITER_BETA;
    let c = (w0r - w0) * LIMITER_BETA;
    minmod_core(a, b, c, m, dl) / SQRT_3
}

/// TVB minmod limiter on an already-rescaled characteristic-variable
/// slope. Unlike [`minmod_tvb`], the caller is responsible for the
/// `sqrt(3)` scale-in (on `a`) and scale-out (on the result): the two
/// variants differ in where that rescaling happens, not in the
/// underlying minmod shape.
fn minmod_b(a: f64, b: f64, c: f64, dl: f64) -> f64 {
    minmod_core(a, b, c, TVB_M_CHARACTERISTIC, dl)
}

/// Left eigenvectors of the Euler flux Jacobian along `direction`,
/// linearized about `p`, as rows acting on a conserved-variable vector
/// (density, x-momentum, y-momentum, energy). `L * R` is the identity.
fn left_eigenvectors(p: Primitive, direction: Direction, gamma: f64) -> [[f64; NCONS]; NCONS] {
    let (u, v) = (p.velocity_x(), p.velocity_y());
    let cs = p.sound_speed(gamma);
    let b1 = (gamma - 1.0) / (cs * cs);
    let q2 = u * u + v * v;
    let b2 = 0.5 * b1 * q2;

    match direction {
        Direction::X => [
            [0.5 * (b2 + u / cs), -0.5 * (b1 * u + 1.0 / cs), -0.5 * b1 * v, 0.5 * b1],
            [1.0 - b2, b1 * u, b1 * v, -b1],
            [-v, 0.0, 1.0, 0.0],
            [0.5 * (b2 - u / cs), -0.5 * (b1 * u - 1.0 / cs), -0.5 * b1 * v, 0.5 * b1],
        ],
        Direction::Y => [
            [0.5 * (b2 + v / cs), -0.5 * b1 * u, -0.5 * (b1 * v + 1.0 / cs), 0.5 * b1],
            [1.0 - b2, b1 * u, b1 * v, -b1],
            [-u, 1.0, 0.0, 0.0],
            [0.5 * (b2 - v / cs), -0.5 * b1 * u, -0.5 * (b1 * v - 1.0 / cs), 0.5 * b1],
        ],
    }
}

/// Right eigenvectors (columns, returned row-major so `right[k]` is the
/// `k`-th eigenvector) of the same Jacobian, the inverse of
/// [`left_eigenvectors`].
fn right_eigenvectors(p: Primitive, direction: Direction, gamma: f64) -> [[f64; NCONS]; NCONS] {
    let (u, v) = (p.velocity_x(), p.velocity_y());
    let cs = p.sound_speed(gamma);
    let h = (p.to_conserved(gamma).energy() + p.gas_pressure()) / p.mass_density();
    let half_q2 = 0.5 * (u * u + v * v);

    match direction {
        Direction::X => [
            [1.0, u - cs, v, h - u * cs],
            [1.0, u, v, half_q2],
            [0.0, 0.0, 1.0, v],
            [1.0, u + cs, v, h + u * cs],
        ],
        Direction::Y => [
            [1.0, u, v - cs, h - v * cs],
            [1.0, u, v, half_q2],
            [0.0, 1.0, 0.0, u],
            [1.0, u, v + cs, h + v * cs],
        ],
    }
}

fn apply_left(l: &[[f64; NCONS]; NCONS], u: [f64; NCONS]) -> [f64; NCONS] {
    let mut out = [0.0; NCONS];
    for (k, row) in l.iter().enumerate() {
        out[k] = row.iter().zip(u.iter()).map(|(a, b)| a * b).sum();
    }
    out
}

fn apply_right(r: &[[f64; NCONS]; NCONS], w: [f64; NCONS]) -> [f64; NCONS] {
    let mut out = [0.0; NCONS];
    for (k, col) in r.iter().enumerate() {
        for (q, v) in col.iter().enumerate() {
            out[q] += v * w[k];
        }
    }
    out
}

fn mean(weights: &[f64], n_poly: usize) -> [f64; NCONS] {
    let mut m = [0.0; NCONS];
    for q in 0..NCONS {
        m[q] = weights[q * n_poly + MODE_MEAN];
    }
    m
}

fn slope(weights: &[f64], n_poly: usize, mode: usize) -> [f64; NCONS] {
    let mut s = [0.0; NCONS];
    for q in 0..NCONS {
        s[q] = weights[q * n_poly + mode];
    }
    s
}

fn write_limited_cell(out: &mut [f64], n_poly: usize, mean_c: [f64; NCONS], slope_x: [f64; NCONS], slope_y: [f64; NCONS], limited: bool) {
    for q in 0..NCONS {
        out[q * n_poly + MODE_MEAN] = mean_c[q];
        if n_poly > MODE_X {
            out[q * n_poly + MODE_X] = slope_x[q];
        }
        if n_poly > MODE_Y {
            out[q * n_poly + MODE_Y] = slope_y[q];
        }
        if limited {
            for l in 3..n_poly {
                out[q * n_poly + l] = 0.0;
            }
        }
    }
}

fn limit_cell_conserved(cell: &Cell, dx: f64, dy: f64, m: f64, w_c: &[f64], w_im: &[f64], w_ip: &[f64], w_jm: &[f64], w_jp: &[f64], out: &mut [f64]) {
    let n_poly = cell.n_poly();
    if n_poly <= MODE_X {
        out.copy_from_slice(w_c);
        return;
    }

    let mean_c = mean(w_c, n_poly);
    let mean_im = mean(w_im, n_poly);
    let mean_ip = mean(w_ip, n_poly);
    let mean_jm = mean(w_jm, n_poly);
    let mean_jp = mean(w_jp, n_poly);
    let slope_y = slope(w_c, n_poly, MODE_Y);
    let slope_x = slope(w_c, n_poly, MODE_X);

    let mut limited_x = [0.0; NCONS];
    let mut limited_y = [0.0; NCONS];
    let mut changed = false;
    for q in 0..NCONS {
        limited_y[q] = minmod_tvb(slope_y[q], mean_jm[q], mean_c[q], mean_jp[q], m, dy);
        changed |= limited_y[q] != slope_y[q];
        limited_x[q] = minmod_tvb(slope_x[q], mean_im[q], mean_c[q], mean_ip[q], m, dx);
        changed |= limited_x[q] != slope_x[q];
    }

    write_limited_cell(out, n_poly, mean_c, limited_x, limited_y, changed);
}

fn limit_cell_characteristic(cell: &Cell, dx: f64, dy: f64, gamma: f64, w_c: &[f64], w_im: &[f64], w_ip: &[f64], w_jm: &[f64], w_jp: &[f64], out: &mut [f64]) {
    let n_poly = cell.n_poly();
    if n_poly <= MODE_X {
        out.copy_from_slice(w_c);
        return;
    }

    let mean_c = mean(w_c, n_poly);
    let mean_im = mean(w_im, n_poly);
    let mean_ip = mean(w_ip, n_poly);
    let mean_jm = mean(w_jm, n_poly);
    let mean_jp = mean(w_jp, n_poly);
    let slope_y = slope(w_c, n_poly, MODE_Y);
    let slope_x = slope(w_c, n_poly, MODE_X);

    let p_mean = Conserved::from(mean_c).to_primitive(gamma);
    let lx = left_eigenvectors(p_mean, Direction::X, gamma);
    let rx = right_eigenvectors(p_mean, Direction::X, gamma);
    let ly = left_eigenvectors(p_mean, Direction::Y, gamma);
    let ry = right_eigenvectors(p_mean, Direction::Y, gamma);

    let char_mean_c_x = apply_left(&lx, mean_c);
    let char_mean_im = apply_left(&lx, mean_im);
    let char_mean_ip = apply_left(&lx, mean_ip);
    let char_slope_x = apply_left(&lx, slope_x);

    let char_mean_c_y = apply_left(&ly, mean_c);
    let char_mean_jm = apply_left(&ly, mean_jm);
    let char_mean_jp = apply_left(&ly, mean_jp);
    let char_slope_y = apply_left(&ly, slope_y);

    let mut limited_char_x = [0.0; NCONS];
    let mut limited_char_y = [0.0; NCONS];
    let mut changed = false;
    for k in 0..NCONS {
        limited_char_y[k] = minmod_b(
            SQRT_3 * char_slope_y[k],
            LIMITER_BETA * (char_mean_c_y[k] - char_mean_jm[k]),
            LIMITER_BETA * (char_mean_jp[k] - char_mean_c_y[k]),
            dy,
        ) / SQRT_3;
        changed |= limited_char_y[k] != char_slope_y[k];
        limited_char_x[k] = minmod_b(
            SQRT_3 * char_slope_x[k],
            LIMITER_BETA * (char_mean_c_x[k] - char_mean_im[k]),
            LIMITER_BETA * (char_mean_ip[k] - char_mean_c_x[k]),
            dx,
        ) / SQRT_3;
        changed |= limited_char_x[k] != char_slope_x[k];
    }

    let limited_x = apply_right(&rx, limited_char_x);
    let limited_y = apply_right(&ry, limited_char_y);

    write_limited_cell(out, n_poly, mean_c, limited_x, limited_y, changed);
}

fn check_shapes(mesh: &Mesh, num_fields: usize, weights_rd: &PatchView, weights_wr: &PatchViewMut) -> Result<()> {
    for (count, actual) in [
        (weights_rd.count(), weights_rd.num_fields()),
        (weights_wr.count(), weights_wr.num_fields()),
    ] {
        if count != (mesh.ni + 2, mesh.nj + 2) {
            return Err(Error::ShapeMismatch { ni: count.0, nj: count.1, mesh_ni: mesh.ni, mesh_nj: mesh.nj });
        }
        if actual != num_fields {
            return Err(Error::FieldWidthMismatch { expected: num_fields, actual });
        }
    }
    if weights_rd.aliases(weights_wr) {
        return Err(Error::AliasedPatches);
    }
    Ok(())
}

/// Applies the TVB limiter in conserved variables to every interior
/// cell of `weights_rd`, writing the (possibly unchanged) result into
/// `weights_wr`. Never mutates `weights_rd`.
pub fn limit_slopes_conserved(cell: &Cell, mesh: &Mesh, weights_rd: &PatchView, weights_wr: &mut PatchViewMut, m: f64, mode: ExecutionMode) -> Result<()> {
    run(cell, mesh, weights_rd, weights_wr, mode, move |cell, w_c, w_im, w_ip, w_jm, w_jp, out| {
        limit_cell_conserved(cell, mesh.dx, mesh.dy, m, w_c, w_im, w_ip, w_jm, w_jp, out)
    })
}

/// Applies the TVB limiter in characteristic variables (projected
/// through the Euler flux Jacobian's eigenvectors at the cell's mean
/// state) to every interior cell of `weights_rd`.
pub fn limit_slopes(cell: &Cell, mesh: &Mesh, weights_rd: &PatchView, weights_wr: &mut PatchViewMut, gamma: f64, mode: ExecutionMode) -> Result<()> {
    run(cell, mesh, weights_rd, weights_wr, mode, move |cell, w_c, w_im, w_ip, w_jm, w_jp, out| {
        limit_cell_characteristic(cell, mesh.dx, mesh.dy, gamma, w_c, w_im, w_ip, w_jm, w_jp, out)
    })
}

fn run<F>(cell: &Cell, mesh: &Mesh, weights_rd: &PatchView, weights_wr: &mut PatchViewMut, mode: ExecutionMode, f: F) -> Result<()>
where
    F: Fn(&Cell, &[f64], &[f64], &[f64], &[f64], &[f64], &mut [f64]) + Sync,
{
    let num_fields = NCONS * cell.n_poly();
    check_shapes(mesh, num_fields, weights_rd, weights_wr)?;

    if !mode.is_available() {
        return Ok(());
    }

    let (ni, nj) = mesh.shape();
    let start = weights_wr.start();
    let row_stride = (nj + 2) as usize * num_fields;
    let wr_slice = weights_wr.as_mut_slice();
    let mut rows: Vec<&mut [f64]> = wr_slice.chunks_mut(row_stride).collect();

    let write_row = |i: i64, row: &mut [f64], j_range: std::ops::Range<i64>| {
        // `rows` spans the guard layer too; only interior rows carry a
        // limited result, leaving guard cells for the caller to fill.
        if i < 0 || i >= ni {
            return;
        }
        for j in j_range {
            let j_off = (j - start.1) as usize * num_fields;
            let out = &mut row[j_off..j_off + num_fields];
            f(
                cell,
                weights_rd.get((i, j)),
                weights_rd.get((i - 1, j)),
                weights_rd.get((i + 1, j)),
                weights_rd.get((i, j - 1)),
                weights_rd.get((i, j + 1)),
                out,
            );
        }
    };

    match mode {
        ExecutionMode::Cpu => {
            for (row_index, row) in rows.into_iter().enumerate() {
                write_row(start.0 + row_index as i64, row, 0..nj);
            }
        }
        ExecutionMode::Gpu => {
            // Walks the same `GPU_BLOCK_SHAPE` bands as
            // `dispatch::for_each_interior_cell`'s own GPU arm, rather
            // than replaying the sequential per-row loop.
            for (i0, i_end, j0, j_end) in crate::dispatch::gpu_blocks(ni, nj) {
                for (row_index, row) in rows.iter_mut().enumerate() {
                    let i = start.0 + row_index as i64;
                    if i < i0 || i >= i_end {
                        continue;
                    }
                    write_row(i, row, j0..j_end);
                }
            }
        }
        ExecutionMode::Omp => {
            use rayon::prelude::*;
            rows.into_par_iter().enumerate().for_each(|(row_index, row)| {
                write_row(start.0 + row_index as i64, row, 0..nj);
            });
        }
    }
    Ok(())
}

#[allow(dead_code)]
fn unused_generic_dispatch_hint(ni: i64, nj: i64, mode: ExecutionMode) {
    for_each_interior_cell(ni, nj, mode, |_, _| {});
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::NodeData;
    use crate::constants::{GAMMA, TVB_M_CONSERVED};
    use crate::patch::Patch;
    use approx::assert_abs_diff_eq;

    fn order2_cell() -> Cell {
        let mut n = NodeData::zeros();
        n.phi[0] = 1.0;
        n.weight = 1.0;
        Cell::new(2, vec![n; 4], vec![n; 2], vec![n; 2], vec![n; 2], vec![n; 2]).unwrap()
    }

    fn patch_with_x_profile(ni: i64, nj: i64, n_poly: usize, means: &[f64]) -> Patch {
        let mut patch = Patch::zeros((-1, -1), (ni + 2, nj + 2), NCONS * n_poly);
        let mut view = patch.as_view_mut();
        for i in -1..=ni {
            let mean = means[((i + 1).max(0) as usize).min(means.len() - 1)];
            let cell = view.get_mut((i, 0));
            cell[0 * n_poly] = mean;
            cell[3 * n_poly] = 2.5;
        }
        patch
    }

    #[test]
    fn smooth_linear_profile_is_left_unlimited() {
        let cell = order2_cell();
        let mesh = Mesh::new(3, 1, 1.0, 1.0).unwrap();
        let means = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut rd = patch_with_x_profile(mesh.ni, mesh.nj, cell.n_poly(), &means);
        {
            let mut view = rd.as_view_mut();
            for i in 0..mesh.ni {
                let n_poly = cell.n_poly();
                let c = view.get_mut((i, 0));
                c[0 * n_poly + MODE_X] = 1.0;
            }
        }
        let mut wr = Patch::zeros((-1, -1), (mesh.ni + 2, mesh.nj + 2), NCONS * cell.n_poly());
        limit_slopes_conserved(&cell, &mesh, &rd.as_view(), &mut wr.as_view_mut(), TVB_M_CONSERVED, ExecutionMode::Cpu).unwrap();

        let n_poly = cell.n_poly();
        let out = wr.as_view().get((1, 0));
        assert_abs_diff_eq!(out[0 * n_poly + MODE_X], 1.0, epsilon = 1e-12);
    }

    fn patch_with_y_profile(ni: i64, nj: i64, n_poly: usize, means: &[f64]) -> Patch {
        let mut patch = Patch::zeros((-1, -1), (ni + 2, nj + 2), NCONS * n_poly);
        let mut view = patch.as_view_mut();
        for j in -1..=nj {
            let mean = means[((j + 1).max(0) as usize).min(means.len() - 1)];
            let cell = view.get_mut((0, j));
            cell[0 * n_poly] = mean;
            cell[3 * n_poly] = 2.5;
        }
        patch
    }

    #[test]
    fn smooth_linear_profile_in_y_is_left_unlimited() {
        let cell = order2_cell();
        let mesh = Mesh::new(1, 3, 1.0, 1.0).unwrap();
        let means = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut rd = patch_with_y_profile(mesh.ni, mesh.nj, cell.n_poly(), &means);
        {
            let mut view = rd.as_view_mut();
            for j in 0..mesh.nj {
                let n_poly = cell.n_poly();
                let c = view.get_mut((0, j));
                c[0 * n_poly + MODE_Y] = 1.0;
            }
        }
        let mut wr = Patch::zeros((-1, -1), (mesh.ni + 2, mesh.nj + 2), NCONS * cell.n_poly());
        limit_slopes_conserved(&cell, &mesh, &rd.as_view(), &mut wr.as_view_mut(), TVB_M_CONSERVED, ExecutionMode::Cpu).unwrap();

        let n_poly = cell.n_poly();
        let out = wr.as_view().get((0, 1));
        assert_abs_diff_eq!(out[0 * n_poly + MODE_Y], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn discontinuity_in_y_triggers_limiting() {
        let cell = order2_cell();
        let mesh = Mesh::new(1, 3, 1.0, 1.0).unwrap();
        let n_poly = cell.n_poly();
        let means = [1.0, 1.0, 100.0, 1.0, 1.0];
        let mut rd = patch_with_y_profile(mesh.ni, mesh.nj, n_poly, &means);
        {
            let mut view = rd.as_view_mut();
            let c = view.get_mut((0, 1));
            c[0 * n_poly + MODE_Y] = 50.0;
        }
        let mut wr = Patch::zeros((-1, -1), (mesh.ni + 2, mesh.nj + 2), NCONS * n_poly);

        limit_slopes_conserved(&cell, &mesh, &rd.as_view(), &mut wr.as_view_mut(), TVB_M_CONSERVED, ExecutionMode::Cpu).unwrap();

        let out = wr.as_view().get((0, 1));
        assert_abs_diff_eq!(out[0 * n_poly], 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[0 * n_poly + MODE_Y], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn discontinuity_triggers_limiting_and_clears_higher_modes() {
        let cell = order2_cell();
        let mesh = Mesh::new(3, 1, 1.0, 1.0).unwrap();
        let n_poly = cell.n_poly();
        let means = [1.0, 1.0, 100.0, 1.0, 1.0];
        let mut rd = patch_with_x_profile(mesh.ni, mesh.nj, n_poly, &means);
        // An unphysically steep slope at the troubled cell: the
        // surrounding means jump by +99 then -99, opposite signs, so
        // the minmod limiter must clamp this to zero.
        {
            let mut view = rd.as_view_mut();
            let c = view.get_mut((1, 0));
            c[0 * n_poly + MODE_X] = 50.0;
        }
        let mut wr = Patch::zeros((-1, -1), (mesh.ni + 2, mesh.nj + 2), NCONS * n_poly);

        limit_slopes_conserved(&cell, &mesh, &rd.as_view(), &mut wr.as_view_mut(), TVB_M_CONSERVED, ExecutionMode::Cpu).unwrap();

        let out = wr.as_view().get((1, 0));
        assert_abs_diff_eq!(out[0 * n_poly], 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[0 * n_poly + MODE_X], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn characteristic_limiter_does_not_mutate_the_read_buffer() {
        let cell = order2_cell();
        let mesh = Mesh::new(3, 1, 1.0, 1.0).unwrap();
        let n_poly = cell.n_poly();
        let means = [1.0, 1.0, 100.0, 1.0, 1.0];
        let rd = patch_with_x_profile(mesh.ni, mesh.nj, n_poly, &means);
        let rd_before = rd.data().to_vec();
        let mut wr = Patch::zeros((-1, -1), (mesh.ni + 2, mesh.nj + 2), NCONS * n_poly);

        limit_slopes(&cell, &mesh, &rd.as_view(), &mut wr.as_view_mut(), GAMMA, ExecutionMode::Cpu).unwrap();

        assert_eq!(rd.data(), rd_before.as_slice());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let cell = order2_cell();
        let mesh = Mesh::new(3, 1, 1.0, 1.0).unwrap();
        let rd = Patch::zeros((-1, -1), (5, 3), NCONS * cell.n_poly());
        let mut wr = Patch::zeros((-1, -1), (4, 3), NCONS * cell.n_poly());
        let result = limit_slopes_conserved(&cell, &mesh, &rd.as_view(), &mut wr.as_view_mut(), TVB_M_CONSERVED, ExecutionMode::Cpu);
        assert!(result.is_err());
    }
}
