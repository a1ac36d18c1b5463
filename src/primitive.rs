//! Pointwise hydrodynamics: conserved/primitive conversions, flux
//! evaluation, wavespeed estimates, and the 1-D approximate Riemann
//! solvers (HLLE, HLLC) used by the DG surface integral.
//!
//! All operations here are pointwise and pure; none of them touch a
//! `Patch` or know about the mesh.

use crate::constants::{GAMMA, NCONS};
use crate::geometry::Direction;
use std::ops::{Add, Div, Mul, Sub};

/// The conserved state at a point: density, x-momentum, y-momentum,
/// total energy.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Conserved(pub f64, pub f64, pub f64, pub f64);

/// The primitive state at a point: density, x-velocity, y-velocity,
/// pressure.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Primitive(pub f64, pub f64, pub f64, pub f64);

macro_rules! impl_arithmetic {
    ($t:ty) => {
        impl Add for $t {
            type Output = Self;
            fn add(self, b: Self) -> Self {
                Self(self.0 + b.0, self.1 + b.1, self.2 + b.2, self.3 + b.3)
            }
        }
        impl Sub for $t {
            type Output = Self;
            fn sub(self, b: Self) -> Self {
                Self(self.0 - b.0, self.1 - b.1, self.2 - b.2, self.3 - b.3)
            }
        }
        impl Mul<f64> for $t {
            type Output = Self;
            fn mul(self, s: f64) -> Self {
                Self(self.0 * s, self.1 * s, self.2 * s, self.3 * s)
            }
        }
        impl Div<f64> for $t {
            type Output = Self;
            fn div(self, s: f64) -> Self {
                Self(self.0 / s, self.1 / s, self.2 / s, self.3 / s)
            }
        }
        impl From<[f64; NCONS]> for $t {
            fn from(a: [f64; NCONS]) -> Self {
                Self(a[0], a[1], a[2], a[3])
            }
        }
        impl From<$t> for [f64; NCONS] {
            fn from(v: $t) -> Self {
                [v.0, v.1, v.2, v.3]
            }
        }
    };
}

impl_arithmetic!(Conserved);
impl_arithmetic!(Primitive);

impl Conserved {
    pub fn mass_density(&self) -> f64 {
        self.0
    }
    pub fn momentum_x(&self) -> f64 {
        self.1
    }
    pub fn momentum_y(&self) -> f64 {
        self.2
    }
    pub fn energy(&self) -> f64 {
        self.3
    }

    /// Converts this conserved state to primitive variables. `rho == 0`
    /// is a caller error (see DESIGN.md / the error-handling design);
    /// this divides by it, producing a NaN rather than panicking. In
    /// debug builds, a non-physical density or pressure trips a
    /// `debug_assert!` instead of silently propagating as a NaN.
    pub fn to_primitive(&self, gamma: f64) -> Primitive {
        let rho = self.mass_density();
        debug_assert!(rho > 0.0, "non-physical density {rho} in conserved state");
        let vx = self.momentum_x() / rho;
        let vy = self.momentum_y() / rho;
        let kinetic = 0.5 * rho * (vx * vx + vy * vy);
        let p = (gamma - 1.0) * (self.energy() - kinetic);
        debug_assert!(p > 0.0, "non-physical pressure {p} in conserved state");
        Primitive(rho, vx, vy, p)
    }
}

impl Primitive {
    pub fn mass_density(&self) -> f64 {
        self.0
    }
    pub fn velocity_x(&self) -> f64 {
        self.1
    }
    pub fn velocity_y(&self) -> f64 {
        self.2
    }
    pub fn gas_pressure(&self) -> f64 {
        self.3
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        [self.velocity_x(), self.velocity_y()][direction.index()]
    }

    /// Sound speed `c_s = sqrt(gamma * p / rho)`.
    pub fn sound_speed(&self, gamma: f64) -> f64 {
        (gamma * self.gas_pressure() / self.mass_density()).sqrt()
    }

    pub fn to_conserved(&self, gamma: f64) -> Conserved {
        let rho = self.mass_density();
        let (vx, vy) = (self.velocity_x(), self.velocity_y());
        let momentum_x = rho * vx;
        let momentum_y = rho * vy;
        let kinetic = 0.5 * rho * (vx * vx + vy * vy);
        let energy = self.gas_pressure() / (gamma - 1.0) + kinetic;
        Conserved(rho, momentum_x, momentum_y, energy)
    }

    /// The physical flux of the conserved quantities across a face with
    /// unit normal along `direction`.
    pub fn to_flux(&self, conserved: Conserved, direction: Direction) -> Conserved {
        let vn = self.velocity(direction);
        let p = self.gas_pressure();
        let is_x = direction == Direction::X;
        Conserved(
            vn * conserved.mass_density(),
            vn * conserved.momentum_x() + if is_x { p } else { 0.0 },
            vn * conserved.momentum_y() + if is_x { 0.0 } else { p },
            vn * (conserved.energy() + p),
        )
    }

    /// The pair of outward-signal wavespeeds `(v_n - c_s, v_n + c_s)`
    /// along `direction`.
    pub fn outer_wavespeeds(&self, direction: Direction, gamma: f64) -> (f64, f64) {
        let vn = self.velocity(direction);
        let cs = self.sound_speed(gamma);
        (vn - cs, vn + cs)
    }

    /// The largest signal speed over both axes, `max(|vx| + cs, |vy| +
    /// cs)`, computed as the max over the four signed endpoints.
    pub fn max_wavespeed(&self, gamma: f64) -> f64 {
        let cs = self.sound_speed(gamma);
        let (vx, vy) = (self.velocity_x(), self.velocity_y());
        [vx - cs, vx + cs, vy - cs, vy + cs]
            .iter()
            .fold(0.0_f64, |acc, &s| acc.max(s.abs()))
    }
}

/// Approximate Riemann solver family selectable for the surface flux.
/// The DG core's default dispatch (`advance_rk`) always uses `Hlle`;
/// `Hllc` is exposed for callers that want the contact-preserving
/// variant directly.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RiemannSolver {
    Hlle,
    Hllc,
}

impl RiemannSolver {
    pub fn solve(&self, pl: Primitive, pr: Primitive, direction: Direction, gamma: f64) -> Conserved {
        match self {
            RiemannSolver::Hlle => riemann_hlle(pl, pr, direction, gamma),
            RiemannSolver::Hllc => riemann_hllc(pl, pr, direction, gamma),
        }
    }
}

/// The HLLE (two-wave) approximate Riemann solver. This is the default
/// solver used by the DG surface integral.
pub fn riemann_hlle(pl: Primitive, pr: Primitive, direction: Direction, gamma: f64) -> Conserved {
    let ul = pl.to_conserved(gamma);
    let ur = pr.to_conserved(gamma);
    let fl = pl.to_flux(ul, direction);
    let fr = pr.to_flux(ur, direction);

    let (al_minus, al_plus) = pl.outer_wavespeeds(direction, gamma);
    let (ar_minus, ar_plus) = pr.outer_wavespeeds(direction, gamma);

    let am = al_minus.min(ar_minus).min(0.0);
    let ap = al_plus.max(ar_plus).max(0.0);

    let ul: [f64; NCONS] = ul.into();
    let ur: [f64; NCONS] = ur.into();
    let fl: [f64; NCONS] = fl.into();
    let fr: [f64; NCONS] = fr.into();

    let mut flux = [0.0; NCONS];
    for q in 0..NCONS {
        flux[q] = (fl[q] * ap - fr[q] * am - (ul[q] - ur[q]) * ap * am) / (ap - am);
    }
    Conserved::from(flux)
}

/// The HLLC (three-wave, contact-preserving) approximate Riemann solver.
/// Retained as a named alternative; not used by the DG core's default
/// dispatch.
pub fn riemann_hllc(pl: Primitive, pr: Primitive, direction: Direction, gamma: f64) -> Conserved {
    let ul = pl.to_conserved(gamma);
    let ur = pr.to_conserved(gamma);
    let fl = pl.to_flux(ul, direction);
    let fr = pr.to_flux(ur, direction);

    let (al_minus, al_plus) = pl.outer_wavespeeds(direction, gamma);
    let (ar_minus, ar_plus) = pr.outer_wavespeeds(direction, gamma);
    let sl = al_minus.min(ar_minus);
    let sr = al_plus.max(ar_plus);

    if sl >= 0.0 {
        return fl;
    }
    if sr <= 0.0 {
        return fr;
    }

    let vnl = pl.velocity(direction);
    let vnr = pr.velocity(direction);
    let rhol = pl.mass_density();
    let rhor = pr.mass_density();

    // Contact-wave speed, from the single-valued normal momentum/pressure
    // jump condition of the two-wave Rankine-Hugoniot system.
    let s_star = (pr.gas_pressure() - pl.gas_pressure() + rhol * vnl * (sl - vnl) - rhor * vnr * (sr - vnr))
        / (rhol * (sl - vnl) - rhor * (sr - vnr));

    let star_state = |p: Primitive, u: Conserved, s: f64, vn: f64| -> Conserved {
        let rho = p.mass_density();
        let factor = rho * (s - vn) / (s - s_star);
        let u: [f64; NCONS] = u.into();
        let momentum_n = factor * s_star;
        let energy_n = factor
            * (u[3] / rho
                + (s_star - vn) * (s_star + p.gas_pressure() / (rho * (s - vn))));
        let is_x = direction == Direction::X;
        Conserved(
            factor,
            if is_x { momentum_n } else { factor * p.velocity_x() },
            if is_x { factor * p.velocity_y() } else { momentum_n },
            energy_n,
        )
    };

    if s_star >= 0.0 {
        let ul_star = star_state(pl, ul, sl, vnl);
        let fl: [f64; NCONS] = fl.into();
        let ul_star_a: [f64; NCONS] = ul_star.into();
        let ul_a: [f64; NCONS] = ul.into();
        let mut flux = [0.0; NCONS];
        for q in 0..NCONS {
            flux[q] = fl[q] + sl * (ul_star_a[q] - ul_a[q]);
        }
        Conserved::from(flux)
    } else {
        let ur_star = star_state(pr, ur, sr, vnr);
        let fr: [f64; NCONS] = fr.into();
        let ur_star_a: [f64; NCONS] = ur_star.into();
        let ur_a: [f64; NCONS] = ur.into();
        let mut flux = [0.0; NCONS];
        for q in 0..NCONS {
            flux[q] = fr[q] + sr * (ur_star_a[q] - ur_a[q]);
        }
        Conserved::from(flux)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_primitive() -> Primitive {
        Primitive(1.2, 0.3, -0.1, 0.9)
    }

    #[test]
    fn conserved_primitive_round_trip() {
        let p = sample_primitive();
        let back = p.to_conserved(GAMMA).to_primitive(GAMMA);
        assert_abs_diff_eq!(p.0, back.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.1, back.1, epsilon = 1e-12);
        assert_abs_diff_eq!(p.2, back.2, epsilon = 1e-12);
        assert_abs_diff_eq!(p.3, back.3, epsilon = 1e-12);
    }

    #[test]
    fn flux_consistency_for_identical_states() {
        let p = sample_primitive();
        let u = p.to_conserved(GAMMA);
        for direction in [Direction::X, Direction::Y] {
            let from_flux: [f64; NCONS] = p.to_flux(u, direction).into();
            let from_riemann: [f64; NCONS] = riemann_hlle(p, p, direction, GAMMA).into();
            for q in 0..NCONS {
                assert_abs_diff_eq!(from_flux[q], from_riemann[q], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn riemann_symmetry_under_axis_flip() {
        let pl = Primitive(1.0, 0.4, 0.1, 1.0);
        let pr = Primitive(0.5, -0.2, 0.3, 0.5);

        let flip = |p: Primitive| Primitive(p.0, p.2, p.1, p.3);

        let fx: [f64; NCONS] = riemann_hlle(pl, pr, Direction::X, GAMMA).into();
        let fy: [f64; NCONS] = riemann_hlle(flip(pl), flip(pr), Direction::Y, GAMMA).into();

        assert_abs_diff_eq!(fx[0], fy[0], epsilon = 1e-12);
        assert_abs_diff_eq!(fx[1], fy[2], epsilon = 1e-12);
        assert_abs_diff_eq!(fx[2], fy[1], epsilon = 1e-12);
        assert_abs_diff_eq!(fx[3], fy[3], epsilon = 1e-12);
    }

    #[test]
    fn wavespeed_is_nonnegative_for_valid_states() {
        let p = sample_primitive();
        assert!(p.max_wavespeed(GAMMA) >= 0.0);
    }

    #[test]
    fn hllc_matches_physical_flux_for_identical_states() {
        let p = sample_primitive();
        let u = p.to_conserved(GAMMA);
        for direction in [Direction::X, Direction::Y] {
            let from_flux: [f64; NCONS] = p.to_flux(u, direction).into();
            let from_riemann: [f64; NCONS] = riemann_hllc(p, p, direction, GAMMA).into();
            for q in 0..NCONS {
                assert_abs_diff_eq!(from_flux[q], from_riemann[q], epsilon = 1e-8);
            }
        }
    }
}
