//! Physical and layout constants shared by every component of the core.

/// Adiabatic index for the ideal-gas equation of state. Fixed per the
/// present scheme; alternate equations of state are a non-goal.
pub const GAMMA: f64 = 5.0 / 3.0;

/// Number of conserved fields per cell: density, x-momentum, y-momentum,
/// energy.
pub const NCONS: usize = 4;

/// Guard (ghost) layer width assumed by every patch in this crate.
pub const NUM_GUARD: i64 = 1;

/// Upper bound on the number of modal polynomials per field, i.e.
/// `n_poly(5)`. Used to size fixed-capacity scratch buffers.
pub const MAX_POLYNOMIALS: usize = 15;

/// Upper bound on the per-cell residual accumulator, `NCONS * MAX_POLYNOMIALS`.
pub const MAX_SCRATCH: usize = NCONS * MAX_POLYNOMIALS;

/// Thread-block shape used by the (stand-in) GPU backend.
pub const GPU_BLOCK_SHAPE: (u32, u32) = (16, 16);

/// TVB parameter `M` for the conserved-variable minmod limiter.
pub const TVB_M_CONSERVED: f64 = 10.0;

/// TVB parameter `M` for the characteristic-variable minmod limiter.
pub const TVB_M_CHARACTERISTIC: f64 = 1.0;

/// Limiter parameter `beta`, shared by both limiter variants.
pub const LIMITER_BETA: f64 = 1.0;

/// Number of polynomials per field for a DG scheme of order `p`, i.e.
/// `p(p+1)/2`. Returns 0 for `p` outside `1..=5`.
pub fn n_poly(p: u32) -> usize {
    match p {
        1 => 1,
        2 => 3,
        3 => 6,
        4 => 10,
        5 => 15,
        _ => 0,
    }
}

/// Number of interior (volume) quadrature points for order `p`, i.e. `p^2`.
pub fn n_quad(p: u32) -> usize {
    match p {
        1..=5 => (p * p) as usize,
        _ => 0,
    }
}

/// Number of face quadrature points per face for order `p`, i.e. `p`.
pub fn n_face(p: u32) -> usize {
    match p {
        1..=5 => p as usize,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_counts_match_the_tabulated_values() {
        assert_eq!([n_poly(1), n_poly(2), n_poly(3), n_poly(4), n_poly(5)], [1, 3, 6, 10, 15]);
        assert_eq!([n_quad(1), n_quad(2), n_quad(3), n_quad(4), n_quad(5)], [1, 4, 9, 16, 25]);
        assert_eq!([n_face(1), n_face(2), n_face(3), n_face(4), n_face(5)], [1, 2, 3, 4, 5]);
    }

    #[test]
    fn out_of_range_order_degenerates_to_zero() {
        assert_eq!(n_poly(0), 0);
        assert_eq!(n_poly(6), 0);
        assert_eq!(n_quad(6), 0);
        assert_eq!(n_face(0), 0);
    }
}
