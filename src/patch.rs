//! An indexable, guard-padded 2-D view over a contiguous numeric buffer.
//!
//! Grounded on `erichgess-gridiron`'s `Patch` (origin + extent + flat
//! `Vec<f64>`, addressed by a row-major offset) generalized to the
//! guard-padded, `(i, j) -> &[f64]` addressing this core's kernels need,
//! and on the `addr(i, j) = base + J_0*(i - i0) + J_1*(j - j0)` stride
//! convention described in the data model.

use crate::error::{Error, Result};

/// A shared, cell-addressed view into a flat weights/wavespeed buffer.
///
/// `start` is the index of the first logical cell stored (e.g. `(-1,
/// -1)` for a weights patch with a one-cell guard layer); `count` is the
/// number of cells stored along each axis, guards included.
#[derive(Clone, Copy, Debug)]
pub struct PatchView<'a> {
    start: (i64, i64),
    count: (i64, i64),
    num_fields: usize,
    data: &'a [f64],
}

/// The exclusive counterpart of [`PatchView`]. A kernel pass takes one
/// `PatchView` (the read buffer) and one `PatchViewMut` (the write
/// buffer); the borrow checker prevents them from aliasing the same
/// mutable borrow, though they may still alias the same backing
/// allocation through interior unsafe code outside this crate's
/// control — see the error-handling design for what is and is not
/// checked.
#[derive(Debug)]
pub struct PatchViewMut<'a> {
    start: (i64, i64),
    count: (i64, i64),
    num_fields: usize,
    data: &'a mut [f64],
}

/// An owned patch: a `Patch` plus its own backing storage. Used by
/// callers assembling a fresh buffer (tests, or a driver building
/// initial conditions) before handing views derived from it into the
/// dispatch entry points.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Patch {
    start: (i64, i64),
    count: (i64, i64),
    num_fields: usize,
    data: Vec<f64>,
}

fn offset(start: (i64, i64), count: (i64, i64), num_fields: usize, index: (i64, i64)) -> usize {
    let i = (index.0 - start.0) as usize;
    let j = (index.1 - start.1) as usize;
    (i * count.1 as usize + j) * num_fields
}

macro_rules! impl_common_accessors {
    ($t:ty) => {
        impl<'a> $t {
            /// The index of the first logical cell stored in this view.
            pub fn start(&self) -> (i64, i64) {
                self.start
            }

            /// The number of cells stored along each axis, guards
            /// included.
            pub fn count(&self) -> (i64, i64) {
                self.count
            }

            /// The number of reals stored per cell.
            pub fn num_fields(&self) -> usize {
                self.num_fields
            }

            /// The half-open interior index range `[0, ni) x [0, nj)`
            /// implied by this view's shape, excluding the guard layer of
            /// width `guard`.
            pub fn interior(&self, guard: i64) -> ((i64, i64), (i64, i64)) {
                let lo = (self.start.0 + guard, self.start.1 + guard);
                let hi = (self.start.0 + self.count.0 - guard, self.start.1 + self.count.1 - guard);
                (lo, hi)
            }

            /// Returns this view's interior shape (`count` minus `2 *
            /// guard` on each axis).
            pub fn interior_shape(&self, guard: i64) -> (i64, i64) {
                (self.count.0 - 2 * guard, self.count.1 - 2 * guard)
            }
        }
    };
}

impl_common_accessors!(PatchView<'a>);
impl_common_accessors!(PatchViewMut<'a>);

impl<'a> PatchView<'a> {
    pub fn new(start: (i64, i64), count: (i64, i64), num_fields: usize, data: &'a [f64]) -> Self {
        assert_eq!(data.len(), count.0 as usize * count.1 as usize * num_fields);
        Self { start, count, num_fields, data }
    }

    /// The per-cell payload at logical index `(i, j)`.
    pub fn get(&self, index: (i64, i64)) -> &[f64] {
        let s = offset(self.start, self.count, self.num_fields, index);
        &self.data[s..s + self.num_fields]
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    /// Whether this view and `other` are backed by the same allocation
    /// (by pointer identity) with overlapping extent. Used by dispatch
    /// entry points to reject the aliased read/write patches the data
    /// model forbids, where doing so is cheap.
    pub fn aliases(&self, other: &PatchViewMut) -> bool {
        self.data.as_ptr() as usize == other.data.as_ptr() as usize
    }
}

impl<'a> PatchViewMut<'a> {
    pub fn new(start: (i64, i64), count: (i64, i64), num_fields: usize, data: &'a mut [f64]) -> Self {
        assert_eq!(data.len(), count.0 as usize * count.1 as usize * num_fields);
        Self { start, count, num_fields, data }
    }

    pub fn get(&self, index: (i64, i64)) -> &[f64] {
        let s = offset(self.start, self.count, self.num_fields, index);
        &self.data[s..s + self.num_fields]
    }

    pub fn get_mut(&mut self, index: (i64, i64)) -> &mut [f64] {
        let s = offset(self.start, self.count, self.num_fields, index);
        &mut self.data[s..s + self.num_fields]
    }

    pub fn as_view(&self) -> PatchView {
        PatchView { start: self.start, count: self.count, num_fields: self.num_fields, data: self.data }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
    }
}

impl Patch {
    /// Creates a patch of zeros covering `count` cells (guards included)
    /// starting at logical index `start`, with `num_fields` reals per
    /// cell.
    pub fn zeros(start: (i64, i64), count: (i64, i64), num_fields: usize) -> Self {
        let data = vec![0.0; count.0 as usize * count.1 as usize * num_fields];
        Self { start, count, num_fields, data }
    }

    /// Creates a patch from an already flat, row-major buffer.
    pub fn from_vec(start: (i64, i64), count: (i64, i64), num_fields: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), count.0 as usize * count.1 as usize * num_fields);
        Self { start, count, num_fields, data }
    }

    pub fn start(&self) -> (i64, i64) {
        self.start
    }

    pub fn count(&self) -> (i64, i64) {
        self.count
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn as_view(&self) -> PatchView {
        PatchView { start: self.start, count: self.count, num_fields: self.num_fields, data: &self.data }
    }

    pub fn as_view_mut(&mut self) -> PatchViewMut {
        PatchViewMut { start: self.start, count: self.count, num_fields: self.num_fields, data: &mut self.data }
    }

    /// Checks that `self` has the shape a weights patch over `(ni, nj)`
    /// with the given guard width and field count must have.
    pub fn validate_weights_shape(&self, ni: i64, nj: i64, guard: i64, num_fields: usize) -> Result<()> {
        if self.count != (ni + 2 * guard, nj + 2 * guard) {
            return Err(Error::ShapeMismatch { ni: self.count.0, nj: self.count.1, mesh_ni: ni, mesh_nj: nj });
        }
        if self.num_fields != num_fields {
            return Err(Error::FieldWidthMismatch { expected: num_fields, actual: self.num_fields });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressing_matches_the_row_major_stride_convention() {
        let num_fields = 2;
        let mut patch = Patch::zeros((-1, -1), (4, 4), num_fields);
        for (n, slot) in patch.as_view_mut().as_mut_slice().iter_mut().enumerate() {
            *slot = n as f64;
        }
        let view = patch.as_view();
        // cell (0, 0) is the third cell along i (after guard row i=-1)
        // and the second along j within that row.
        let expected = ((1 * 4 + 1) * num_fields) as f64;
        assert_eq!(view.get((0, 0))[0], expected);
    }

    #[test]
    fn interior_excludes_the_guard_layer() {
        let patch = Patch::zeros((-1, -1), (6, 6), 1);
        let (lo, hi) = patch.as_view().interior(1);
        assert_eq!(lo, (0, 0));
        assert_eq!(hi, (4, 4));
    }

    #[test]
    fn aliased_views_over_the_same_patch_are_detected() {
        let mut patch = Patch::zeros((0, 0), (2, 2), 1);
        let data_copy = patch.data().to_vec();
        let view = PatchView::new((0, 0), (2, 2), 1, &data_copy);
        let view_mut = patch.as_view_mut();
        assert!(!view.aliases(&view_mut));

        let view_alias = patch.as_view();
        assert!(view_alias.aliases(&PatchViewMut {
            start: (0, 0),
            count: (2, 2),
            num_fields: 1,
            data: unsafe { std::slice::from_raw_parts_mut(patch.data.as_ptr() as *mut f64, 4) },
        }));
    }

    #[test]
    fn validate_weights_shape_rejects_mismatched_extent() {
        let patch = Patch::zeros((-1, -1), (6, 6), 4);
        assert!(patch.validate_weights_shape(4, 4, 1, 4).is_ok());
        assert!(patch.validate_weights_shape(5, 4, 1, 4).is_err());
        assert!(patch.validate_weights_shape(4, 4, 1, 3).is_err());
    }
}
