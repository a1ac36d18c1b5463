//! Tabulated per-reference-cell basis data: [`NodeData`] and [`Cell`].
//!
//! Construction of the basis polynomials and their quadrature nodes is
//! out of scope for this crate; `Cell` only
//! stores and validates what a caller hands it.

use crate::constants::{self, MAX_POLYNOMIALS};
use crate::error::Error;

/// A single precomputed quadrature point: its reference coordinates,
/// the tabulated basis values and spatial derivatives at that point,
/// and its quadrature weight. Read-only once a [`Cell`] is constructed.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeData {
    pub xi_x: f64,
    pub xi_y: f64,
    pub phi: [f64; MAX_POLYNOMIALS],
    pub dphi_dx: [f64; MAX_POLYNOMIALS],
    pub dphi_dy: [f64; MAX_POLYNOMIALS],
    pub weight: f64,
}

impl NodeData {
    pub fn zeros() -> Self {
        Self {
            xi_x: 0.0,
            xi_y: 0.0,
            phi: [0.0; MAX_POLYNOMIALS],
            dphi_dx: [0.0; MAX_POLYNOMIALS],
            dphi_dy: [0.0; MAX_POLYNOMIALS],
            weight: 0.0,
        }
    }
}

/// One of the four faces of a reference cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    LeftI,
    RightI,
    LeftJ,
    RightJ,
}

/// A bundle of tabulated node data for one reference cell, independent
/// of the cell's (i, j) position on the mesh: the interior (volume)
/// quadrature nodes, the four faces' quadrature nodes, and the DG
/// polynomial order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    order: u32,
    interior: Vec<NodeData>,
    left_i: Vec<NodeData>,
    right_i: Vec<NodeData>,
    left_j: Vec<NodeData>,
    right_j: Vec<NodeData>,
}

impl Cell {
    /// Builds a `Cell`, validating `order` and that each supplied node
    /// array has the length the order's derived quadrature counts
    /// require.
    pub fn new(
        order: u32,
        interior: Vec<NodeData>,
        left_i: Vec<NodeData>,
        right_i: Vec<NodeData>,
        left_j: Vec<NodeData>,
        right_j: Vec<NodeData>,
    ) -> anyhow::Result<Self> {
        if !(1..=5).contains(&order) {
            return Err(Error::InvalidOrder(order).into());
        }
        let expected_quad = constants::n_quad(order);
        let expected_face = constants::n_face(order);

        check_len("interior", order, expected_quad, interior.len())?;
        for (name, faces) in [("left_i", &left_i), ("right_i", &right_i), ("left_j", &left_j), ("right_j", &right_j)] {
            check_len(name, order, expected_face, faces.len())?;
        }

        Ok(Self { order, interior, left_i, right_i, left_j, right_j })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Number of modal polynomial coefficients per conserved field.
    pub fn n_poly(&self) -> usize {
        constants::n_poly(self.order)
    }

    /// Number of interior (volume) quadrature points.
    pub fn n_quad(&self) -> usize {
        constants::n_quad(self.order)
    }

    /// Number of quadrature points on each face.
    pub fn n_face(&self) -> usize {
        constants::n_face(self.order)
    }

    pub fn interior_nodes(&self) -> &[NodeData] {
        &self.interior
    }

    pub fn face_nodes(&self, face: Face) -> &[NodeData] {
        match face {
            Face::LeftI => &self.left_i,
            Face::RightI => &self.right_i,
            Face::LeftJ => &self.left_j,
            Face::RightJ => &self.right_j,
        }
    }
}

fn check_len(name: &'static str, order: u32, expected: usize, actual: usize) -> crate::error::Result<()> {
    if actual != expected {
        return Err(Error::NodeDataLength { order, expected, actual });
    }
    let _ = name;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: usize) -> Vec<NodeData> {
        (0..n).map(|_| NodeData::zeros()).collect()
    }

    #[test]
    fn valid_order_and_lengths_construct_a_cell() {
        let cell = Cell::new(2, nodes(4), nodes(2), nodes(2), nodes(2), nodes(2)).unwrap();
        assert_eq!(cell.n_poly(), 3);
        assert_eq!(cell.n_quad(), 4);
        assert_eq!(cell.n_face(), 2);
    }

    #[test]
    fn order_out_of_range_is_rejected() {
        let low = Cell::new(0, nodes(0), nodes(0), nodes(0), nodes(0), nodes(0)).unwrap_err();
        assert_eq!(low.downcast_ref::<Error>(), Some(&Error::InvalidOrder(0)));
        let high = Cell::new(6, nodes(0), nodes(0), nodes(0), nodes(0), nodes(0)).unwrap_err();
        assert_eq!(high.downcast_ref::<Error>(), Some(&Error::InvalidOrder(6)));
    }

    #[test]
    fn mismatched_node_length_is_rejected() {
        let result = Cell::new(2, nodes(3), nodes(2), nodes(2), nodes(2), nodes(2)).unwrap_err();
        assert_eq!(result.downcast_ref::<Error>(), Some(&Error::NodeDataLength { order: 2, expected: 4, actual: 3 }));
    }
}
