//! The interface to element approximations and the integration primitive.
//!
//! Basis functions, quadrature rules and the geometric mapping of elements are computed outside
//! of this crate. Terms only consume them through the [`Approximation`] trait. The
//! [`TabulatedApproximation`] provides an implementation backed by precomputed tables.
use crate::blocks::{ElementBlocks, QuadratureData};
use crate::error::{shape_mismatch, TermError};
use crate::nalgebra::{DMatrix, Scalar};
use crate::Real;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Identifies a quadrature rule by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Integral(String);

impl Integral {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The shape of the data of an element group for a given quadrature rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataShape {
    /// Number of cells (elements or faces).
    pub num_elements: usize,
    /// Number of quadrature points per cell.
    pub num_qp: usize,
    /// Spatial dimension.
    pub dim: usize,
    /// Number of basis functions per cell.
    pub num_element_nodes: usize,
}

/// Status reported by the integration primitive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum IntegrationStatus {
    #[default]
    Success,
    /// Numerical failure, e.g. degenerate element geometry. The code is never zero.
    Failure(i32),
}

impl IntegrationStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }

    /// Combines two statuses, keeping the first failure.
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::Success => other,
            failure => failure,
        }
    }
}

/// The quantity that is integrated over each cell of a chunk.
#[derive(Debug, Copy, Clone)]
pub enum Integrand<'a, T: Scalar> {
    /// Values given per `(chunk position, quadrature point)`, possibly broadcast.
    Values(&'a QuadratureData<T>),
    /// The transposed basis function values, yielding one column vector of length
    /// `num_element_nodes` per cell.
    BaseFunctions,
}

/// An approximation of one element group on one domain (volume or surface).
pub trait Approximation<T: Real>: Debug {
    fn data_shape(&self, integral: &Integral) -> Result<DataShape, TermError>;

    /// The indices of the nodes associated with the basis functions of the given cell.
    fn element_nodes(&self, cell: usize) -> &[usize];

    /// The basis functions or their derivatives, tabulated at the quadrature points.
    ///
    /// Returns one matrix per quadrature point, with one row for `derivative_order == 0` and `dim`
    /// rows for `derivative_order == 1`, and one column per basis function.
    fn base_functions(&self, integral: &Integral, derivative_order: usize) -> Result<&[DMatrix<T>], TermError>;

    /// Integrates the integrand over each of the given cells.
    ///
    /// Block `k` of the output receives the integral over `cells[k]`. The quadrature weights and
    /// the geometric Jacobian are applied by this primitive.
    fn integrate_chunk(
        &self,
        output: &mut ElementBlocks<T>,
        integrand: Integrand<'_, T>,
        cells: &[usize],
        integral: &Integral,
    ) -> Result<IntegrationStatus, TermError>;

    /// Outward unit normals at the quadrature points of each face.
    fn normals(&self, _integral: &Integral) -> Result<&QuadratureData<T>, TermError> {
        Err(TermError::Unsupported {
            term: String::from("normals"),
            reason: String::from("approximation does not provide surface normals"),
        })
    }
}

/// Tables of a single quadrature rule for a [`TabulatedApproximation`].
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedRule<T: Scalar> {
    basis: Vec<DMatrix<T>>,
    gradients: Vec<DMatrix<T>>,
    weighted_determinants: DMatrix<T>,
    normals: Option<QuadratureData<T>>,
}

impl<T: Real> TabulatedRule<T> {
    /// Creates a rule from basis values (one `1 x n` row per quadrature point) and the products
    /// `w_q |det J_e(x_q)|` arranged as a `num_cells x num_qp` matrix.
    pub fn new(basis: Vec<DMatrix<T>>, weighted_determinants: DMatrix<T>) -> Result<Self, TermError> {
        if basis.len() != weighted_determinants.ncols() {
            return Err(shape_mismatch(
                "quadrature rule",
                format!(
                    "{} basis tables for {} quadrature weights",
                    basis.len(),
                    weighted_determinants.ncols()
                ),
            ));
        }
        if let Some(first) = basis.first() {
            if basis
                .iter()
                .any(|phi| phi.nrows() != 1 || phi.ncols() != first.ncols())
            {
                return Err(shape_mismatch("basis table", "basis values must be 1 x n at every point"));
            }
        }
        Ok(Self {
            basis,
            gradients: Vec::new(),
            weighted_determinants,
            normals: None,
        })
    }

    /// Attaches basis gradients (one `dim x n` matrix per quadrature point).
    pub fn with_gradients(self, gradients: Vec<DMatrix<T>>) -> Result<Self, TermError> {
        if gradients.len() != self.basis.len() {
            return Err(shape_mismatch("basis gradients", "one gradient table per quadrature point required"));
        }
        Ok(Self { gradients, ..self })
    }

    /// Attaches unit normals for surface rules.
    pub fn with_normals(self, normals: QuadratureData<T>) -> Result<Self, TermError> {
        if normals.num_qp() != self.basis.len() || normals.value_shape().1 != 1 {
            return Err(shape_mismatch("surface normals", "normals must be column vectors at every point"));
        }
        Ok(Self {
            normals: Some(normals),
            ..self
        })
    }

    fn num_qp(&self) -> usize {
        self.basis.len()
    }
}

/// An approximation backed by precomputed tables.
#[derive(Debug, Clone)]
pub struct TabulatedApproximation<T: Scalar> {
    dim: usize,
    connectivity: Vec<Vec<usize>>,
    rules: FxHashMap<Integral, TabulatedRule<T>>,
}

impl<T: Real> TabulatedApproximation<T> {
    /// Creates an approximation of `connectivity.len()` cells in `dim` spatial dimensions.
    ///
    /// All cells must have the same number of nodes.
    pub fn new(dim: usize, connectivity: Vec<Vec<usize>>) -> Result<Self, TermError> {
        if let Some(first) = connectivity.first() {
            if connectivity.iter().any(|nodes| nodes.len() != first.len()) {
                return Err(shape_mismatch(
                    "connectivity",
                    "all cells of an element group must have the same number of nodes",
                ));
            }
        }
        Ok(Self {
            dim,
            connectivity,
            rules: FxHashMap::default(),
        })
    }

    pub fn with_rule(mut self, integral: Integral, rule: TabulatedRule<T>) -> Result<Self, TermError> {
        if rule.weighted_determinants.nrows() != self.connectivity.len() {
            return Err(shape_mismatch(
                integral.name(),
                format!(
                    "quadrature tables for {} cells, but the group has {} cells",
                    rule.weighted_determinants.nrows(),
                    self.connectivity.len()
                ),
            ));
        }
        let n = self.num_element_nodes();
        if rule.basis.iter().any(|phi| phi.ncols() != n) {
            return Err(shape_mismatch(
                integral.name(),
                format!("basis tables must have {} columns", n),
            ));
        }
        self.rules.insert(integral, rule);
        Ok(self)
    }

    fn num_element_nodes(&self) -> usize {
        self.connectivity.first().map(Vec::len).unwrap_or(0)
    }

    fn rule(&self, integral: &Integral) -> Result<&TabulatedRule<T>, TermError> {
        self.rules
            .get(integral)
            .ok_or_else(|| TermError::MissingIntegral(integral.name().to_string()))
    }
}

impl<T: Real> Approximation<T> for TabulatedApproximation<T> {
    fn data_shape(&self, integral: &Integral) -> Result<DataShape, TermError> {
        let rule = self.rule(integral)?;
        Ok(DataShape {
            num_elements: self.connectivity.len(),
            num_qp: rule.num_qp(),
            dim: self.dim,
            num_element_nodes: self.num_element_nodes(),
        })
    }

    fn element_nodes(&self, cell: usize) -> &[usize] {
        &self.connectivity[cell]
    }

    fn base_functions(&self, integral: &Integral, derivative_order: usize) -> Result<&[DMatrix<T>], TermError> {
        let rule = self.rule(integral)?;
        match derivative_order {
            0 => Ok(&rule.basis),
            1 if !rule.gradients.is_empty() => Ok(&rule.gradients),
            _ => Err(TermError::Unsupported {
                term: String::from("base_functions"),
                reason: format!("no basis derivatives of order {} tabulated", derivative_order),
            }),
        }
    }

    fn integrate_chunk(
        &self,
        output: &mut ElementBlocks<T>,
        integrand: Integrand<'_, T>,
        cells: &[usize],
        integral: &Integral,
    ) -> Result<IntegrationStatus, TermError> {
        let rule = self.rule(integral)?;
        let n_qp = rule.num_qp();
        assert_eq!(output.len(), cells.len(), "Output must have one block per cell");

        let expected_shape = match integrand {
            Integrand::Values(values) => {
                assert_eq!(values.num_qp(), n_qp, "Integrand must have values at every quadrature point");
                assert!(
                    values.is_broadcast() || values.num_cells() == cells.len(),
                    "Integrand must be broadcast or have one cell per chunk entry"
                );
                values.value_shape()
            }
            Integrand::BaseFunctions => (self.num_element_nodes(), 1),
        };
        assert_eq!(output.block_shape(), expected_shape, "Output block shape mismatch");

        let mut status = IntegrationStatus::Success;
        for (k, &cell) in cells.iter().enumerate() {
            let mut out = output.block_mut(k);
            out.fill(T::zero());
            for q in 0..n_qp {
                let w = rule.weighted_determinants[(cell, q)];
                if !(w.is_finite() && w > T::zero()) {
                    status = status.and(IntegrationStatus::Failure(1));
                }
                match integrand {
                    Integrand::Values(values) => {
                        for (o, &v) in out.iter_mut().zip(values.entry(k, q).iter()) {
                            *o += w * v;
                        }
                    }
                    Integrand::BaseFunctions => {
                        for (o, &phi) in out.iter_mut().zip(rule.basis[q].iter()) {
                            *o += w * phi;
                        }
                    }
                }
            }
        }
        Ok(status)
    }

    fn normals(&self, integral: &Integral) -> Result<&QuadratureData<T>, TermError> {
        let rule = self.rule(integral)?;
        rule.normals.as_ref().ok_or_else(|| TermError::Unsupported {
            term: String::from("normals"),
            reason: format!("no surface normals tabulated for integral '{}'", integral.name()),
        })
    }
}
