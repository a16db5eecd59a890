//! Basic integral terms of weak forms in finite element discretizations.
//!
//! A [`Term`](term::Term) integrates variables and materials over a region, either producing a
//! value (volumes, averages, integrals, inner products) or the element residual vectors and
//! Jacobian blocks of an operator. Element approximations (basis functions, quadrature and
//! geometry) are provided from outside through the [`Approximation`](approximation::Approximation)
//! trait, while quantities at quadrature points are shared between terms through a
//! [`QuadraturePointCache`](cache::QuadraturePointCache).
//!
//! Evaluation is lazy: [`Term::evaluate`](term::Term::evaluate) returns an iterator that computes
//! one chunk of elements at a time.
use nalgebra::RealField;

pub mod approximation;
pub mod bindings;
pub mod blocks;
pub mod cache;
pub mod chunk;
pub mod definition;
pub mod error;
pub mod field;
pub mod material;
pub mod region;
pub mod term;
pub mod time;

mod terms;

pub extern crate nalgebra;

pub use approximation::{Approximation, Integral, IntegrationStatus};
pub use bindings::Bindings;
pub use cache::QuadraturePointCache;
pub use error::TermError;
pub use term::{Contribution, Contributions, EvaluationRequest, Term, TermKind};

/// Scalar type used by terms.
///
/// Used as a trait alias for the traits needed by all generic routines in this crate.
pub trait Real: RealField + Copy {}

impl<T> Real for T where T: RealField + Copy {}
