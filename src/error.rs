//! Error type for term evaluation.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::term::ArgKind;

/// Errors that can occur while constructing or evaluating terms.
///
/// Note that a term that does not contribute to a requested Jacobian block (or to the residual at
/// the initial time step) is *not* an error: evaluation then simply produces no contributions.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TermError {
    /// The shape of a material or state array is not compatible with what the term expects.
    ShapeMismatch { quantity: String, details: String },
    /// The operands are valid, but the term does not support them (e.g. vector-valued fields
    /// for operators that are only implemented for scalar fields).
    Unsupported { term: String, reason: String },
    /// No argument with the given name has been bound.
    MissingArgument { term: String, role: &'static str, name: String },
    /// An argument was bound, but it is not of the kind the role requires.
    ArgumentKind { term: String, role: &'static str, expected: ArgKind },
    /// The number of argument names does not match the term's argument types.
    ArgumentCount { term: String, expected: usize, found: usize },
    /// No term is registered under the given name.
    UnknownTerm(String),
    /// The approximation has no tables for the requested integral.
    MissingIntegral(String),
    /// The field has no approximation for the given group and domain.
    MissingApproximation { field: String, group: usize, domain: String },
    /// The variable does not store enough time steps for the requested history offset.
    MissingHistory { variable: String, offset: usize },
    /// The integration primitive reported a failure for some chunk.
    IntegrationFailure { code: i32, elements: Vec<usize> },
}

impl Display for TermError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { quantity, details } => {
                write!(f, "Shape mismatch for {}: {}", quantity, details)
            }
            Self::Unsupported { term, reason } => {
                write!(f, "Term {} does not support the given operands: {}", term, reason)
            }
            Self::MissingArgument { term, role, name } => {
                write!(f, "Term {}: no argument named '{}' bound for role '{}'", term, name, role)
            }
            Self::ArgumentKind { term, role, expected } => {
                write!(f, "Term {}: argument for role '{}' must be a {}", term, role, expected)
            }
            Self::ArgumentCount { term, expected, found } => {
                write!(f, "Term {} takes {} arguments, but {} were given", term, expected, found)
            }
            Self::UnknownTerm(name) => write!(f, "Unknown term '{}'", name),
            Self::MissingIntegral(name) => write!(f, "No quadrature tables for integral '{}'", name),
            Self::MissingApproximation { field, group, domain } => {
                write!(f, "Field {} has no {} approximation for group {}", field, domain, group)
            }
            Self::MissingHistory { variable, offset } => {
                write!(f, "Variable {} has no values stored at history offset {}", variable, offset)
            }
            Self::IntegrationFailure { code, elements } => {
                write!(
                    f,
                    "Integration failed with status {} in chunk of {} elements (first: {:?})",
                    code,
                    elements.len(),
                    elements.first()
                )
            }
        }
    }
}

impl Error for TermError {}

pub(crate) fn shape_mismatch(quantity: impl Into<String>, details: impl Into<String>) -> TermError {
    TermError::ShapeMismatch {
        quantity: quantity.into(),
        details: details.into(),
    }
}
