//! Implementations of the individual terms.
//!
//! Each term is a function that fetches the cached quantities it needs and returns the lazy
//! per-chunk contributions. Operator terms share the pointwise helpers defined here.
use crate::approximation::Approximation;
use crate::blocks::QuadratureData;
use crate::cache::QuadraturePointCache;
use crate::error::{shape_mismatch, TermError};
use crate::field::{Domain, Variable};
use crate::nalgebra::DMatrix;
use crate::term::{Contributions, EvaluationRequest, Mode, ResolvedArgs, Term, TermKind};
use crate::Real;

mod dot;
pub(crate) mod info;
mod integrate;
mod volume;
mod wdot;

pub(crate) static VOLUME_DOMAIN: Domain = Domain::Volume;

pub(crate) fn evaluate<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    mode: Mode,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    match term.kind() {
        TermKind::IntegrateVolume => integrate::integrate_volume(term, args, request, cache),
        TermKind::IntegrateVolumeOperator => integrate::integrate_volume_operator(term, args, request),
        TermKind::IntegrateSurface => integrate::integrate_surface(term, args, request, cache),
        TermKind::IntegrateSurfaceOperator => integrate::integrate_surface_operator(term, args, request, cache),
        TermKind::IntegrateVolumeMat => integrate::integrate_volume_mat(term, args, request, cache),
        TermKind::DotProductVolume => dot::dot_product(term, args, request, cache, VOLUME_DOMAIN.clone()),
        TermKind::DotProductSurface => {
            let domain = surface_domain(term);
            dot::dot_product(term, args, request, cache, domain)
        }
        TermKind::WDotProductVolume => dot::weighted_dot_product(term, args, request, cache),
        TermKind::Volume => volume::volume(term, args, request, cache),
        TermKind::AverageVolumeMat => volume::average_volume_mat(term, args, request, cache),
        TermKind::AverageVariable => volume::average_variable(term, args, request, cache),
        TermKind::WDotProductVolumeOperator => wdot::wdot_operator(term, args, mode, request, cache),
        TermKind::WDotProductVolumeOperatorDt => wdot::wdot_operator_dt(term, args, mode, request, cache),
        TermKind::WDotProductVolumeOperatorTh => wdot::wdot_operator_th(term, args, mode, request, cache),
    }
}

pub(crate) fn surface_domain<T: Real>(term: &Term<T>) -> Domain {
    Domain::Surface(term.region().name().to_string())
}

/// Fails with [`TermError::Unsupported`] unless the variable is scalar-valued.
pub(crate) fn require_scalar<T: Real>(term: &Term<T>, variable: &Variable<T>) -> Result<(), TermError> {
    if variable.num_components() != 1 {
        return Err(TermError::Unsupported {
            term: term.name().to_string(),
            reason: format!(
                "variable {} has {} components, only scalar fields are supported",
                variable.name(),
                variable.num_components()
            ),
        });
    }
    Ok(())
}

/// Checks that two approximations use the same number of quadrature points for the term's
/// integral.
pub(crate) fn require_same_qp<T: Real>(
    term: &Term<T>,
    a: &dyn Approximation<T>,
    b: &dyn Approximation<T>,
) -> Result<(), TermError> {
    let n_a = a.data_shape(term.integral())?.num_qp;
    let n_b = b.data_shape(term.integral())?.num_qp;
    if n_a != n_b {
        return Err(shape_mismatch(
            format!("operands of {}", term.name()),
            format!("{} and {} quadrature points", n_a, n_b),
        ));
    }
    Ok(())
}

fn combined_cells<T: Real>(a: &QuadratureData<T>, b: &QuadratureData<T>) -> usize {
    if a.is_broadcast() {
        b.num_cells()
    } else {
        a.num_cells()
    }
}

/// The pointwise dot product of two column-vector valued arrays.
pub(crate) fn pointwise_dot<T: Real>(a: &QuadratureData<T>, b: &QuadratureData<T>) -> QuadratureData<T> {
    debug_assert_eq!(a.value_shape(), b.value_shape());
    QuadratureData::from_fn(combined_cells(a, b), a.num_qp(), (1, 1), |k, q, mut out| {
        out[(0, 0)] = a.entry(k, q).dot(&b.entry(k, q));
    })
}

/// Multiplies every value of `a` by the scalar weight at the same point.
pub(crate) fn pointwise_scale<T: Real>(a: &QuadratureData<T>, weight: &QuadratureData<T>) -> QuadratureData<T> {
    debug_assert_eq!(weight.value_shape(), (1, 1));
    QuadratureData::from_fn(combined_cells(a, weight), a.num_qp(), a.value_shape(), |k, q, mut out| {
        let w = weight.entry(k, q)[(0, 0)];
        out.copy_from(&a.entry(k, q));
        out *= w;
    })
}

/// The pointwise difference `(a - b) * factor`.
pub(crate) fn pointwise_difference<T: Real>(
    a: &QuadratureData<T>,
    b: &QuadratureData<T>,
    factor: T,
) -> QuadratureData<T> {
    debug_assert_eq!(a.value_shape(), b.value_shape());
    QuadratureData::from_fn(combined_cells(a, b), a.num_qp(), a.value_shape(), |k, q, mut out| {
        out.copy_from(&(a.entry(k, q) - b.entry(k, q)));
        out *= factor;
    })
}

/// The transposed basis functions weighted by a scalar, `w(x_q) phi(x_q)^T`, at every point.
pub(crate) fn weighted_basis<T: Real>(basis: &[DMatrix<T>], weight: &QuadratureData<T>) -> QuadratureData<T> {
    let n = basis.first().map(|phi| phi.ncols()).unwrap_or(0);
    QuadratureData::from_fn(weight.num_cells(), basis.len(), (n, 1), |k, q, mut out| {
        let w = weight.entry(k, q)[(0, 0)];
        out.copy_from(&basis[q].transpose());
        out *= w;
    })
}

/// The weighted outer product of the basis functions, `w(x_q) phi(x_q)^T phi(x_q)`, at every
/// point.
pub(crate) fn weighted_basis_outer<T: Real>(basis: &[DMatrix<T>], weight: &QuadratureData<T>) -> QuadratureData<T> {
    let n = basis.first().map(|phi| phi.ncols()).unwrap_or(0);
    QuadratureData::from_fn(weight.num_cells(), basis.len(), (n, n), |k, q, mut out| {
        let w = weight.entry(k, q)[(0, 0)];
        out.copy_from(&(basis[q].transpose() * &basis[q]));
        out *= w;
    })
}
