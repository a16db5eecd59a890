//! Weighted mass-type operators: $\int_\Omega y \\, q \\, p$ and its time-derivative and
//! history-kernel variants.
//!
//! All variants are restricted to scalar fields.
use crate::approximation::{Approximation, Integrand, IntegrationStatus};
use crate::blocks::{BlockShape, ElementBlocks};
use crate::cache::{CacheScope, QuadraturePointCache};
use crate::error::{shape_mismatch, TermError};
use crate::field::Field;
use crate::nalgebra::DMatrix;
use crate::term::{Contributions, EvaluationRequest, Mode, ResolvedArgs, Term};
use crate::terms::{
    pointwise_difference, pointwise_scale, require_same_qp, require_scalar, weighted_basis, weighted_basis_outer,
    VOLUME_DOMAIN,
};
use crate::Real;
use log::debug;

/// The approximations and basis tables shared by the weighted operators.
struct ScalarOperator<'a, T: Real> {
    field: &'a Field<T>,
    test: &'a dyn Approximation<T>,
    trial: &'a dyn Approximation<T>,
    basis: &'a [DMatrix<T>],
    num_element_nodes: usize,
}

impl<'a, T: Real> ScalarOperator<'a, T> {
    fn prepare(term: &Term<T>, args: &ResolvedArgs<'a, T>, group: usize) -> Result<Self, TermError> {
        let virtual_variable = args.variable("virtual")?;
        let state = args.variable("state")?;
        require_scalar(term, virtual_variable)?;
        require_scalar(term, state)?;
        let test = virtual_variable
            .field()
            .approximation(group, &VOLUME_DOMAIN)?;
        let trial = state.field().approximation(group, &VOLUME_DOMAIN)?;
        require_same_qp(term, test, trial)?;
        Ok(Self {
            field: virtual_variable.field(),
            test,
            trial,
            basis: test.base_functions(term.integral(), 0)?,
            num_element_nodes: test.data_shape(term.integral())?.num_element_nodes,
        })
    }

    fn block_shape(&self, mode: Mode) -> BlockShape {
        let n = self.num_element_nodes;
        match mode {
            Mode::Residual => (n, 1),
            Mode::Jacobian => (n, n),
        }
    }
}

fn volume_scope<T: Real>(term: &Term<T>, group: usize) -> CacheScope<'_> {
    CacheScope {
        group,
        domain: &VOLUME_DOMAIN,
        integral: term.integral(),
    }
}

/// `dw_volume_wdot`: $\int_\Omega y \\, q \\, p$.
pub(crate) fn wdot_operator<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    mode: Mode,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let material = args.material("material")?;
    let state = args.variable("state")?;
    let op = ScalarOperator::prepare(term, args, request.group)?;
    let scope = volume_scope(term, request.group);
    let weight = cache.material_at_qp(material, op.field, scope, (1, 1))?;
    let shape = op.block_shape(mode);
    let integral = term.integral();
    let ScalarOperator { test, basis, .. } = op;

    match mode {
        Mode::Residual => {
            let u = cache.state_at_qp(state, None, op.trial, scope, 0)?;
            Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
                let cells = chunk.indices();
                let weighted_u = pointwise_scale(&u.gather(cells), &weight.gather(cells));
                let integrand = weighted_basis(basis, &weighted_u);
                test.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)
            }))
        }
        Mode::Jacobian => Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
            let cells = chunk.indices();
            let integrand = weighted_basis_outer(basis, &weight.gather(cells));
            test.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)
        })),
    }
}

/// `dw_volume_wdot_dt`: $\int_\Omega y \\, q \\, (p - p_0) / \Delta t$.
///
/// The previous values $p_0$ are read from the history parameter. At the initial step there is
/// no previous state, so only the Jacobian is defined.
pub(crate) fn wdot_operator_dt<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    mode: Mode,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let ts = args.time_step("ts")?;
    if mode == Mode::Residual && ts.is_initial() {
        debug!("Term {} has no residual at the initial step", term.name());
        return Ok(Contributions::empty());
    }
    let material = args.material("material")?;
    let state = args.variable("state")?;
    let history = args.variable("parameter")?;
    let op = ScalarOperator::prepare(term, args, request.group)?;
    let scope = volume_scope(term, request.group);
    let weight = cache.material_at_qp(material, op.field, scope, (1, 1))?;
    let shape = op.block_shape(mode);
    let integral = term.integral();
    let dt_inv = T::one() / ts.dt;
    let ScalarOperator { test, basis, .. } = op;

    match mode {
        Mode::Residual => {
            let u = cache.state_at_qp(state, Some(history), op.trial, scope, 0)?;
            let u0 = cache.state_at_qp(state, Some(history), op.trial, scope, 1)?;
            Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
                let cells = chunk.indices();
                let du_dt = pointwise_difference(&u.gather(cells), &u0.gather(cells), dt_inv);
                let integrand = weighted_basis(basis, &pointwise_scale(&du_dt, &weight.gather(cells)));
                test.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)
            }))
        }
        Mode::Jacobian => Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
            let cells = chunk.indices();
            let integrand = weighted_basis_outer(basis, &weight.gather(cells));
            let status = test.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)?;
            chunk.output.scale_mut(dt_inv);
            Ok(status)
        })),
    }
}

/// `dw_volume_wdot_th`: $\int_\Omega \left[ \int_0^t G(t - \tau) p(\tau) \\, d\tau \right] q$,
/// discretized as $\sum_i \Delta t \\, G_i \\, p_{n - i}$.
///
/// The sum runs over the kernel weights, limited by the term's history window and by the number
/// of steps taken so far. The Jacobian only involves the current step, $\Delta t \\, G_0$.
pub(crate) fn wdot_operator_th<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    mode: Mode,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let ts = args.time_step("ts")?;
    if mode == Mode::Residual && ts.is_initial() {
        debug!("Term {} has no residual at the initial step", term.name());
        return Ok(Contributions::empty());
    }
    let kernel = args.material_series("material")?;
    let state = args.variable("state")?;
    let history = args.variable("parameter")?;
    if kernel.is_empty() {
        return Err(shape_mismatch(
            format!("kernel {}", kernel.name()),
            "at least one kernel weight is required",
        ));
    }
    let op = ScalarOperator::prepare(term, args, request.group)?;
    let scope = volume_scope(term, request.group);
    let shape = op.block_shape(mode);
    let integral = term.integral();
    let dt = ts.dt;
    let ScalarOperator { field, test, basis, .. } = op;

    match mode {
        Mode::Residual => {
            let window = term.options().history_window.unwrap_or(usize::MAX);
            let num_steps = kernel.len().min(window).min(ts.step + 1);
            let mut steps = Vec::with_capacity(num_steps);
            for (offset, weight) in kernel.items().iter().take(num_steps).enumerate() {
                let weight = cache.material_at_qp(weight, field, scope, (1, 1))?;
                let u = cache.state_at_qp(state, Some(history), op.trial, scope, offset)?;
                steps.push((weight, u));
            }
            Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
                let cells = chunk.indices();
                let mut partial = ElementBlocks::zeros(cells.len(), shape);
                let mut status = IntegrationStatus::Success;
                for (weight, u) in &steps {
                    let weighted_u = pointwise_scale(&u.gather(cells), &weight.gather(cells));
                    let integrand = weighted_basis(basis, &weighted_u);
                    let step_status =
                        test.integrate_chunk(&mut partial, Integrand::Values(&integrand), cells, integral)?;
                    status = status.and(step_status);
                    chunk.output.accumulate(&partial);
                }
                chunk.output.scale_mut(dt);
                Ok(status)
            }))
        }
        Mode::Jacobian => {
            let weight = cache.material_at_qp(&kernel.items()[0], field, scope, (1, 1))?;
            Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
                let cells = chunk.indices();
                let integrand = weighted_basis_outer(basis, &weight.gather(cells));
                let status = test.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)?;
                chunk.output.scale_mut(dt);
                Ok(status)
            }))
        }
    }
}
