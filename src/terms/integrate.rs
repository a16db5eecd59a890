//! Integrals of variables and materials, and the integral operators over test functions.
use crate::approximation::Integrand;
use crate::cache::{CacheScope, QuadraturePointCache};
use crate::error::{shape_mismatch, TermError};
use crate::term::{Contributions, EvaluationRequest, ResolvedArgs, Term};
use crate::terms::{pointwise_dot, require_scalar, surface_domain, weighted_basis, VOLUME_DOMAIN};
use crate::Real;

/// `di_volume_integrate`: $\int_\Omega y$ for scalar or vector-valued $y$.
pub(crate) fn integrate_volume<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let parameter = args.variable("parameter")?;
    let approximation = parameter
        .field()
        .approximation(request.group, &VOLUME_DOMAIN)?;
    let scope = CacheScope {
        group: request.group,
        domain: &VOLUME_DOMAIN,
        integral: term.integral(),
    };
    let values = cache.state_at_qp(parameter, None, approximation, scope, 0)?;
    let integral = term.integral();

    let shape = (parameter.num_components(), 1);
    Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
        let cells = chunk.indices();
        let integrand = values.gather(cells);
        approximation.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)
    }))
}

/// `dw_volume_integrate`: $\int_\Omega q$ for scalar test functions $q$.
///
/// Only contributes to the residual.
pub(crate) fn integrate_volume_operator<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
) -> Result<Contributions<'a, T>, TermError> {
    let virtual_variable = args.variable("virtual")?;
    require_scalar(term, virtual_variable)?;
    let approximation = virtual_variable
        .field()
        .approximation(request.group, &VOLUME_DOMAIN)?;
    let n = approximation
        .data_shape(term.integral())?
        .num_element_nodes;
    let integral = term.integral();

    Ok(term.chunked(request.group, request.chunk_size, (n, 1), move |chunk| {
        let cells = chunk.indices();
        approximation.integrate_chunk(&mut chunk.output, Integrand::BaseFunctions, cells, integral)
    }))
}

/// `d_surface_integrate`: $\int_\Gamma y$, or the flux $\int_\Gamma y \cdot n$ for vector-valued
/// $y$.
pub(crate) fn integrate_surface<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let parameter = args.variable("parameter")?;
    let domain = surface_domain(term);
    let approximation = parameter.field().approximation(request.group, &domain)?;
    let scope = CacheScope {
        group: request.group,
        domain: &domain,
        integral: term.integral(),
    };
    let values = cache.state_at_qp(parameter, None, approximation, scope, 0)?;
    let normals = if parameter.num_components() > 1 {
        let normals = approximation.normals(term.integral())?;
        if normals.value_shape() != values.value_shape() {
            return Err(shape_mismatch(
                format!("surface normals of region {}", term.region().name()),
                format!(
                    "normals of shape {:?} for values of shape {:?}",
                    normals.value_shape(),
                    values.value_shape()
                ),
            ));
        }
        Some(normals)
    } else {
        None
    };
    let integral = term.integral();

    Ok(term.chunked(request.group, request.chunk_size, (1, 1), move |chunk| {
        let local = chunk.local_cells();
        let mut integrand = values.gather(&local);
        if let Some(normals) = normals {
            integrand = pointwise_dot(&integrand, &normals.gather(&local));
        }
        approximation.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), &local, integral)
    }))
}

/// `dw_surface_integrate`: $\int_\Gamma m q$ for a scalar material $m$ and scalar test
/// functions $q$.
///
/// Only contributes to the residual.
pub(crate) fn integrate_surface_operator<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let material = args.material("material")?;
    let virtual_variable = args.variable("virtual")?;
    require_scalar(term, virtual_variable)?;
    let domain = surface_domain(term);
    let approximation = virtual_variable
        .field()
        .approximation(request.group, &domain)?;
    let scope = CacheScope {
        group: request.group,
        domain: &domain,
        integral: term.integral(),
    };
    let material_qp = cache.material_at_qp(material, virtual_variable.field(), scope, (1, 1))?;
    let basis = approximation.base_functions(term.integral(), 0)?;
    let n = approximation
        .data_shape(term.integral())?
        .num_element_nodes;
    let integral = term.integral();

    Ok(term.chunked(request.group, request.chunk_size, (n, 1), move |chunk| {
        let local = chunk.local_cells();
        let integrand = weighted_basis(basis, &material_qp.gather(&local));
        approximation.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), &local, integral)
    }))
}

/// `di_volume_integrate_mat`: $\int_\Omega m$ for a material of the term's material shape.
pub(crate) fn integrate_volume_mat<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let material = args.material("material")?;
    let parameter = args.variable("parameter")?;
    let approximation = parameter
        .field()
        .approximation(request.group, &VOLUME_DOMAIN)?;
    let scope = CacheScope {
        group: request.group,
        domain: &VOLUME_DOMAIN,
        integral: term.integral(),
    };
    let shape = term.options().material_shape;
    let material_qp = cache.material_at_qp(material, parameter.field(), scope, shape)?;
    let integral = term.integral();

    Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
        let cells = chunk.indices();
        let integrand = material_qp.gather(cells);
        approximation.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)
    }))
}
