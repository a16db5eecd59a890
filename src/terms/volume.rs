//! Volumes and element averages.
use crate::approximation::{Integrand, IntegrationStatus};
use crate::cache::{CacheScope, QuadraturePointCache};
use crate::chunk::ElementChunk;
use crate::error::TermError;
use crate::nalgebra::DVector;
use crate::term::{Contributions, EvaluationRequest, ResolvedArgs, Term};
use crate::terms::VOLUME_DOMAIN;
use crate::Real;

/// `d_volume`: the volume $\int_\Omega 1$ of the region, as a single contribution.
pub(crate) fn volume<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let parameter = args.variable("parameter")?;
    let scope = CacheScope {
        group: request.group,
        domain: &VOLUME_DOMAIN,
        integral: term.integral(),
    };
    let volumes = cache.volume(term.region(), parameter.field(), scope)?;

    Ok(term.chunked(request.group, None, (1, 1), move |chunk| {
        for (k, local) in chunk.local_indices().enumerate() {
            let mut block = chunk.output.block_mut(k);
            block[(0, 0)] = volumes[local];
        }
        Ok(IntegrationStatus::Success)
    }))
}

fn divide_by_volumes<T: Real>(chunk: &mut ElementChunk<'_, T>, volumes: &DVector<T>) {
    for (k, local) in chunk.local_indices().enumerate() {
        let mut block = chunk.output.block_mut(k);
        block /= volumes[local];
    }
}

/// `de_volume_average_mat`: the element averages $\int_K m / \int_K 1$ of a material.
pub(crate) fn average_volume_mat<'a, T: Real>(
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
    let volumes = cache.volume(term.region(), parameter.field(), scope)?;
    let integral = term.integral();

    Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
        let cells = chunk.indices();
        let integrand = material_qp.gather(cells);
        let status = approximation.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)?;
        divide_by_volumes(chunk, &volumes);
        Ok(status)
    }))
}

/// `de_average_variable`: the element averages $\int_K y / \int_K 1$ of a variable.
pub(crate) fn average_variable<'a, T: Real>(
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
    let volumes = cache.volume(term.region(), parameter.field(), scope)?;
    let integral = term.integral();

    let shape = (parameter.num_components(), 1);
    Ok(term.chunked(request.group, request.chunk_size, shape, move |chunk| {
        let cells = chunk.indices();
        let integrand = values.gather(cells);
        let status = approximation.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)?;
        divide_by_volumes(chunk, &volumes);
        Ok(status)
    }))
}
