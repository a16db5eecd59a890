use crate::approximation::Integrand;
use crate::cache::{CacheScope, QuadraturePointCache};
use crate::error::{shape_mismatch, TermError};
use crate::field::Domain;
use crate::term::{Contributions, EvaluationRequest, ResolvedArgs, Term};
use crate::terms::{pointwise_dot, pointwise_scale, require_same_qp, VOLUME_DOMAIN};
use crate::Real;

/// `d_volume_dot` and `d_surface_dot`: the $L^2$ inner product $\int p r$ or
/// $\int u \cdot w$ over the volume or surface of the region.
pub(crate) fn dot_product<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
    domain: Domain,
) -> Result<Contributions<'a, T>, TermError> {
    let p1 = args.variable("parameter_1")?;
    let p2 = args.variable("parameter_2")?;
    if p1.num_components() != p2.num_components() {
        return Err(shape_mismatch(
            format!("operands of {}", term.name()),
            format!(
                "{} has {} components, {} has {}",
                p1.name(),
                p1.num_components(),
                p2.name(),
                p2.num_components()
            ),
        ));
    }
    let a1 = p1.field().approximation(request.group, &domain)?;
    let a2 = p2.field().approximation(request.group, &domain)?;
    require_same_qp(term, a1, a2)?;
    let scope = CacheScope {
        group: request.group,
        domain: &domain,
        integral: term.integral(),
    };
    let v1 = cache.state_at_qp(p1, None, a1, scope, 0)?;
    let v2 = cache.state_at_qp(p2, None, a2, scope, 0)?;
    let integral = term.integral();
    let surface = matches!(domain, Domain::Surface(_));

    Ok(term.chunked(request.group, request.chunk_size, (1, 1), move |chunk| {
        let cells = if surface {
            chunk.local_cells()
        } else {
            chunk.indices().to_vec()
        };
        let integrand = pointwise_dot(&v1.gather(&cells), &v2.gather(&cells));
        a1.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), &cells, integral)
    }))
}

/// `d_volume_wdot`: the weighted inner product $\int_\Omega y \\, p r$ with a scalar weight $y$.
pub(crate) fn weighted_dot_product<'a, T: Real>(
    term: &'a Term<T>,
    args: &ResolvedArgs<'a, T>,
    request: &EvaluationRequest,
    cache: &mut QuadraturePointCache<T>,
) -> Result<Contributions<'a, T>, TermError> {
    let material = args.material("material")?;
    let p1 = args.variable("parameter_1")?;
    let p2 = args.variable("parameter_2")?;
    if p1.num_components() != p2.num_components() {
        return Err(shape_mismatch(
            format!("operands of {}", term.name()),
            format!("{} and {} components", p1.num_components(), p2.num_components()),
        ));
    }
    let a1 = p1.field().approximation(request.group, &VOLUME_DOMAIN)?;
    let a2 = p2.field().approximation(request.group, &VOLUME_DOMAIN)?;
    require_same_qp(term, a1, a2)?;
    let scope = CacheScope {
        group: request.group,
        domain: &VOLUME_DOMAIN,
        integral: term.integral(),
    };
    let v1 = cache.state_at_qp(p1, None, a1, scope, 0)?;
    let v2 = cache.state_at_qp(p2, None, a2, scope, 0)?;
    let weight = cache.material_at_qp(material, p1.field(), scope, (1, 1))?;
    let integral = term.integral();

    Ok(term.chunked(request.group, request.chunk_size, (1, 1), move |chunk| {
        let cells = chunk.indices();
        let dot = pointwise_dot(&v1.gather(cells), &v2.gather(cells));
        let integrand = pointwise_scale(&dot, &weight.gather(cells));
        a1.integrate_chunk(&mut chunk.output, Integrand::Values(&integrand), cells, integral)
    }))
}
