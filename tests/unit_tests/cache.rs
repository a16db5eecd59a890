use crate::{gauss2, nodal_values, p1_segment_approximation, segment_approximation, segment_field, segment_region};
use fenris_terms::approximation::{Approximation, DataShape, Integral, Integrand, IntegrationStatus};
use fenris_terms::blocks::ElementBlocks;
use fenris_terms::cache::{CacheScope, CacheStatistics, QuadraturePointCache};
use fenris_terms::error::TermError;
use fenris_terms::field::{Domain, Field, Variable};
use fenris_terms::material::MaterialParameter;
use fenris_terms::nalgebra::{DMatrix, DVector};
use matrixcompare::assert_scalar_eq;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how often basis functions are requested, i.e. how often values are interpolated.
#[derive(Debug)]
struct CountingApproximation<A> {
    inner: A,
    basis_requests: Arc<AtomicUsize>,
}

impl<A: Approximation<f64>> Approximation<f64> for CountingApproximation<A> {
    fn data_shape(&self, integral: &Integral) -> Result<DataShape, TermError> {
        self.inner.data_shape(integral)
    }

    fn element_nodes(&self, cell: usize) -> &[usize] {
        self.inner.element_nodes(cell)
    }

    fn base_functions(&self, integral: &Integral, derivative_order: usize) -> Result<&[DMatrix<f64>], TermError> {
        self.basis_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.base_functions(integral, derivative_order)
    }

    fn integrate_chunk(
        &self,
        output: &mut ElementBlocks<f64>,
        integrand: Integrand<'_, f64>,
        cells: &[usize],
        integral: &Integral,
    ) -> Result<IntegrationStatus, TermError> {
        self.inner
            .integrate_chunk(output, integrand, cells, integral)
    }
}

fn counting_field(num_elements: usize) -> (Arc<Field<f64>>, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let approximation = CountingApproximation {
        inner: segment_approximation(num_elements, 1.0 / num_elements as f64),
        basis_requests: Arc::clone(&counter),
    };
    let field = Field::new("u", 1, num_elements + 1).with_group(approximation);
    (Arc::new(field), counter)
}

fn group_scope<'a>(domain: &'a Domain, integral: &'a Integral) -> CacheScope<'a> {
    CacheScope {
        group: 0,
        domain,
        integral,
    }
}

#[test]
fn state_at_qp_is_computed_once_per_key() {
    let (field, counter) = counting_field(4);
    let u = Variable::new("u", Arc::clone(&field))
        .with_values(nodal_values(4, |x| x))
        .unwrap();
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();

    let mut cache = QuadraturePointCache::new();
    let first = cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    let second = cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.statistics(), CacheStatistics { hits: 1, misses: 1 });

    assert_eq!(first.num_cells(), 4);
    assert_eq!(first.num_qp(), 2);
    assert_eq!(first.value_shape(), (1, 1));
    // The quadrature points of element e are at (e + 1/2 -+ 1/(2 sqrt 3)) h
    let h = 0.25;
    let offset = 0.5 / f64::sqrt(3.0);
    assert_scalar_eq!(first.entry(2, 0)[(0, 0)], (2.5 - offset) * h, comp = abs, tol = 1e-14);
    assert_scalar_eq!(first.entry(2, 1)[(0, 0)], (2.5 + offset) * h, comp = abs, tol = 1e-14);
}

#[test]
fn reset_and_step_change_discard_entries() {
    let (field, counter) = counting_field(2);
    let u = Variable::new("u", Arc::clone(&field));
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();

    let mut cache = QuadraturePointCache::new();
    cache.synchronize_step(3);
    cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    // Same step: entries are kept
    cache.synchronize_step(3);
    assert_eq!(cache.len(), 1);

    cache.synchronize_step(4);
    assert!(cache.is_empty());
    cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    cache.reset();
    assert!(cache.is_empty());
}

#[test]
fn first_observed_step_keeps_entries() {
    let (field, counter) = counting_field(2);
    let u = Variable::new("u", Arc::clone(&field));
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();

    let mut cache = QuadraturePointCache::new();
    cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    cache.synchronize_step(1);
    assert_eq!(cache.len(), 1);
    cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    cache.synchronize_step(2);
    assert!(cache.is_empty());

    // After a reset, the next step is again the first one observed
    cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    cache.reset();
    cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    cache.synchronize_step(7);
    assert_eq!(cache.len(), 1);
}

#[test]
fn current_values_are_shared_by_history_lookups() {
    let (field, counter) = counting_field(2);
    let p = Variable::new("p", Arc::clone(&field));
    let history = Variable::new("p0", Arc::clone(&field));
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();

    let mut cache = QuadraturePointCache::new();
    let current = cache
        .state_at_qp(&p, None, approximation, scope, 0)
        .unwrap();
    let with_history = cache
        .state_at_qp(&p, Some(&history), approximation, scope, 0)
        .unwrap();
    assert!(Rc::ptr_eq(&current, &with_history));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    cache
        .state_at_qp(&p, Some(&history), approximation, scope, 1)
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn history_offsets_read_the_history_variable() {
    let field = segment_field("p", 1, 2);
    let p = Variable::new("p", Arc::clone(&field))
        .with_values(DVector::from_element(3, 1.0))
        .unwrap();
    let mut history = Variable::new("p0", Arc::clone(&field)).with_history(1);
    history
        .set_values(DVector::from_element(3, 3.0))
        .unwrap();
    history
        .push_step(DVector::from_element(3, 2.0))
        .unwrap();

    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();
    let mut cache = QuadraturePointCache::new();

    for (offset, expected) in [(0, 1.0), (1, 2.0), (2, 3.0)] {
        let values = cache
            .state_at_qp(&p, Some(&history), approximation, scope, offset)
            .unwrap();
        assert_scalar_eq!(values.entry(1, 1)[(0, 0)], expected, comp = abs, tol = 1e-14);
    }

    let missing = cache.state_at_qp(&p, Some(&history), approximation, scope, 3);
    assert_eq!(
        missing.unwrap_err(),
        TermError::MissingHistory {
            variable: "p0".to_string(),
            offset: 2
        }
    );

    // Without a history variable, offsets refer to the variable's own steps
    let missing = cache.state_at_qp(&p, None, approximation, scope, 1);
    assert!(matches!(missing, Err(TermError::MissingHistory { .. })));
}

#[test]
fn material_broadcast_modes() {
    let field = segment_field("u", 1, 4);
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();
    let mut cache = QuadraturePointCache::new();

    let constant = MaterialParameter::constant("c", DMatrix::from_row_slice(2, 1, &[1.0, 2.0]));
    let data = cache
        .material_at_qp(&constant, &field, scope, (2, 1))
        .unwrap();
    assert!(data.is_broadcast());
    assert_eq!(data.value_shape(), (2, 1));
    assert_eq!(data.entry(3, 1)[(1, 0)], 2.0);

    let per_element = (0..4)
        .map(|e| DMatrix::from_element(1, 1, e as f64))
        .collect();
    let per_element = MaterialParameter::per_element("e", per_element).unwrap();
    let data = cache
        .material_at_qp(&per_element, &field, scope, (1, 1))
        .unwrap();
    assert_eq!(data.num_cells(), 4);
    assert_eq!(data.entry(2, 0)[(0, 0)], 2.0);

    // Linear vertex values are reproduced exactly at the quadrature points
    let per_vertex = (0..5)
        .map(|i| DMatrix::from_element(1, 1, i as f64 * 0.25))
        .collect();
    let per_vertex = MaterialParameter::per_vertex("v", per_vertex).unwrap();
    let data = cache
        .material_at_qp(&per_vertex, &field, scope, (1, 1))
        .unwrap();
    let u = Variable::new("x", Arc::clone(&field))
        .with_values(nodal_values(4, |x| x))
        .unwrap();
    let x = cache
        .state_at_qp(&u, None, approximation, scope, 0)
        .unwrap();
    for cell in 0..4 {
        for q in 0..2 {
            assert_scalar_eq!(data.entry(cell, q)[(0, 0)], x.entry(cell, q)[(0, 0)], comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn vertex_materials_are_cached_per_field() {
    let forward = segment_field("u", 1, 4);
    // The same nodes, with elements numbered from the right end
    let backward_connectivity = (0..4).map(|e| vec![4 - e, 3 - e]).collect();
    let backward = Field::new("w", 1, 5).with_group(p1_segment_approximation(backward_connectivity, 0.25));
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let mut cache = QuadraturePointCache::new();

    let per_vertex = (0..5)
        .map(|i| DMatrix::from_element(1, 1, i as f64 * 0.25))
        .collect();
    let per_vertex = MaterialParameter::per_vertex("v", per_vertex).unwrap();
    let on_forward = cache
        .material_at_qp(&per_vertex, &forward, scope, (1, 1))
        .unwrap();
    let on_backward = cache
        .material_at_qp(&per_vertex, &backward, scope, (1, 1))
        .unwrap();
    assert_eq!(cache.statistics(), CacheStatistics { hits: 0, misses: 2 });
    // Element 0 is [0, 0.25] on the first field and [0.75, 1] on the second
    let offset = 0.5 / f64::sqrt(3.0);
    assert_scalar_eq!(on_forward.entry(0, 0)[(0, 0)], (0.5 - offset) * 0.25, comp = abs, tol = 1e-14);
    assert_scalar_eq!(on_backward.entry(0, 0)[(0, 0)], 1.0 - (0.5 - offset) * 0.25, comp = abs, tol = 1e-14);

    // Constant materials do not depend on the field
    let constant = MaterialParameter::scalar("c", 3.0);
    let first = cache
        .material_at_qp(&constant, &forward, scope, (1, 1))
        .unwrap();
    let second = cache
        .material_at_qp(&constant, &backward, scope, (1, 1))
        .unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn material_shape_mismatch_is_an_error() {
    let field = segment_field("u", 1, 4);
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let mut cache = QuadraturePointCache::new();

    let vector = MaterialParameter::constant("c", DMatrix::from_element(3, 1, 1.0));
    let result = cache.material_at_qp(&vector, &field, scope, (1, 1));
    assert!(matches!(result, Err(TermError::ShapeMismatch { .. })));

    let too_few = MaterialParameter::per_element("e", vec![DMatrix::from_element(1, 1, 1.0); 3]).unwrap();
    let result = cache.material_at_qp(&too_few, &field, scope, (1, 1));
    assert!(matches!(result, Err(TermError::ShapeMismatch { .. })));
}

#[test]
fn volumes_are_in_region_order() {
    let field = segment_field("u", 1, 4);
    let region = segment_region(4);
    let (domain, integral) = (Domain::Volume, gauss2());
    let scope = group_scope(&domain, &integral);
    let mut cache = QuadraturePointCache::new();

    let volumes = cache.volume(&region, &field, scope).unwrap();
    assert_eq!(volumes.len(), 4);
    for &v in volumes.iter() {
        assert_scalar_eq!(v, 0.25, comp = abs, tol = 1e-14);
    }
    let total = cache.region_volume(&region, &field, scope).unwrap();
    assert_scalar_eq!(total, 1.0, comp = abs, tol = 1e-14);
    assert_eq!(cache.statistics(), CacheStatistics { hits: 1, misses: 1 });
}

#[test]
fn missing_integral_is_an_error() {
    let field = segment_field("u", 1, 2);
    let u = Variable::new("u", Arc::clone(&field));
    let domain = Domain::Volume;
    let integral = Integral::new("gauss5");
    let scope = group_scope(&domain, &integral);
    let approximation = field.approximation(0, &domain).unwrap();
    let mut cache = QuadraturePointCache::<f64>::new();

    let result = cache.state_at_qp(&u, None, approximation, scope, 0);
    assert_eq!(result.unwrap_err(), TermError::MissingIntegral("gauss5".to_string()));
}

#[test]
fn surface_data_is_indexed_by_face() {
    let field = segment_field("u", 1, 4);
    let u = Variable::new("u", Arc::clone(&field))
        .with_values(nodal_values(4, |x| 1.0 + x))
        .unwrap();
    let domain = Domain::Surface("Gamma".to_string());
    let integral = gauss2();
    let approximation = field.approximation(0, &domain).unwrap();
    let mut cache = QuadraturePointCache::new();

    let values = cache
        .state_at_qp(&u, None, approximation, group_scope(&domain, &integral), 0)
        .unwrap();
    assert_eq!(values.num_cells(), 2);
    assert_eq!(values.entry(0, 0)[(0, 0)], 1.0);
    assert_eq!(values.entry(1, 0)[(0, 0)], 2.0);
}
