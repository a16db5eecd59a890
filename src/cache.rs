//! Memoization of quantities evaluated at quadrature points.
//!
//! A [`QuadraturePointCache`] is scoped to a single assembly pass: terms evaluated in the same
//! pass share interpolated state values, broadcast materials and element volumes. The cache must
//! be reset (or replaced) before the next pass, and it drops its entries by itself whenever it
//! observes a different time step through [`QuadraturePointCache::synchronize_step`].
use crate::approximation::{Approximation, Integral, Integrand, IntegrationStatus};
use crate::blocks::{BlockShape, ElementBlocks, QuadratureData};
use crate::error::{shape_mismatch, TermError};
use crate::field::{gather_element_values, Domain, Field, Variable};
use crate::material::{BroadcastMode, MaterialParameter};
use crate::nalgebra::DVector;
use crate::region::Region;
use crate::Real;
use log::{debug, trace};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// The kinds of quantities held by the cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityKind {
    /// Values of a variable interpolated to quadrature points.
    StateAtQp,
    /// Material values broadcast to quadrature points.
    MaterialAtQp,
    /// Element volumes of a region.
    Volume,
}

/// The element group, domain and quadrature rule that cached quantities refer to.
#[derive(Debug, Copy, Clone)]
pub struct CacheScope<'a> {
    pub group: usize,
    pub domain: &'a Domain,
    pub integral: &'a Integral,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: QuantityKind,
    identity: String,
    group: usize,
    domain: Domain,
    integral: Integral,
    history_offset: usize,
}

impl CacheKey {
    fn new(kind: QuantityKind, identity: String, scope: CacheScope, history_offset: usize) -> Self {
        Self {
            kind,
            identity,
            group: scope.group,
            domain: scope.domain.clone(),
            integral: scope.integral.clone(),
            history_offset,
        }
    }
}

/// Counts of cache lookups.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug)]
pub struct QuadraturePointCache<T: Real> {
    qp_data: FxHashMap<CacheKey, Rc<QuadratureData<T>>>,
    volumes: FxHashMap<CacheKey, Rc<DVector<T>>>,
    step: Option<usize>,
    statistics: CacheStatistics,
}

impl<T: Real> Default for QuadraturePointCache<T> {
    fn default() -> Self {
        Self {
            qp_data: FxHashMap::default(),
            volumes: FxHashMap::default(),
            step: None,
            statistics: CacheStatistics::default(),
        }
    }
}

impl<T: Real> QuadraturePointCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all entries.
    pub fn reset(&mut self) {
        self.qp_data.clear();
        self.volumes.clear();
        self.step = None;
    }

    /// Records the current time step, discarding all entries if it differs from a step seen
    /// previously.
    ///
    /// History offsets are relative to the current step, so entries computed for another step
    /// refer to different data. The first step observed after creation or [`reset`](Self::reset)
    /// keeps the entries computed so far in the pass.
    pub fn synchronize_step(&mut self, step: usize) {
        match self.step {
            Some(previous) if previous != step => {
                debug!(
                    "Time step changed from {} to {}, discarding {} cached entries",
                    previous,
                    step,
                    self.len()
                );
                self.qp_data.clear();
                self.volumes.clear();
            }
            _ => {}
        }
        self.step = Some(step);
    }

    pub fn len(&self) -> usize {
        self.qp_data.len() + self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.statistics
    }

    /// Values of a variable at the quadrature points of every cell of the approximation.
    ///
    /// The result has one `num_components x 1` block per `(cell, qp)`. Offset 0 refers to the
    /// current values of `variable`. Offset `k > 0` refers to step `k - 1` of `history` if a
    /// history variable is given, and to step `k` of `variable` otherwise.
    pub fn state_at_qp(
        &mut self,
        variable: &Variable<T>,
        history: Option<&Variable<T>>,
        approximation: &dyn Approximation<T>,
        scope: CacheScope,
        history_offset: usize,
    ) -> Result<Rc<QuadratureData<T>>, TermError> {
        // Offset 0 always refers to the current values, regardless of the history variable
        let identity = match history {
            Some(history) if history_offset > 0 => format!("{}|{}", variable.name(), history.name()),
            _ => variable.name().to_string(),
        };
        let key = CacheKey::new(QuantityKind::StateAtQp, identity, scope, history_offset);
        if let Some(data) = self.qp_data.get(&key) {
            self.statistics.hits += 1;
            return Ok(Rc::clone(data));
        }
        self.statistics.misses += 1;
        trace!(
            "Interpolating {} at offset {} to quadrature points (group {}, {})",
            variable.name(),
            history_offset,
            scope.group,
            scope.domain
        );

        let (source, offset) = match (history_offset, history) {
            (0, _) => (variable, 0),
            (k, Some(history)) => (history, k - 1),
            (k, None) => (variable, k),
        };
        let values = source
            .values(offset)
            .ok_or_else(|| TermError::MissingHistory {
                variable: source.name().to_string(),
                offset,
            })?;

        let data = interpolate_to_quadrature_points(variable, values, approximation, scope.integral)?;
        let data = Rc::new(data);
        self.qp_data.insert(key, Rc::clone(&data));
        Ok(data)
    }

    /// Material values at the quadrature points of the approximation of `field`.
    ///
    /// Constant materials yield broadcast data with a single cell. Vertex materials are
    /// interpolated with the basis of the field, so their entries are specific to the field.
    pub fn material_at_qp(
        &mut self,
        material: &MaterialParameter<T>,
        field: &Field<T>,
        scope: CacheScope,
        expected_shape: BlockShape,
    ) -> Result<Rc<QuadratureData<T>>, TermError> {
        let identity = match material.mode() {
            BroadcastMode::Vertex => format!("{}|{}", material.name(), field.name()),
            BroadcastMode::Constant | BroadcastMode::ElementAverage => material.name().to_string(),
        };
        let key = CacheKey::new(QuantityKind::MaterialAtQp, identity, scope, 0);
        if let Some(data) = self.qp_data.get(&key) {
            self.statistics.hits += 1;
            if data.value_shape() != expected_shape {
                return Err(shape_mismatch(
                    format!("material {}", material.name()),
                    format!("expected values of shape {:?}, got {:?}", expected_shape, data.value_shape()),
                ));
            }
            return Ok(Rc::clone(data));
        }
        self.statistics.misses += 1;
        trace!("Broadcasting material {} to quadrature points", material.name());

        let approximation = field.approximation(scope.group, scope.domain)?;
        let data = Rc::new(material.at_quadrature_points(approximation, scope.integral, expected_shape)?);
        self.qp_data.insert(key, Rc::clone(&data));
        Ok(data)
    }

    /// Volumes of the cells of the region, in region order.
    ///
    /// The volumes are computed by integrating 1 with the approximation of `field`.
    pub fn volume(
        &mut self,
        region: &Region,
        field: &Field<T>,
        scope: CacheScope,
    ) -> Result<Rc<DVector<T>>, TermError> {
        let identity = format!("{}|{}", region.name(), field.name());
        let key = CacheKey::new(QuantityKind::Volume, identity, scope, 0);
        if let Some(volumes) = self.volumes.get(&key) {
            self.statistics.hits += 1;
            return Ok(Rc::clone(volumes));
        }
        self.statistics.misses += 1;
        trace!("Computing element volumes of region {}", region.name());

        let approximation = field.approximation(scope.group, scope.domain)?;
        let region_cells = region.cells(scope.group);
        let cells: Vec<usize> = match scope.domain {
            Domain::Volume => region_cells.to_vec(),
            Domain::Surface(_) => (0..region_cells.len()).collect(),
        };
        let n_qp = approximation.data_shape(scope.integral)?.num_qp;
        let ones = QuadratureData::from_fn(1, n_qp, (1, 1), |_, _, mut out| out.fill(T::one()));
        let mut output = ElementBlocks::zeros(cells.len(), (1, 1));
        let status = approximation.integrate_chunk(&mut output, Integrand::Values(&ones), &cells, scope.integral)?;
        if let IntegrationStatus::Failure(code) = status {
            return Err(TermError::IntegrationFailure {
                code,
                elements: region_cells.to_vec(),
            });
        }

        let volumes = Rc::new(DVector::from_column_slice(output.as_slice()));
        self.volumes.insert(key, Rc::clone(&volumes));
        Ok(volumes)
    }

    /// Total volume of the region's cells.
    pub fn region_volume(&mut self, region: &Region, field: &Field<T>, scope: CacheScope) -> Result<T, TermError> {
        Ok(self.volume(region, field, scope)?.sum())
    }
}

fn interpolate_to_quadrature_points<T: Real>(
    variable: &Variable<T>,
    values: &DVector<T>,
    approximation: &dyn Approximation<T>,
    integral: &Integral,
) -> Result<QuadratureData<T>, TermError> {
    let shape = approximation.data_shape(integral)?;
    let basis = approximation.base_functions(integral, 0)?;
    let s = variable.num_components();
    let num_nodes = variable.field().num_nodes();

    let mut data = QuadratureData::zeros(shape.num_elements, shape.num_qp, (s, 1));
    for cell in 0..shape.num_elements {
        let nodes = approximation.element_nodes(cell);
        if let Some(&node) = nodes.iter().find(|&&node| node >= num_nodes) {
            return Err(shape_mismatch(
                format!("variable {}", variable.name()),
                format!("cell {} refers to node {}, but the field has {} nodes", cell, node, num_nodes),
            ));
        }
        let u_element = gather_element_values(values, nodes, s);
        for (q, phi) in basis.iter().enumerate() {
            let mut out = data.entry_mut(cell, q);
            out.copy_from(&(&u_element * phi.transpose()));
        }
    }
    Ok(data)
}
