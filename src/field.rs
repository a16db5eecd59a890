//! Fields and the variables defined on them.
use crate::approximation::Approximation;
use crate::error::{shape_mismatch, TermError};
use crate::nalgebra::{DVector, Scalar};
use crate::region::GeometryKind;
use crate::Real;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// The domain of an approximation: the volume of an element group, or the faces of a surface
/// region within an element group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Domain {
    Volume,
    Surface(String),
}

impl Domain {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Volume => GeometryKind::Volume,
            Self::Surface(_) => GeometryKind::Surface,
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => write!(f, "volume"),
            Self::Surface(region) => write!(f, "surface ({})", region),
        }
    }
}

/// A finite element field: the approximations of every element group.
#[derive(Debug)]
pub struct Field<T: Real> {
    name: String,
    num_components: usize,
    num_nodes: usize,
    volume: Vec<Box<dyn Approximation<T>>>,
    surface: FxHashMap<(String, usize), Box<dyn Approximation<T>>>,
}

impl<T: Real> Field<T> {
    /// Creates a field with `num_components` values per node on a mesh with `num_nodes` nodes.
    pub fn new(name: impl Into<String>, num_components: usize, num_nodes: usize) -> Self {
        Self {
            name: name.into(),
            num_components,
            num_nodes,
            volume: Vec::new(),
            surface: FxHashMap::default(),
        }
    }

    /// Adds the volume approximation of the next element group.
    pub fn with_group(mut self, approximation: impl Approximation<T> + 'static) -> Self {
        self.volume.push(Box::new(approximation));
        self
    }

    /// Adds the approximation of the faces of a surface region within a group.
    pub fn with_surface(
        mut self,
        region: impl Into<String>,
        group: usize,
        approximation: impl Approximation<T> + 'static,
    ) -> Self {
        self.surface
            .insert((region.into(), group), Box::new(approximation));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_dofs(&self) -> usize {
        self.num_nodes * self.num_components
    }

    pub fn num_groups(&self) -> usize {
        self.volume.len()
    }

    pub fn approximation(&self, group: usize, domain: &Domain) -> Result<&dyn Approximation<T>, TermError> {
        let approximation = match domain {
            Domain::Volume => self.volume.get(group),
            Domain::Surface(region) => self.surface.get(&(region.clone(), group)),
        };
        approximation
            .map(|a| a.as_ref())
            .ok_or_else(|| TermError::MissingApproximation {
                field: self.name.clone(),
                group,
                domain: domain.to_string(),
            })
    }
}

/// A variable defined on a field, together with the values of previous time steps.
///
/// Values are stored per node with interleaved components, i.e. component `c` of node `i` is
/// stored at index `i * num_components + c`.
#[derive(Debug, Clone)]
pub struct Variable<T: Real> {
    name: String,
    field: Arc<Field<T>>,
    history_capacity: usize,
    // Front is the current step
    steps: VecDeque<DVector<T>>,
}

impl<T: Real> Variable<T> {
    /// Creates a variable with zero values that keeps only the current step.
    pub fn new(name: impl Into<String>, field: Arc<Field<T>>) -> Self {
        let zeros = DVector::zeros(field.num_dofs());
        Self {
            name: name.into(),
            field,
            history_capacity: 0,
            steps: VecDeque::from(vec![zeros]),
        }
    }

    /// Sets the number of previous steps retained by [`push_step`](Self::push_step).
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self.steps.truncate(capacity + 1);
        self
    }

    pub fn with_values(mut self, values: DVector<T>) -> Result<Self, TermError> {
        self.set_values(values)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &Field<T> {
        &self.field
    }

    pub fn num_components(&self) -> usize {
        self.field.num_components()
    }

    /// Overwrites the values of the current step.
    pub fn set_values(&mut self, values: DVector<T>) -> Result<(), TermError> {
        self.check_len(&values)?;
        self.steps[0] = values;
        Ok(())
    }

    /// Starts a new time step with the given values. The previous current values become history.
    pub fn push_step(&mut self, values: DVector<T>) -> Result<(), TermError> {
        self.check_len(&values)?;
        self.steps.push_front(values);
        self.steps.truncate(self.history_capacity + 1);
        Ok(())
    }

    /// The values at the given history offset, where offset 0 is the current step.
    pub fn values(&self, offset: usize) -> Option<&DVector<T>> {
        self.steps.get(offset)
    }

    /// Number of stored steps, including the current one.
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    fn check_len(&self, values: &DVector<T>) -> Result<(), TermError> {
        if values.len() != self.field.num_dofs() {
            return Err(shape_mismatch(
                format!("values of variable {}", self.name),
                format!("expected {} DOFs, got {}", self.field.num_dofs(), values.len()),
            ));
        }
        Ok(())
    }
}

/// Gathers the nodal values of a cell into a `num_components x num_element_nodes` matrix.
pub(crate) fn gather_element_values<T: Scalar>(
    values: &DVector<T>,
    nodes: &[usize],
    num_components: usize,
) -> crate::nalgebra::DMatrix<T> {
    crate::nalgebra::DMatrix::from_fn(num_components, nodes.len(), |c, j| {
        values[nodes[j] * num_components + c].clone()
    })
}
