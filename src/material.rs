//! Material parameters and their broadcast to quadrature points.
use crate::approximation::{Approximation, Integral};
use crate::blocks::{BlockShape, QuadratureData};
use crate::error::{shape_mismatch, TermError};
use crate::nalgebra::{DMatrix, Scalar};
use crate::Real;
use serde::{Deserialize, Serialize};

/// How the values of a material parameter are distributed over the domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BroadcastMode {
    /// A single value for all elements.
    Constant,
    /// One value per element, constant within the element.
    ElementAverage,
    /// One value per mesh node, interpolated with the basis functions of the approximation.
    Vertex,
}

/// A named coefficient of a weak form.
///
/// The broadcast mode is fixed on construction, so that the broadcast to quadrature points
/// never needs to guess it from array shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParameter<T: Scalar> {
    name: String,
    mode: BroadcastMode,
    shape: BlockShape,
    values: Vec<DMatrix<T>>,
}

impl<T: Real> MaterialParameter<T> {
    pub fn constant(name: impl Into<String>, value: DMatrix<T>) -> Self {
        Self {
            name: name.into(),
            mode: BroadcastMode::Constant,
            shape: value.shape(),
            values: vec![value],
        }
    }

    /// Convenience constructor for a constant scalar.
    pub fn scalar(name: impl Into<String>, value: T) -> Self {
        Self::constant(name, DMatrix::from_element(1, 1, value))
    }

    /// One value per element of the group the material is used with.
    pub fn per_element(name: impl Into<String>, values: Vec<DMatrix<T>>) -> Result<Self, TermError> {
        Self::from_values(name.into(), BroadcastMode::ElementAverage, values)
    }

    /// One value per mesh node.
    pub fn per_vertex(name: impl Into<String>, values: Vec<DMatrix<T>>) -> Result<Self, TermError> {
        Self::from_values(name.into(), BroadcastMode::Vertex, values)
    }

    fn from_values(name: String, mode: BroadcastMode, values: Vec<DMatrix<T>>) -> Result<Self, TermError> {
        let shape = values
            .first()
            .map(|v| v.shape())
            .ok_or_else(|| shape_mismatch(format!("material {}", name), "at least one value required"))?;
        if values.iter().any(|v| v.shape() != shape) {
            return Err(shape_mismatch(
                format!("material {}", name),
                "all values must have the same shape",
            ));
        }
        Ok(Self {
            name,
            mode,
            shape,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> BroadcastMode {
        self.mode
    }

    /// The shape of a single value.
    pub fn shape(&self) -> BlockShape {
        self.shape
    }

    pub fn values(&self) -> &[DMatrix<T>] {
        &self.values
    }

    /// Broadcasts the material to the quadrature points of the approximation.
    ///
    /// Constant materials produce broadcast data with a single cell, all other modes produce
    /// one cell per element of the approximation.
    pub fn at_quadrature_points(
        &self,
        approximation: &dyn Approximation<T>,
        integral: &Integral,
        expected_shape: BlockShape,
    ) -> Result<QuadratureData<T>, TermError> {
        let quantity = || format!("material {}", self.name);
        if self.shape != expected_shape {
            return Err(shape_mismatch(
                quantity(),
                format!("expected values of shape {:?}, got {:?}", expected_shape, self.shape),
            ));
        }
        let data_shape = approximation.data_shape(integral)?;
        let n_qp = data_shape.num_qp;

        match self.mode {
            BroadcastMode::Constant => Ok(QuadratureData::from_fn(1, n_qp, self.shape, |_, _, mut out| {
                out.copy_from(&self.values[0])
            })),
            BroadcastMode::ElementAverage => {
                if self.values.len() != data_shape.num_elements {
                    return Err(shape_mismatch(
                        quantity(),
                        format!(
                            "{} element values for {} elements",
                            self.values.len(),
                            data_shape.num_elements
                        ),
                    ));
                }
                Ok(QuadratureData::from_fn(
                    data_shape.num_elements,
                    n_qp,
                    self.shape,
                    |cell, _, mut out| out.copy_from(&self.values[cell]),
                ))
            }
            BroadcastMode::Vertex => {
                let basis = approximation.base_functions(integral, 0)?;
                let mut data = QuadratureData::zeros(data_shape.num_elements, n_qp, self.shape);
                for cell in 0..data_shape.num_elements {
                    let nodes = approximation.element_nodes(cell);
                    if let Some(&node) = nodes.iter().find(|&&node| node >= self.values.len()) {
                        return Err(shape_mismatch(
                            quantity(),
                            format!("no vertex value for node {} ({} values)", node, self.values.len()),
                        ));
                    }
                    for (q, phi) in basis.iter().enumerate() {
                        let mut out = data.entry_mut(cell, q);
                        for (j, &node) in nodes.iter().enumerate() {
                            out += &self.values[node] * phi[(0, j)];
                        }
                    }
                }
                Ok(data)
            }
        }
    }
}

/// An ordered list of materials, e.g. the kernel weights of a history term.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSeries<T: Scalar> {
    name: String,
    items: Vec<MaterialParameter<T>>,
}

impl<T: Real> MaterialSeries<T> {
    pub fn new(name: impl Into<String>, items: Vec<MaterialParameter<T>>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// A series of constant scalar weights.
    pub fn from_scalars(name: impl Into<String>, weights: &[T]) -> Self {
        let name = name.into();
        let items = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| MaterialParameter::scalar(format!("{}[{}]", name, i), w))
            .collect();
        Self { name, items }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MaterialParameter<T>] {
        &self.items
    }
}
