//! Terms of weak forms and their evaluation protocol.
use crate::approximation::{Integral, IntegrationStatus};
use crate::bindings::{Argument, Bindings};
use crate::blocks::{BlockShape, ElementBlocks};
use crate::cache::{QuadraturePointCache, QuantityKind};
use crate::chunk::{ElementChunk, ElementChunks};
use crate::error::{shape_mismatch, TermError};
use crate::field::{Domain, Variable};
use crate::material::{MaterialParameter, MaterialSeries};
use crate::nalgebra::DMatrix;
use crate::region::{GeometryKind, Region};
use crate::terms;
use crate::time::TimeStep;
use crate::Real;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::sync::Arc;

/// The kind of quantity an argument role accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgKind {
    /// Test function variable.
    Virtual,
    /// Unknown variable. Jacobians are taken with respect to it.
    State,
    /// Variable with given values.
    Parameter,
    Material,
    /// Ordered list of materials.
    MaterialSeries,
    TimeStep,
}

impl Display for ArgKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Virtual => "virtual variable",
            Self::State => "state variable",
            Self::Parameter => "parameter variable",
            Self::Material => "material",
            Self::MaterialSeries => "material series",
            Self::TimeStep => "time step",
        };
        write!(f, "{}", name)
    }
}

/// A named argument role of a term.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArgType {
    pub role: &'static str,
    pub kind: ArgKind,
}

/// The domain a term integrates over, and the argument whose approximation provides it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeometryRequirement {
    pub kind: GeometryKind,
    pub role: &'static str,
}

/// How many time steps of a cached quantity a term needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryWindow {
    /// Steps retained for the current and previous evaluation.
    Bounded { current: usize, previous: usize },
    /// The complete step history.
    Unbounded,
}

/// A cached quantity used by a term.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheUse {
    pub kind: QuantityKind,
    pub roles: &'static [&'static str],
    pub history: Option<HistoryWindow>,
}

/// How a term reduces the integrated values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reduction {
    /// A single block per chunk. The value over the region is the sum over all chunks.
    Region,
    /// One block per element.
    Element,
    /// One residual vector or Jacobian block per element, over the element's DOFs.
    ElementDofs,
}

/// Static description of a term.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TermInfo {
    pub name: &'static str,
    pub arg_types: &'static [ArgType],
    pub geometry: &'static [GeometryRequirement],
    pub use_caches: &'static [CacheUse],
    pub reduction: Reduction,
}

/// All available terms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermKind {
    IntegrateVolume,
    IntegrateVolumeOperator,
    IntegrateSurface,
    IntegrateSurfaceOperator,
    DotProductVolume,
    DotProductSurface,
    Volume,
    AverageVolumeMat,
    IntegrateVolumeMat,
    WDotProductVolume,
    WDotProductVolumeOperator,
    WDotProductVolumeOperatorDt,
    WDotProductVolumeOperatorTh,
    AverageVariable,
}

impl TermKind {
    pub const ALL: [TermKind; 14] = [
        Self::IntegrateVolume,
        Self::IntegrateVolumeOperator,
        Self::IntegrateSurface,
        Self::IntegrateSurfaceOperator,
        Self::DotProductVolume,
        Self::DotProductSurface,
        Self::Volume,
        Self::AverageVolumeMat,
        Self::IntegrateVolumeMat,
        Self::WDotProductVolume,
        Self::WDotProductVolumeOperator,
        Self::WDotProductVolumeOperatorDt,
        Self::WDotProductVolumeOperatorTh,
        Self::AverageVariable,
    ];

    pub fn info(&self) -> &'static TermInfo {
        use terms::info::*;
        match self {
            Self::IntegrateVolume => &INTEGRATE_VOLUME,
            Self::IntegrateVolumeOperator => &INTEGRATE_VOLUME_OPERATOR,
            Self::IntegrateSurface => &INTEGRATE_SURFACE,
            Self::IntegrateSurfaceOperator => &INTEGRATE_SURFACE_OPERATOR,
            Self::DotProductVolume => &DOT_PRODUCT_VOLUME,
            Self::DotProductSurface => &DOT_PRODUCT_SURFACE,
            Self::Volume => &VOLUME,
            Self::AverageVolumeMat => &AVERAGE_VOLUME_MAT,
            Self::IntegrateVolumeMat => &INTEGRATE_VOLUME_MAT,
            Self::WDotProductVolume => &WDOT_PRODUCT_VOLUME,
            Self::WDotProductVolumeOperator => &WDOT_PRODUCT_VOLUME_OPERATOR,
            Self::WDotProductVolumeOperatorDt => &WDOT_PRODUCT_VOLUME_OPERATOR_DT,
            Self::WDotProductVolumeOperatorTh => &WDOT_PRODUCT_VOLUME_OPERATOR_TH,
            Self::AverageVariable => &AVERAGE_VARIABLE,
        }
    }

    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Looks up a term by its registered name, e.g. `dw_volume_wdot`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

/// Options that are fixed when a term is defined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermOptions {
    /// Shape of material values for terms that integrate or average materials.
    pub material_shape: BlockShape,
    /// Maximum number of history steps used by history-kernel terms.
    pub history_window: Option<usize>,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            material_shape: (1, 1),
            history_window: None,
        }
    }
}

/// Parameters of a single evaluation of a term.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// The element group to evaluate.
    pub group: usize,
    /// Name of the variable to differentiate with respect to, or `None` for the residual.
    pub diff_var: Option<String>,
    /// Maximum number of elements per chunk. `None` evaluates all elements in one chunk.
    pub chunk_size: Option<usize>,
}

impl EvaluationRequest {
    pub fn residual(group: usize) -> Self {
        Self {
            group,
            diff_var: None,
            chunk_size: None,
        }
    }

    pub fn jacobian(group: usize, diff_var: impl Into<String>) -> Self {
        Self {
            group,
            diff_var: Some(diff_var.into()),
            chunk_size: None,
        }
    }

    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Self {
            chunk_size: Some(chunk_size),
            ..self
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    Residual,
    Jacobian,
}

/// A term of a weak form, defined on a region.
#[derive(Debug, Clone)]
pub struct Term<T: Real> {
    kind: TermKind,
    region: Arc<Region>,
    integral: Integral,
    sign: T,
    args: Vec<String>,
    options: TermOptions,
}

impl<T: Real> Term<T> {
    /// Creates a term with sign 1 and default options.
    ///
    /// `args` names the bound quantities, in the order of the term's argument types.
    pub fn new<S: Into<String>>(
        kind: TermKind,
        region: Arc<Region>,
        integral: Integral,
        args: impl IntoIterator<Item = S>,
    ) -> Result<Self, TermError> {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let expected = kind.info().arg_types.len();
        if args.len() != expected {
            return Err(TermError::ArgumentCount {
                term: kind.name().to_string(),
                expected,
                found: args.len(),
            });
        }
        Ok(Self {
            kind,
            region,
            integral,
            sign: T::one(),
            args,
            options: TermOptions::default(),
        })
    }

    pub fn with_sign(self, sign: T) -> Self {
        Self { sign, ..self }
    }

    pub fn with_options(self, options: TermOptions) -> Self {
        Self { options, ..self }
    }

    pub fn kind(&self) -> TermKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn arg_types(&self) -> &'static [ArgType] {
        self.kind.info().arg_types
    }

    pub fn geometry(&self) -> &'static [GeometryRequirement] {
        self.kind.info().geometry
    }

    pub fn use_caches(&self) -> &'static [CacheUse] {
        self.kind.info().use_caches
    }

    pub fn reduction(&self) -> Reduction {
        self.kind.info().reduction
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn integral(&self) -> &Integral {
        &self.integral
    }

    pub fn sign(&self) -> T {
        self.sign
    }

    pub fn arg_names(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> &TermOptions {
        &self.options
    }

    /// Evaluates the term on one element group.
    ///
    /// Cached quantities are fetched immediately, while the per-chunk contributions are computed
    /// lazily as the returned iterator is consumed. If the term does not contribute to the
    /// requested residual or Jacobian block, the iterator is empty.
    pub fn evaluate<'a>(
        &'a self,
        request: &EvaluationRequest,
        bindings: &Bindings<'a, T>,
        cache: &mut QuadraturePointCache<T>,
    ) -> Result<Contributions<'a, T>, TermError> {
        let args = ResolvedArgs::resolve(self, bindings)?;

        if let Some(ts) = args.find_time_step() {
            cache.synchronize_step(ts.step);
        }

        let state = args.find_state();
        let mode = match (&request.diff_var, state) {
            (None, _) => Mode::Residual,
            (Some(target), Some(state)) if target == state.name() => Mode::Jacobian,
            (Some(target), _) => {
                debug!("Term {} does not depend on variable {}", self.name(), target);
                return Ok(Contributions::empty());
            }
        };

        args.check_region_cells(self, request.group)?;
        terms::evaluate(self, &args, mode, request, cache)
    }

    /// Contributions computed chunk by chunk over the region's cells in the requested group.
    pub(crate) fn chunked<'a, F>(
        &'a self,
        group: usize,
        chunk_size: Option<usize>,
        block_shape: BlockShape,
        kernel: F,
    ) -> Contributions<'a, T>
    where
        F: FnMut(&mut ElementChunk<'a, T>) -> Result<IntegrationStatus, TermError> + 'a,
    {
        Contributions {
            pipeline: Some(Pipeline {
                chunks: ElementChunks::new(self.region.cells(group), chunk_size, block_shape),
                kernel: Box::new(kernel),
                reduction: self.reduction(),
                sign: self.sign,
            }),
        }
    }
}

/// Arguments of a term, resolved against the bindings.
#[derive(Debug)]
pub(crate) struct ResolvedArgs<'a, T: Real> {
    term: &'static str,
    args: Vec<(ArgType, Argument<'a, T>)>,
}

impl<'a, T: Real> ResolvedArgs<'a, T> {
    fn resolve(term: &Term<T>, bindings: &Bindings<'a, T>) -> Result<Self, TermError> {
        let mut args = Vec::with_capacity(term.args.len());
        for (&arg_type, name) in term.arg_types().iter().zip(&term.args) {
            let argument = bindings
                .get(name)
                .ok_or_else(|| TermError::MissingArgument {
                    term: term.name().to_string(),
                    role: arg_type.role,
                    name: name.clone(),
                })?;
            let matches = match (arg_type.kind, argument) {
                (ArgKind::Virtual | ArgKind::State | ArgKind::Parameter, Argument::Variable(_)) => true,
                (ArgKind::Material, Argument::Material(_)) => true,
                (ArgKind::MaterialSeries, Argument::MaterialSeries(_)) => true,
                (ArgKind::TimeStep, Argument::TimeStep(_)) => true,
                _ => false,
            };
            if !matches {
                return Err(TermError::ArgumentKind {
                    term: term.name().to_string(),
                    role: arg_type.role,
                    expected: arg_type.kind,
                });
            }
            args.push((arg_type, argument));
        }
        Ok(Self {
            term: term.name(),
            args,
        })
    }

    fn get(&self, role: &str) -> Option<Argument<'a, T>> {
        self.args
            .iter()
            .find(|(arg_type, _)| arg_type.role == role)
            .map(|(_, argument)| *argument)
    }

    fn missing(&self, role: &'static str, expected: ArgKind) -> TermError {
        TermError::ArgumentKind {
            term: self.term.to_string(),
            role,
            expected,
        }
    }

    pub(crate) fn variable(&self, role: &'static str) -> Result<&'a Variable<T>, TermError> {
        match self.get(role) {
            Some(Argument::Variable(variable)) => Ok(variable),
            _ => Err(self.missing(role, ArgKind::Parameter)),
        }
    }

    pub(crate) fn material(&self, role: &'static str) -> Result<&'a MaterialParameter<T>, TermError> {
        match self.get(role) {
            Some(Argument::Material(material)) => Ok(material),
            _ => Err(self.missing(role, ArgKind::Material)),
        }
    }

    pub(crate) fn material_series(&self, role: &'static str) -> Result<&'a MaterialSeries<T>, TermError> {
        match self.get(role) {
            Some(Argument::MaterialSeries(series)) => Ok(series),
            _ => Err(self.missing(role, ArgKind::MaterialSeries)),
        }
    }

    pub(crate) fn time_step(&self, role: &'static str) -> Result<&'a TimeStep<T>, TermError> {
        match self.get(role) {
            Some(Argument::TimeStep(ts)) => Ok(ts),
            _ => Err(self.missing(role, ArgKind::TimeStep)),
        }
    }

    /// Checks that the region's cells in the group exist in the approximations of all variable
    /// arguments.
    ///
    /// Volume regions address elements, surface regions address faces by their local index.
    fn check_region_cells(&self, term: &Term<T>, group: usize) -> Result<(), TermError> {
        let cells = term.region().cells(group);
        let (domain, required) = match term.region().kind() {
            GeometryKind::Volume => (Domain::Volume, cells.iter().max().map(|&cell| cell + 1)),
            GeometryKind::Surface => (terms::surface_domain(term), Some(cells.len())),
        };
        let required = match required {
            Some(required) if required > 0 => required,
            _ => return Ok(()),
        };
        for (_, argument) in &self.args {
            if let Argument::Variable(variable) = argument {
                let approximation = variable.field().approximation(group, &domain)?;
                let available = approximation.data_shape(term.integral())?.num_elements;
                if required > available {
                    return Err(shape_mismatch(
                        format!("region {}", term.region().name()),
                        format!(
                            "cells up to {} in group {}, but the approximation of {} ({}) has {} cells",
                            required - 1,
                            group,
                            variable.name(),
                            domain,
                            available
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn find_time_step(&self) -> Option<&'a TimeStep<T>> {
        self.args.iter().find_map(|(_, argument)| match argument {
            Argument::TimeStep(ts) => Some(*ts),
            _ => None,
        })
    }

    fn find_state(&self) -> Option<&'a Variable<T>> {
        self.args
            .iter()
            .find_map(|(arg_type, argument)| match (arg_type.kind, argument) {
                (ArgKind::State, Argument::Variable(variable)) => Some(*variable),
                _ => None,
            })
    }
}

/// The contribution of a term on one chunk of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution<T: Real> {
    /// Residual vectors or Jacobian blocks per element, or a single reduced block.
    pub values: ElementBlocks<T>,
    /// The elements of the chunk.
    pub elements: Vec<usize>,
    /// Positions of the chunk's cells within the region.
    ///
    /// For surface regions these identify the faces, which is necessary to tell apart several
    /// faces of the same element.
    pub local: Range<usize>,
    pub status: IntegrationStatus,
}

type ChunkKernel<'a, T> = Box<dyn FnMut(&mut ElementChunk<'a, T>) -> Result<IntegrationStatus, TermError> + 'a>;

struct Pipeline<'a, T: Real> {
    chunks: ElementChunks<'a, T>,
    kernel: ChunkKernel<'a, T>,
    reduction: Reduction,
    sign: T,
}

/// Lazily computed contributions of a term, one per chunk.
///
/// The iterator stops after the first error.
pub struct Contributions<'a, T: Real> {
    pipeline: Option<Pipeline<'a, T>>,
}

impl<'a, T: Real> fmt::Debug for Contributions<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contributions")
            .field("remaining_chunks", &self.pipeline.as_ref().map(|p| p.chunks.len()))
            .finish()
    }
}

impl<'a, T: Real> Contributions<'a, T> {
    /// Contributions of a term that does not contribute at all.
    pub fn empty() -> Self {
        Self { pipeline: None }
    }

    /// Whether the term was found not to contribute before evaluating any chunk.
    pub fn is_inapplicable(&self) -> bool {
        self.pipeline.is_none()
    }

    /// Sums the values of all contributions.
    ///
    /// Returns `None` if there are no contributions, and an error if a chunk failed to integrate.
    pub fn try_sum(self) -> Result<Option<DMatrix<T>>, TermError> {
        let mut total: Option<DMatrix<T>> = None;
        for contribution in self {
            let contribution = contribution?;
            if let IntegrationStatus::Failure(code) = contribution.status {
                warn!(
                    "Integration failed with status {} on {} elements",
                    code,
                    contribution.elements.len()
                );
                return Err(TermError::IntegrationFailure {
                    code,
                    elements: contribution.elements,
                });
            }
            let sum = contribution.values.sum();
            total = Some(match total {
                Some(total) => total + sum,
                None => sum,
            });
        }
        Ok(total)
    }
}

impl<'a, T: Real> Iterator for Contributions<'a, T> {
    type Item = Result<Contribution<T>, TermError>;

    fn next(&mut self) -> Option<Self::Item> {
        let pipeline = self.pipeline.as_mut()?;
        let mut chunk = pipeline.chunks.next()?;
        match (pipeline.kernel)(&mut chunk) {
            Ok(status) => {
                let elements = chunk.indices().to_vec();
                let local = chunk.local_indices();
                let mut values = match pipeline.reduction {
                    Reduction::Region => ElementBlocks::from_matrix(&chunk.output.sum()),
                    Reduction::Element | Reduction::ElementDofs => chunk.output,
                };
                values.scale_mut(pipeline.sign);
                Some(Ok(Contribution {
                    values,
                    elements,
                    local,
                    status,
                }))
            }
            Err(err) => {
                self.pipeline = None;
                Some(Err(err))
            }
        }
    }
}
