//! Binding of named problem quantities to term arguments.
use crate::field::Variable;
use crate::material::{MaterialParameter, MaterialSeries};
use crate::time::TimeStep;
use crate::Real;
use rustc_hash::FxHashMap;

/// The name under which the time step is bound by [`Bindings::with_time_step`].
pub const TIME_STEP_NAME: &str = "ts";

/// A quantity that can be passed to a term.
#[derive(Debug, Copy, Clone)]
pub enum Argument<'a, T: Real> {
    Variable(&'a Variable<T>),
    Material(&'a MaterialParameter<T>),
    MaterialSeries(&'a MaterialSeries<T>),
    TimeStep(&'a TimeStep<T>),
}

/// Named quantities available to terms during evaluation.
///
/// Terms refer to their arguments by name; the names are resolved here.
#[derive(Debug, Clone)]
pub struct Bindings<'a, T: Real> {
    arguments: FxHashMap<String, Argument<'a, T>>,
}

impl<'a, T: Real> Default for Bindings<'a, T> {
    fn default() -> Self {
        Self {
            arguments: FxHashMap::default(),
        }
    }
}

impl<'a, T: Real> Bindings<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, variable: &'a Variable<T>) -> Self {
        self.bind(variable.name(), Argument::Variable(variable));
        self
    }

    pub fn with_material(mut self, material: &'a MaterialParameter<T>) -> Self {
        self.bind(material.name(), Argument::Material(material));
        self
    }

    pub fn with_material_series(mut self, series: &'a MaterialSeries<T>) -> Self {
        self.bind(series.name(), Argument::MaterialSeries(series));
        self
    }

    pub fn with_time_step(mut self, time_step: &'a TimeStep<T>) -> Self {
        self.bind(TIME_STEP_NAME, Argument::TimeStep(time_step));
        self
    }

    /// Binds an argument under the given name, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, argument: Argument<'a, T>) {
        self.arguments.insert(name.into(), argument);
    }

    pub fn get(&self, name: &str) -> Option<Argument<'a, T>> {
        self.arguments.get(name).copied()
    }
}
