//! Serializable term definitions.
use crate::approximation::Integral;
use crate::error::TermError;
use crate::region::Region;
use crate::term::{Term, TermKind, TermOptions};
use crate::Real;
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_sign() -> f64 {
    1.0
}

/// The definition of a single term, as it appears in a problem description.
///
/// ```json
/// { "name": "dw_volume_wdot", "region": "Omega", "integral": "i2", "sign": -1.0,
///   "args": ["m", "q", "p"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub name: String,
    pub region: String,
    pub integral: Integral,
    #[serde(default = "default_sign")]
    pub sign: f64,
    pub args: Vec<String>,
    #[serde(default)]
    pub material_shape: Option<(usize, usize)>,
    #[serde(default)]
    pub history_window: Option<usize>,
}

impl TermDefinition {
    fn options(&self) -> TermOptions {
        let defaults = TermOptions::default();
        TermOptions {
            material_shape: self.material_shape.unwrap_or(defaults.material_shape),
            history_window: self.history_window,
        }
    }
}

impl<T: Real> Term<T> {
    /// Constructs a term from its definition.
    ///
    /// The region is passed in by the caller, which is responsible for looking it up by
    /// [`TermDefinition::region`].
    pub fn from_definition(definition: &TermDefinition, region: Arc<Region>) -> Result<Self, TermError> {
        let kind = TermKind::from_name(&definition.name)
            .ok_or_else(|| TermError::UnknownTerm(definition.name.clone()))?;
        let term = Term::new(kind, region, definition.integral.clone(), definition.args.iter().cloned())?
            .with_sign(nalgebra::convert(definition.sign))
            .with_options(definition.options());
        Ok(term)
    }
}

/// Constructs all terms of a problem description, resolving their regions by name.
pub fn build_terms<T: Real>(definitions: &[TermDefinition], regions: &[Arc<Region>]) -> eyre::Result<Vec<Term<T>>> {
    definitions
        .iter()
        .enumerate()
        .map(|(i, definition)| {
            let region = regions
                .iter()
                .find(|region| region.name() == definition.region)
                .ok_or_else(|| eyre!("No region named '{}'", definition.region))?;
            Term::from_definition(definition, Arc::clone(region))
                .wrap_err_with(|| format!("Failed to construct term #{} ({})", i, definition.name))
        })
        .collect()
}
