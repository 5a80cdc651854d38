//! Derived data sources: transforms applied to a fetched dataset before any
//! plotter sees it.

pub mod diff;

use crate::{dataset::Dataset, error::Result, variable::Variable};

pub trait Modifier: Send + Sync {
    fn name(&self) -> &str;

    fn configure(&mut self, options: serde_yaml::Value) -> Result<()>;

    /// Variables the upstream source must fetch for this modifier.
    fn needed_variables(&self) -> Vec<Variable>;

    /// Variables that exist only after this modifier ran.
    fn produces(&self) -> Vec<Variable>;

    fn apply(&self, dataset: &Dataset) -> Result<Dataset>;
}

pub type ModifierConstructor = fn(String) -> Box<dyn Modifier>;

/// Modifiers by config `module` key.
pub const MODIFIERS: &[(&str, ModifierConstructor)] = &[("diff", diff::DiffModifier::create)];
