//! Differences a field along one dimension, e.g. accumulated precipitation
//! into per-step amounts.

use serde::Deserialize;
use tracing::debug;

use super::Modifier;
use crate::{
    dataset::Dataset,
    error::{Error, Result},
    source::parse_options,
    variable::{Dimension, Variable},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffField {
    pub field: Variable,
    pub by: Dimension,
    /// Where the result goes. Defaults to replacing `field`.
    #[serde(default)]
    pub name: Option<Variable>,
}

impl DiffField {
    fn target(&self) -> Variable {
        self.name.unwrap_or(self.field)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffOptions {
    pub vars: Vec<DiffField>,
}

pub struct DiffModifier {
    name: String,
    options: DiffOptions,
}

impl DiffModifier {
    pub fn create(name: String) -> Box<dyn Modifier> {
        Box::new(Self {
            name,
            options: DiffOptions::default(),
        })
    }
}

impl Modifier for DiffModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        let options: DiffOptions = parse_options(&self.name, options)?;
        if options.vars.is_empty() {
            return Err(Error::configuration(&self.name, "`vars` must not be empty"));
        }
        self.options = options;
        Ok(())
    }

    fn needed_variables(&self) -> Vec<Variable> {
        let mut needed = Vec::new();
        for var in &self.options.vars {
            if !needed.contains(&var.field) {
                needed.push(var.field);
            }
        }
        needed
    }

    fn produces(&self) -> Vec<Variable> {
        self.options
            .vars
            .iter()
            .filter(|var| var.name.is_some_and(|name| name != var.field))
            .map(DiffField::target)
            .collect()
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        let mut modified = dataset.clone();
        for var in &self.options.vars {
            debug!(modifier = %self.name, field = %var.field, by = %var.by, "Differencing");
            let diffed = dataset.diff(var.field, var.by)?;
            modified.insert_array(var.target(), diffed)?;
        }
        modified.set_attr("modifier", self.name.as_str());
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_dataset;

    fn diff(yaml: &str) -> Box<dyn Modifier> {
        let mut modifier = DiffModifier::create("steps".into());
        modifier.configure(serde_yaml::from_str(yaml).unwrap()).unwrap();
        modifier
    }

    #[test]
    fn should_replace_field_with_its_difference() {
        let modifier = diff("vars: [ { field: temperature_3d, by: time } ]");
        assert_eq!(modifier.needed_variables(), vec![Variable::Temperature3d]);
        assert!(modifier.produces().is_empty());

        let source = sample_dataset();
        let modified = modifier.apply(&source).unwrap();
        let t = modified.variable(Variable::Temperature3d).unwrap();
        assert!(t.values[[0, 0, 0, 0]].is_nan());
        assert_eq!(t.values[[2, 1, 1, 0]], 1000.0);
        assert_eq!(modified.attr("modifier"), Some("steps"));

        // upstream keeps its cumulative values
        let original = source.variable(Variable::Temperature3d).unwrap();
        assert_eq!(original.values[[2, 1, 1, 0]], 2110.0);
    }

    #[test]
    fn should_write_difference_under_new_name() {
        let modifier = diff("vars: [ { field: temperature_3d, by: pressure, name: humidity_3d } ]");
        assert_eq!(modifier.produces(), vec![Variable::Humidity3d]);

        let modified = modifier.apply(&sample_dataset()).unwrap();
        assert_eq!(
            modified.variable(Variable::Temperature3d).unwrap().values[[0, 2, 0, 0]],
            200.0
        );
        let diffed = modified.variable(Variable::Humidity3d).unwrap();
        assert!(diffed.values[[1, 0, 1, 1]].is_nan());
        assert_eq!(diffed.values[[0, 2, 0, 0]], 100.0);
    }

    #[test]
    fn should_reject_bad_options() {
        let mut modifier = DiffModifier::create("steps".into());
        for yaml in ["vars: []", "vars: [ { field: temperature_3d } ]", "{ fields: [] }"] {
            let err = modifier.configure(serde_yaml::from_str(yaml).unwrap()).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{yaml}");
        }
    }

    #[test]
    fn should_fail_on_missing_field() {
        let modifier = diff("vars: [ { field: pressure_sea_level, by: time } ]");
        assert!(modifier.apply(&sample_dataset()).is_err());
    }
}
