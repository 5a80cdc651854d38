//! Pipeline configuration loaded from YAML.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::{error::Result, variable::Dimension, view::QuerySpec};

pub const DEFAULT_CONFIG_FILE: &str = "metchart.yaml";

fn default_output() -> PathBuf {
    PathBuf::from("web/data")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What happens to the rest of a group when one of its plots fails.
pub enum PlotErrorPolicy {
    /// Log the failure and keep the other leaves.
    #[default]
    Skip,
    /// Drop the whole group from the index and stop plotting it.
    AbortGroup,
}

/// A data source declaration: `module` picks the backend, the remaining keys
/// are backend options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleEntry {
    pub module: String,
    #[serde(flatten)]
    pub options: serde_yaml::Mapping,
}

/// A derived source computed from `aggregator` by `module`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModifierEntry {
    pub module: String,
    pub aggregator: String,
    #[serde(flatten)]
    pub options: serde_yaml::Mapping,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotterEntry {
    pub module: String,
    pub aggregator: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub for_queries: Vec<QuerySpec>,
    #[serde(default)]
    pub along_dimensions: Vec<Dimension>,
    #[serde(flatten)]
    pub options: serde_yaml::Mapping,
}

impl PlotterEntry {
    /// Explicit name, or `{aggregator}_{module}`.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.aggregator, self.module))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub parallelism: Option<usize>,
    #[serde(default)]
    pub on_plot_error: PlotErrorPolicy,
    #[serde(default)]
    pub aggregator: BTreeMap<String, ModuleEntry>,
    #[serde(default)]
    pub modifier: BTreeMap<String, ModifierEntry>,
    #[serde(default)]
    pub plotter: Vec<PlotterEntry>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(file = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Configured cache directory, or `metchart` under the user's cache dir.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("metchart")
        })
    }

    /// Download parallelism; defaults to the host's available parallelism.
    pub fn parallelism(&self) -> usize {
        self.parallelism
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Label, SelectMethod};

    const EXAMPLE: &str = r#"
output: web/data
cache_dir: /tmp/metchart
on_plot_error: abort_group
aggregator:
  icon_eu:
    module: dwd_icon
    model: icon-eu
    pressure_levels: [850, 500]
    steps: [0, 3, 6]
    description: ICON-EU
modifier:
  icon_eu_steps:
    module: diff
    aggregator: icon_eu
    vars:
      - { field: precipitation_accumulated, by: time }
plotter:
  - module: meteogram
    aggregator: icon_eu
    name: meteogram
    for_queries:
      - { name: munich, long_name: Munich, latitude: 48.14, longitude: 11.58, method: nearest }
  - module: horizontal
    aggregator: icon_eu
    along_dimensions: [time, pressure]
    layers:
      - { field: temperature_3d, layertype: raster }
"#;

    #[test]
    fn should_parse_pipeline() {
        let config = Config::parse(EXAMPLE).unwrap();

        assert_eq!(config.on_plot_error, PlotErrorPolicy::AbortGroup);
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/metchart"));

        let icon = &config.aggregator["icon_eu"];
        assert_eq!(icon.module, "dwd_icon");
        assert!(icon.options.contains_key("steps"));
        assert!(!icon.options.contains_key("module"));

        let steps = &config.modifier["icon_eu_steps"];
        assert_eq!((steps.module.as_str(), steps.aggregator.as_str()), ("diff", "icon_eu"));
        assert!(steps.options.contains_key("vars"));

        let meteogram = &config.plotter[0];
        assert_eq!(meteogram.name(), "meteogram");
        assert_eq!(meteogram.for_queries[0].method, SelectMethod::Nearest);
        assert_eq!(
            meteogram.for_queries[0].pins[&Dimension::Longitude],
            Label::Number(11.58)
        );

        let horizontal = &config.plotter[1];
        assert_eq!(horizontal.name(), "icon_eu_horizontal");
        assert_eq!(horizontal.along_dimensions, vec![Dimension::Time, Dimension::Pressure]);
        assert!(horizontal.options.contains_key("layers"));
    }

    #[test]
    fn should_apply_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.output, PathBuf::from("web/data"));
        assert_eq!(config.on_plot_error, PlotErrorPolicy::Skip);
        assert!(config.parallelism() >= 1);
        assert!(config.cache_dir().ends_with("metchart"));
    }

    #[test]
    fn should_reject_unknown_top_level_keys() {
        assert!(Config::parse("thread_count: 4").is_err());
        assert!(Config::parse("on_plot_error: retry").is_err());
    }
}
