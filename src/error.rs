//! Error types shared by the aggregation, view and plotting layers.

use std::path::PathBuf;

use thiserror::Error;

use crate::variable::{Dimension, Variable};

/// Errors raised while configuring, fetching, slicing or plotting.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration for `{name}`: {reason}")]
    Configuration { name: String, reason: String },

    #[error("Unknown {kind} module `{module}` referenced by `{name}`")]
    UnknownModule {
        kind: &'static str,
        module: String,
        name: String,
    },

    #[error("Data source `{data_source}` does not provide {variable}")]
    UnsupportedVariable {
        data_source: String,
        variable: Variable,
    },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error(
        "Data source `{data_source}` is missing {variable} at step +{step:03}h{}",
        .level.map(|l| format!(", level {l} hPa")).unwrap_or_default()
    )]
    IncompleteData {
        data_source: String,
        variable: Variable,
        step: u32,
        level: Option<u32>,
    },

    #[error("Data source `{0}` has already been fetched")]
    AlreadyFetched(String),

    #[error("Data source `{0}` has not been aggregated yet")]
    DataNotAggregated(String),

    #[error("Cannot select {dimension}: {reason}")]
    Selection { dimension: Dimension, reason: String },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Plotter `{plotter}` failed on `{view}`: {reason}")]
    Plot {
        plotter: String,
        view: String,
        reason: String,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn configuration(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Configuration {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn selection(dimension: Dimension, reason: impl Into<String>) -> Self {
        Error::Selection {
            dimension,
            reason: reason.into(),
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors found while wiring the run together, before any network work.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::UnknownModule { .. } | Error::UnsupportedVariable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_step_and_level_in_incomplete_data() {
        let e = Error::IncompleteData {
            data_source: "icon_eu".to_string(),
            variable: Variable::Temperature3d,
            step: 3,
            level: Some(850),
        };
        assert_eq!(
            e.to_string(),
            "Data source `icon_eu` is missing temperature_3d at step +003h, level 850 hPa"
        );

        let e = Error::IncompleteData {
            data_source: "icon_eu".to_string(),
            variable: Variable::PressureSeaLevel,
            step: 12,
            level: None,
        };
        assert_eq!(
            e.to_string(),
            "Data source `icon_eu` is missing pressure_sea_level at step +012h"
        );
    }

    #[test]
    fn should_classify_preflight_errors() {
        assert!(Error::configuration("x", "bad").is_preflight());
        assert!(!Error::DataNotAggregated("x".to_string()).is_preflight());
    }
}
