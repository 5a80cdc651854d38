//! Consumers that turn resolved views into files.

pub mod colormap;
pub mod debug;
pub mod horizontal;
pub mod meteogram;
pub mod skewt;

use std::{fs::File, io::BufWriter, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    dataset::{DataArray, Dataset},
    error::{Error, Result},
    variable::{Dimension, Variable},
    view::View,
};

pub use colormap::{Colormap, Colormaps};

/// Shared resources handed to every plotter at construction.
#[derive(Debug, Clone)]
pub struct PlotContext {
    pub output_dir: PathBuf,
    pub colormaps: Arc<Colormaps>,
}

pub trait Plotter: Send {
    /// Applies plotter options from the config entry.
    fn configure(&mut self, options: serde_yaml::Value) -> Result<()>;

    fn needed_variables(&self) -> Vec<Variable>;

    /// Writes one artifact for `view` and returns its path relative to the
    /// output directory.
    fn plot(&mut self, view: &View, unique_name: &str) -> Result<PathBuf>;
}

pub type PlotterConstructor = fn(PlotContext) -> Box<dyn Plotter>;

/// Plotters by config `module` key.
pub const PLOTTERS: &[(&str, PlotterConstructor)] = &[
    ("horizontal", horizontal::HorizontalPlotter::create),
    ("skewt", skewt::SkewtPlotter::create),
    ("meteogram", meteogram::MeteogramPlotter::create),
    ("debug", debug::DebugPlotter::create),
];

pub(crate) fn plot_error(plotter: &str, unique_name: &str, reason: impl ToString) -> Error {
    Error::Plot {
        plotter: plotter.to_string(),
        view: unique_name.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn require(dataset: &Dataset, variable: Variable) -> std::result::Result<&DataArray, String> {
    dataset
        .variable(variable)
        .ok_or_else(|| format!("slice holds no {variable}"))
}

/// Initialisation and valid time of a slice, when both are pinned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInfo {
    pub init: Option<DateTime<Utc>>,
    pub valid: Option<DateTime<Utc>>,
    pub offset_hours: Option<i64>,
}

impl RunInfo {
    pub fn of(dataset: &Dataset) -> Self {
        let init = dataset.scalar(Dimension::InitTime).and_then(|l| l.as_time());
        let valid = dataset.scalar(Dimension::Time).and_then(|l| l.as_time());
        let offset_hours = init.zip(valid).map(|(i, v)| (v - i).num_hours());
        Self {
            init,
            valid,
            offset_hours,
        }
    }
}

pub(crate) fn write_json<T: Serialize>(
    context: &PlotContext,
    unique_name: &str,
    document: &T,
) -> Result<PathBuf> {
    let relative = PathBuf::from(format!("{unique_name}.json"));
    let file = File::create(context.output_dir.join(&relative))?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)?;
    Ok(relative)
}
