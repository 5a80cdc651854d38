//! Writes a plain-text description of each slice it is given.

use std::{fmt::Write as _, path::PathBuf};

use serde::Deserialize;

use super::{plot_error, PlotContext, Plotter, RunInfo};
use crate::{error::Result, source::parse_options, variable::Variable, view::View};

const MODULE: &str = "debug";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOptions {
    #[serde(default)]
    pub variables: Vec<Variable>,
}

pub struct DebugPlotter {
    context: PlotContext,
    options: DebugOptions,
}

impl DebugPlotter {
    pub fn create(context: PlotContext) -> Box<dyn Plotter> {
        Box::new(Self {
            context,
            options: DebugOptions::default(),
        })
    }
}

impl Plotter for DebugPlotter {
    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        self.options = parse_options(MODULE, options)?;
        Ok(())
    }

    fn needed_variables(&self) -> Vec<Variable> {
        self.options.variables.clone()
    }

    fn plot(&mut self, view: &View, unique_name: &str) -> Result<PathBuf> {
        let dataset = view.resolve()?;
        let run = RunInfo::of(&dataset);

        let mut text = String::new();
        let mut describe = || -> std::fmt::Result {
            writeln!(text, "{}", view.full_long_name())?;
            if let Some(source) = dataset.attr("source") {
                writeln!(text, "source: {source}")?;
            }
            if let Some(init) = run.init {
                writeln!(text, "init: {}", init.format("%Y-%m-%d %H:%M UTC"))?;
            }
            if let Some(offset) = run.offset_hours {
                writeln!(text, "offset: +{offset:03}h")?;
            }
            writeln!(text)?;
            write!(text, "{dataset}")
        };
        describe().map_err(|e| plot_error(MODULE, unique_name, e))?;

        let relative = PathBuf::from(format!("{unique_name}.txt"));
        std::fs::write(self.context.output_dir.join(&relative), text)?;
        Ok(relative)
    }
}
