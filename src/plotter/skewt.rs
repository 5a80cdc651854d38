//! Vertical profiles written as JSON soundings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{plot_error, require, write_json, PlotContext, Plotter, RunInfo};
use crate::{
    error::Result,
    meteo::{
        dewpoint_from_relative_humidity, kelvin_to_celsius, lifted_condensation_level, wind_direction,
        wind_speed, KNOTS_PER_METRE_PER_SECOND,
    },
    source::parse_options,
    variable::{Dimension, Variable},
    view::View,
};

const MODULE: &str = "skewt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    Lcl,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkewtOptions {
    #[serde(default)]
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileLevel {
    /// hPa
    pub pressure: f64,
    /// °C
    pub temperature: f32,
    /// °C
    pub dewpoint: f32,
    /// kt
    pub wind_speed: f32,
    /// degrees, direction the wind blows from
    pub wind_direction: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lcl {
    pub pressure: f32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sounding {
    pub title: String,
    #[serde(flatten)]
    pub run: RunInfo,
    pub levels: Vec<ProfileLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcl: Option<Lcl>,
}

pub struct SkewtPlotter {
    context: PlotContext,
    options: SkewtOptions,
}

impl SkewtPlotter {
    pub fn create(context: PlotContext) -> Box<dyn Plotter> {
        Box::new(Self {
            context,
            options: SkewtOptions::default(),
        })
    }

    pub fn sounding(&self, view: &View) -> std::result::Result<Sounding, String> {
        let dataset = view.resolve().map_err(|e| e.to_string())?;
        let profile = |variable: Variable| {
            require(&dataset, variable)?
                .series(Dimension::Pressure)
                .ok_or_else(|| format!("{variable} is not a single vertical profile"))
        };

        let t = profile(Variable::Temperature3d)?;
        let rh = profile(Variable::Humidity3d)?;
        let u = profile(Variable::U3d)?;
        let v = profile(Variable::V3d)?;
        let pressures: Vec<f64> = dataset
            .labels(Dimension::Pressure)
            .unwrap_or_default()
            .iter()
            .filter_map(|l| l.as_number())
            .collect();

        let mut levels: Vec<ProfileLevel> = pressures
            .iter()
            .enumerate()
            .map(|(i, p)| ProfileLevel {
                pressure: *p,
                temperature: kelvin_to_celsius(t[i]),
                dewpoint: kelvin_to_celsius(dewpoint_from_relative_humidity(t[i], rh[i])),
                wind_speed: wind_speed(u[i], v[i]) * KNOTS_PER_METRE_PER_SECOND,
                wind_direction: wind_direction(u[i], v[i]),
            })
            .collect();
        levels.sort_by(|a, b| b.pressure.total_cmp(&a.pressure));

        let lcl = match self.options.analysis {
            Some(Analysis::Lcl) => levels.first().map(|surface| {
                let (pressure, temperature) = lifted_condensation_level(
                    surface.pressure as f32,
                    surface.temperature + crate::meteo::CELSIUS_OFFSET,
                    surface.dewpoint + crate::meteo::CELSIUS_OFFSET,
                );
                Lcl {
                    pressure,
                    temperature: kelvin_to_celsius(temperature),
                }
            }),
            None => None,
        };

        Ok(Sounding {
            title: view.full_long_name(),
            run: RunInfo::of(&dataset),
            levels,
            lcl,
        })
    }
}

impl Plotter for SkewtPlotter {
    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        self.options = parse_options(MODULE, options)?;
        Ok(())
    }

    fn needed_variables(&self) -> Vec<Variable> {
        vec![
            Variable::U3d,
            Variable::V3d,
            Variable::Temperature3d,
            Variable::Humidity3d,
        ]
    }

    fn plot(&mut self, view: &View, unique_name: &str) -> Result<PathBuf> {
        let sounding = self
            .sounding(view)
            .map_err(|reason| plot_error(MODULE, unique_name, reason))?;
        write_json(&self.context, unique_name, &sounding)
    }
}
