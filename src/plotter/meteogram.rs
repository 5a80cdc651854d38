//! Time series at one location, written as a JSON meteogram.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{plot_error, require, write_json, PlotContext, Plotter};
use crate::{
    dataset::{Dataset, Label},
    error::Result,
    meteo::{dewpoint_from_relative_humidity, kelvin_to_celsius, wind_direction, wind_speed},
    source::parse_options,
    variable::{Dimension, Variable},
    view::View,
};

const MODULE: &str = "meteogram";

const NEEDED: [Variable; 15] = [
    Variable::USurface,
    Variable::VSurface,
    Variable::GustSurface,
    Variable::U3d,
    Variable::V3d,
    Variable::Temperature3d,
    Variable::TemperatureSurface,
    Variable::Humidity3d,
    Variable::HumiditySurface,
    Variable::PrecipitationAccumulated,
    Variable::SnowDepth,
    Variable::Cloudcover3d,
    Variable::PressureSeaLevel,
    Variable::ConvectionWetTop,
    Variable::ConvectionWetBase,
];

fn default_reference_level() -> f64 {
    850.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeteogramOptions {
    /// Pressure level (hPa) of the upper-air temperature trace.
    #[serde(default = "default_reference_level")]
    pub reference_level: f64,
}

impl Default for MeteogramOptions {
    fn default() -> Self {
        Self {
            reference_level: default_reference_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudProfile {
    pub pressure: Vec<f64>,
    /// Cloud cover (%) per time step, one value per pressure level.
    pub cover: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meteogram {
    pub title: String,
    pub time: Vec<DateTime<Utc>>,
    /// °C
    pub temperature_2m: Vec<f32>,
    /// °C
    pub dewpoint_2m: Vec<f32>,
    /// °C at the reference level, when that level is present
    pub temperature_upper: Option<Vec<f32>>,
    pub reference_level: f64,
    /// hPa
    pub pressure_sea_level: Vec<f32>,
    /// mm per interval, one entry fewer than `time`
    pub precipitation: Vec<f32>,
    /// m
    pub snow_depth: Vec<f32>,
    /// m/s
    pub wind_speed_10m: Vec<f32>,
    pub wind_direction_10m: Vec<f32>,
    /// m/s
    pub gust_10m: Vec<f32>,
    pub cloud_cover: CloudProfile,
    /// km
    pub convection_base: Vec<f32>,
    /// km
    pub convection_top: Vec<f32>,
}

pub struct MeteogramPlotter {
    context: PlotContext,
    options: MeteogramOptions,
}

fn series(dataset: &Dataset, variable: Variable) -> std::result::Result<Vec<f32>, String> {
    require(dataset, variable)?
        .series(Dimension::Time)
        .ok_or_else(|| format!("{variable} is not a time series at a single point"))
}

/// Rows per time step, columns per pressure level.
fn section(dataset: &Dataset, variable: Variable) -> std::result::Result<Vec<Vec<f32>>, String> {
    let grid = require(dataset, variable)?
        .grid(Dimension::Time, Dimension::Pressure)
        .ok_or_else(|| format!("{variable} is not a time x pressure section"))?;
    Ok(grid.rows().into_iter().map(|row| row.to_vec()).collect())
}

impl MeteogramPlotter {
    pub fn create(context: PlotContext) -> Box<dyn Plotter> {
        Box::new(Self {
            context,
            options: MeteogramOptions::default(),
        })
    }

    pub fn meteogram(&self, view: &View) -> std::result::Result<Meteogram, String> {
        let dataset = view.resolve().map_err(|e| e.to_string())?;

        let time: Vec<DateTime<Utc>> = dataset
            .labels(Dimension::Time)
            .ok_or("slice has no time axis")?
            .iter()
            .filter_map(Label::as_time)
            .collect();
        let pressure: Vec<f64> = dataset
            .labels(Dimension::Pressure)
            .unwrap_or_default()
            .iter()
            .filter_map(Label::as_number)
            .collect();

        let t2m = series(&dataset, Variable::TemperatureSurface)?;
        let rh2m = series(&dataset, Variable::HumiditySurface)?;
        let u10 = series(&dataset, Variable::USurface)?;
        let v10 = series(&dataset, Variable::VSurface)?;
        let accumulated = series(&dataset, Variable::PrecipitationAccumulated)?;

        let temperature_upper: Option<Vec<f32>> = pressure
            .iter()
            .position(|p| (p - self.options.reference_level).abs() < 1e-6)
            .map(|level| {
                section(&dataset, Variable::Temperature3d)
                    .map(|rows| rows.iter().map(|r| kelvin_to_celsius(r[level])).collect())
            })
            .transpose()?;

        Ok(Meteogram {
            title: view.full_long_name(),
            temperature_2m: t2m.iter().map(|t| kelvin_to_celsius(*t)).collect(),
            dewpoint_2m: t2m
                .iter()
                .zip(&rh2m)
                .map(|(t, rh)| kelvin_to_celsius(dewpoint_from_relative_humidity(*t, *rh)))
                .collect(),
            temperature_upper,
            reference_level: self.options.reference_level,
            pressure_sea_level: series(&dataset, Variable::PressureSeaLevel)?
                .iter()
                .map(|p| p / 100.0)
                .collect(),
            precipitation: accumulated
                .windows(2)
                .map(|w| (w[1] - w[0]).max(0.0))
                .collect(),
            snow_depth: series(&dataset, Variable::SnowDepth)?,
            wind_speed_10m: u10.iter().zip(&v10).map(|(u, v)| wind_speed(*u, *v)).collect(),
            wind_direction_10m: u10.iter().zip(&v10).map(|(u, v)| wind_direction(*u, *v)).collect(),
            gust_10m: series(&dataset, Variable::GustSurface)?,
            cloud_cover: CloudProfile {
                pressure,
                cover: section(&dataset, Variable::Cloudcover3d)?,
            },
            convection_base: series(&dataset, Variable::ConvectionWetBase)?
                .iter()
                .map(|h| h / 1000.0)
                .collect(),
            convection_top: series(&dataset, Variable::ConvectionWetTop)?
                .iter()
                .map(|h| h / 1000.0)
                .collect(),
            time,
        })
    }
}

impl Plotter for MeteogramPlotter {
    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        self.options = parse_options(MODULE, options)?;
        Ok(())
    }

    fn needed_variables(&self) -> Vec<Variable> {
        NEEDED.to_vec()
    }

    fn plot(&mut self, view: &View, unique_name: &str) -> Result<PathBuf> {
        let meteogram = self
            .meteogram(view)
            .map_err(|reason| plot_error(MODULE, unique_name, reason))?;
        write_json(&self.context, unique_name, &meteogram)
    }
}
