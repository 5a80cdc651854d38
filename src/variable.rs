//! The fixed vocabulary of physical quantities and dataset axes.
//!
//! The string values double as dataset field keys and config tokens, so they
//! must never change once published.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::source::DataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// A physical quantity a data source can provide.
pub enum Variable {
    #[serde(rename = "temperature_3d")]
    Temperature3d,
    #[serde(rename = "temperature_surface")]
    TemperatureSurface,
    #[serde(rename = "humidity_3d")]
    Humidity3d,
    #[serde(rename = "humidity_surface")]
    HumiditySurface,
    #[serde(rename = "u_3d")]
    U3d,
    #[serde(rename = "v_3d")]
    V3d,
    #[serde(rename = "u_surface")]
    USurface,
    #[serde(rename = "v_surface")]
    VSurface,
    #[serde(rename = "gust_surface")]
    GustSurface,
    #[serde(rename = "precipitation_accumulated")]
    PrecipitationAccumulated,
    #[serde(rename = "snow_depth")]
    SnowDepth,
    #[serde(rename = "cloudcover_3d")]
    Cloudcover3d,
    #[serde(rename = "convection_wet_base")]
    ConvectionWetBase,
    #[serde(rename = "convection_wet_top")]
    ConvectionWetTop,
    #[serde(rename = "convection_dry_top")]
    ConvectionDryTop,
    #[serde(rename = "pressure_sea_level")]
    PressureSeaLevel,
}

impl Variable {
    pub const ALL: [Variable; 16] = [
        Variable::Temperature3d,
        Variable::TemperatureSurface,
        Variable::Humidity3d,
        Variable::HumiditySurface,
        Variable::U3d,
        Variable::V3d,
        Variable::USurface,
        Variable::VSurface,
        Variable::GustSurface,
        Variable::PrecipitationAccumulated,
        Variable::SnowDepth,
        Variable::Cloudcover3d,
        Variable::ConvectionWetBase,
        Variable::ConvectionWetTop,
        Variable::ConvectionDryTop,
        Variable::PressureSeaLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Temperature3d => "temperature_3d",
            Variable::TemperatureSurface => "temperature_surface",
            Variable::Humidity3d => "humidity_3d",
            Variable::HumiditySurface => "humidity_surface",
            Variable::U3d => "u_3d",
            Variable::V3d => "v_3d",
            Variable::USurface => "u_surface",
            Variable::VSurface => "v_surface",
            Variable::GustSurface => "gust_surface",
            Variable::PrecipitationAccumulated => "precipitation_accumulated",
            Variable::SnowDepth => "snow_depth",
            Variable::Cloudcover3d => "cloudcover_3d",
            Variable::ConvectionWetBase => "convection_wet_base",
            Variable::ConvectionWetTop => "convection_wet_top",
            Variable::ConvectionDryTop => "convection_dry_top",
            Variable::PressureSeaLevel => "pressure_sea_level",
        }
    }

    /// Whether the quantity is sampled on vertical levels.
    pub fn is_3d(&self) -> bool {
        matches!(
            self,
            Variable::Temperature3d
                | Variable::Humidity3d
                | Variable::U3d
                | Variable::V3d
                | Variable::Cloudcover3d
        )
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown variable `{s}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// An axis of a dataset.
pub enum Dimension {
    Latitude,
    Longitude,
    Pressure,
    Height,
    Time,
    InitTime,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Latitude,
        Dimension::Longitude,
        Dimension::Pressure,
        Dimension::Height,
        Dimension::Time,
        Dimension::InitTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Latitude => "latitude",
            Dimension::Longitude => "longitude",
            Dimension::Pressure => "pressure",
            Dimension::Height => "height",
            Dimension::Time => "time",
            Dimension::InitTime => "init_time",
        }
    }

    /// Whether labels along this axis are timestamps.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Dimension::Time | Dimension::InitTime)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown dimension `{s}`"))
    }
}

/// Whether `source` can supply `variable` at all.
pub fn is_provided(source: &dyn DataSource, variable: Variable) -> bool {
    source.provides().contains(&variable)
}
