//! Radiosonde profiles in the University of Wyoming CSV format.
//!
//! Columns used: 3 pressure (hPa), 5 temperature (°C), 8 relative humidity
//! (%), 11 wind direction (°), 12 wind speed. The header decides whether wind
//! speed is in m/s or knots.

use std::{io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord};

use crate::{
    error::{Error, Result},
    meteo::KNOTS_PER_METRE_PER_SECOND,
};

const PRESSURE: usize = 3;
const TEMPERATURE: usize = 5;
const RELATIVE_HUMIDITY: usize = 8;
const WIND_DIRECTION: usize = 11;
const WIND_SPEED: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct SoundingLevel {
    pub pressure: f64,
    pub temperature: f32,
    pub relative_humidity: f32,
    pub wind_direction: f32,
    /// m/s
    pub wind_speed: f32,
}

impl SoundingLevel {
    fn from_record(record: &StringRecord, speed_in_knots: bool) -> Option<Self> {
        let field = |i: usize| record.get(i).map(str::trim).filter(|s| !s.is_empty());

        let pressure = field(PRESSURE)?.parse().ok()?;
        let temperature = field(TEMPERATURE)?.parse().ok()?;
        let relative_humidity = field(RELATIVE_HUMIDITY)?.parse().ok()?;
        let wind_direction = field(WIND_DIRECTION)?.parse().ok()?;
        let wind_speed: f32 = field(WIND_SPEED)?.parse().ok()?;

        Some(SoundingLevel {
            pressure,
            temperature,
            relative_humidity,
            wind_direction,
            wind_speed: if speed_in_knots {
                wind_speed / KNOTS_PER_METRE_PER_SECOND
            } else {
                wind_speed
            },
        })
    }
}

pub fn read_sounding(path: &Path) -> Result<Vec<SoundingLevel>> {
    let file = std::fs::File::open(path)?;
    parse_sounding(file).map_err(|reason| Error::decode(path, reason))
}

/// Parses a sounding, skipping incomplete rows and repeated pressure levels.
pub fn parse_sounding<R: Read>(reader: R) -> std::result::Result<Vec<SoundingLevel>, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(|e| e.to_string())?;
    let speed_in_knots = !headers
        .get(WIND_SPEED)
        .is_some_and(|h| h.contains("m/s"));

    let mut levels: Vec<SoundingLevel> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let Some(level) = SoundingLevel::from_record(&record, speed_in_knots) else {
            continue;
        };
        if levels.iter().any(|l| l.pressure == level.pressure) {
            continue;
        }
        levels.push(level);
    }

    if levels.is_empty() {
        return Err("sounding holds no complete levels".to_string());
    }

    Ok(levels)
}
