//! Radiosonde ascents from the University of Wyoming sounding archive.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use ndarray::{Array, IxDyn};
use serde::Deserialize;
use tracing::info;

use super::{decode_blocking, parse_options, DataSource, ForecastRun, SourceContext, SourceState};
use crate::{
    dataset::{Dataset, Label},
    download::{download_batch, CachePolicy, Compression, FileRequest},
    error::{Error, Result},
    meteo::{wind_components, CELSIUS_OFFSET},
    reading::{read_sounding, SoundingLevel},
    variable::{Dimension, Variable},
};

const BASE_URL: &str = "http://weather.uwyo.edu/cgi-bin/bufrraob.py";
const CYCLE_HOURS: u32 = 12;

const PROVIDES: [Variable; 4] = [
    Variable::Temperature3d,
    Variable::Humidity3d,
    Variable::U3d,
    Variable::V3d,
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
/// WMO station number, or an ICAO identifier.
pub enum Station {
    Number(u32),
    Code(String),
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Station::Number(n) => write!(f, "{n}"),
            Station::Code(c) => f.write_str(c),
        }
    }
}

fn default_slack_hours() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WyomingOptions {
    pub station: Station,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_slack_hours")]
    pub slack_hours: u32,
    #[serde(default)]
    pub cache: CachePolicy,
}

pub struct WyomingSource {
    state: SourceState,
    options: Option<WyomingOptions>,
}

impl WyomingSource {
    pub fn new(context: SourceContext) -> Self {
        Self {
            state: SourceState::new(context),
            options: None,
        }
    }

    pub fn create(context: SourceContext) -> Box<dyn DataSource> {
        Box::new(Self::new(context))
    }

    fn options(&self) -> Result<&WyomingOptions> {
        self.options
            .as_ref()
            .ok_or_else(|| Error::configuration(self.name(), "data source has not been configured"))
    }

    pub fn request(&self, run: &ForecastRun) -> Result<FileRequest> {
        let options = self.options()?;
        Ok(FileRequest {
            url: format!(
                "{BASE_URL}?datetime={}%20{}&id={}&type=TEXT:CSV",
                run.init.format("%Y-%m-%d"),
                run.init.format("%H:%M:%S"),
                options.station
            ),
            dest: self.state.context.download_dir().join(format!(
                "{}_{}_{}.csv",
                self.name(),
                run.date(),
                run.hour()
            )),
            compression: Compression::None,
        })
    }

    pub async fn aggregate_run(&self, run: &ForecastRun) -> Result<Dataset> {
        let options = self.options()?;
        let request = self.request(run)?;
        info!(source = %self.name(), station = %options.station, run = %run.init, "Fetching sounding");

        tokio::fs::create_dir_all(self.state.context.download_dir()).await?;
        let mut report = download_batch(
            Arc::clone(&self.state.context.fetcher),
            std::slice::from_ref(&request),
            1,
            options.cache,
        )
        .await;
        if let Some((_, e)) = report.failed.pop() {
            return Err(e);
        }

        let path = request.dest.clone();
        let levels = decode_blocking(move || read_sounding(&path)).await?;
        let mut dataset = self.to_dataset(run, &levels)?;
        dataset.set_attr("source", "uwyo.edu");
        dataset.set_attr("station", options.station.to_string());
        if let Some(description) = &options.description {
            dataset.set_attr("description", description.as_str());
        }

        Ok(dataset)
    }

    /// Lays the ascent out as (time, pressure) with a single launch time.
    fn to_dataset(&self, run: &ForecastRun, levels: &[SoundingLevel]) -> Result<Dataset> {
        let mut dataset = Dataset::new()
            .with_coord(Dimension::Time, vec![Label::Time(run.init)])
            .with_coord(
                Dimension::Pressure,
                levels.iter().map(|l| Label::Number(l.pressure)).collect(),
            )
            .with_scalar(Dimension::InitTime, run.init);

        let winds: Vec<(f32, f32)> = levels
            .iter()
            .map(|l| wind_components(l.wind_speed, l.wind_direction))
            .collect();

        for &variable in self.needed() {
            let values: Vec<f32> = match variable {
                Variable::Temperature3d => levels.iter().map(|l| l.temperature + CELSIUS_OFFSET).collect(),
                Variable::Humidity3d => levels.iter().map(|l| l.relative_humidity).collect(),
                Variable::U3d => winds.iter().map(|(u, _)| *u).collect(),
                Variable::V3d => winds.iter().map(|(_, v)| *v).collect(),
                other => {
                    return Err(Error::UnsupportedVariable {
                        data_source: self.name().to_string(),
                        variable: other,
                    })
                }
            };
            let values = Array::from_shape_vec(IxDyn(&[1, levels.len()]), values)
                .map_err(|e| Error::Shape(e.to_string()))?;
            dataset.insert(variable, vec![Dimension::Time, Dimension::Pressure], values)?;
        }

        Ok(dataset)
    }
}

#[async_trait]
impl DataSource for WyomingSource {
    fn state(&self) -> &SourceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SourceState {
        &mut self.state
    }

    fn provides(&self) -> &'static [Variable] {
        &PROVIDES
    }

    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        self.options = Some(parse_options(self.name(), options)?);
        Ok(())
    }

    async fn aggregate(&self) -> Result<Dataset> {
        let options = self.options()?;
        let run = ForecastRun::latest(Utc::now(), CYCLE_HOURS, options.slack_hours);
        self.aggregate_run(&run).await
    }
}
