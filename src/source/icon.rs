//! DWD ICON forecasts from the open-data server.
//!
//! Every (variable, step, level) combination is a separate bzip2 compressed
//! GRIB2 file holding one 2-d field.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::{decode_blocking, parse_options, DataSource, ForecastRun, SourceContext, SourceState};
use crate::{
    dataset::{Dataset, Label},
    download::{download_batch, CachePolicy, Compression, FileRequest},
    error::{Error, Result},
    reading::GridReader,
    variable::{Dimension, Variable},
};

const BASE_URL: &str = "https://opendata.dwd.de/weather/nwp";
const CYCLE_HOURS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IconModel {
    #[serde(rename = "icon")]
    Global,
    #[serde(rename = "icon-eu")]
    Europe,
    #[serde(rename = "icon-d2")]
    Germany,
}

impl IconModel {
    pub fn id(&self) -> &'static str {
        match self {
            IconModel::Global => "icon",
            IconModel::Europe => "icon-eu",
            IconModel::Germany => "icon-d2",
        }
    }

    fn region(&self) -> &'static str {
        match self {
            IconModel::Global => "global",
            IconModel::Europe => "europe",
            IconModel::Germany => "germany",
        }
    }

    /// ICON-D2 file names carry the parameter in lower case.
    fn upper_case_params(&self) -> bool {
        !matches!(self, IconModel::Germany)
    }
}

fn default_slack_hours() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconOptions {
    pub model: IconModel,
    #[serde(default)]
    pub pressure_levels: Vec<u32>,
    pub steps: Vec<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_slack_hours")]
    pub slack_hours: u32,
    #[serde(default)]
    pub cache: CachePolicy,
}

/// DWD parameter directory for each variable.
pub fn parameter(variable: Variable) -> &'static str {
    match variable {
        Variable::Temperature3d => "t",
        Variable::TemperatureSurface => "t_2m",
        Variable::Humidity3d => "relhum",
        Variable::HumiditySurface => "relhum_2m",
        Variable::U3d => "u",
        Variable::V3d => "v",
        Variable::USurface => "u_10m",
        Variable::VSurface => "v_10m",
        Variable::GustSurface => "vmax_10m",
        Variable::PrecipitationAccumulated => "tot_prec",
        Variable::SnowDepth => "h_snow",
        Variable::Cloudcover3d => "clc",
        Variable::ConvectionWetBase => "hbas_con",
        Variable::ConvectionWetTop => "htop_con",
        Variable::ConvectionDryTop => "htop_dc",
        Variable::PressureSeaLevel => "pmsl",
    }
}

/// The first value that occurs more than once.
fn repeated(values: &[u32]) -> Option<u32> {
    let mut seen = HashSet::new();
    values.iter().copied().find(|v| !seen.insert(*v))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub variable: Variable,
    pub step: u32,
    pub level: Option<u32>,
    pub request: FileRequest,
}

pub struct IconSource {
    state: SourceState,
    options: Option<IconOptions>,
}

impl IconSource {
    pub fn new(context: SourceContext) -> Self {
        Self {
            state: SourceState::new(context),
            options: None,
        }
    }

    pub fn create(context: SourceContext) -> Box<dyn DataSource> {
        Box::new(Self::new(context))
    }

    fn options(&self) -> Result<&IconOptions> {
        self.options
            .as_ref()
            .ok_or_else(|| Error::configuration(self.name(), "data source has not been configured"))
    }

    fn request(
        &self,
        options: &IconOptions,
        run: &ForecastRun,
        variable: Variable,
        step: u32,
        level: Option<u32>,
    ) -> FileRequest {
        let model = options.model;
        let param = parameter(variable);
        let file_param = if model.upper_case_params() {
            param.to_uppercase()
        } else {
            param.to_string()
        };
        let kind = match level {
            Some(level) => format!("pressure-level_{}{}_{step:03}_{level}", run.date(), run.hour()),
            None => format!("single-level_{}{}_{step:03}", run.date(), run.hour()),
        };
        let file_name = format!(
            "{}_{}_regular-lat-lon_{kind}_{file_param}.grib2",
            model.id(),
            model.region()
        );

        FileRequest {
            url: format!(
                "{BASE_URL}/{}/grib/{}/{param}/{file_name}.bz2",
                model.id(),
                run.hour()
            ),
            dest: self.state.context.download_dir().join(file_name),
            compression: Compression::Bzip2,
        }
    }

    /// Every file covering the needed variables, configured levels and steps.
    pub fn plan(&self, run: &ForecastRun) -> Result<Vec<PlannedFile>> {
        let options = self.options()?;
        let mut files = Vec::new();

        for &step in &options.steps {
            for &level in &options.pressure_levels {
                for &variable in self.needed().iter().filter(|v| v.is_3d()) {
                    files.push(PlannedFile {
                        variable,
                        step,
                        level: Some(level),
                        request: self.request(options, run, variable, step, Some(level)),
                    });
                }
            }
        }

        for &step in &options.steps {
            for &variable in self.needed().iter().filter(|v| !v.is_3d()) {
                files.push(PlannedFile {
                    variable,
                    step,
                    level: None,
                    request: self.request(options, run, variable, step, None),
                });
            }
        }

        Ok(files)
    }

    /// Downloads and merges `run`.
    pub async fn aggregate_run(&self, run: &ForecastRun) -> Result<Dataset> {
        let options = self.options()?;
        let plan = self.plan(run)?;
        info!(
            source = %self.name(),
            run = %run.init.format("%Y-%m-%d %HZ"),
            files = plan.len(),
            "Resolved forecast run"
        );

        tokio::fs::create_dir_all(self.state.context.download_dir()).await?;
        let requests: Vec<FileRequest> = plan.iter().map(|p| p.request.clone()).collect();
        let report = download_batch(
            Arc::clone(&self.state.context.fetcher),
            &requests,
            self.state.context.parallelism,
            options.cache,
        )
        .await;

        for file in &plan {
            if report.has_failed(&file.request.dest) || !file.request.dest.exists() {
                return Err(Error::IncompleteData {
                    data_source: self.name().to_string(),
                    variable: file.variable,
                    step: file.step,
                    level: file.level,
                });
            }
        }

        let job = MergeJob {
            source: self.name().to_string(),
            options: options.clone(),
            init: run.init,
            valid_times: options
                .steps
                .iter()
                .map(|step| Label::Time(run.valid_time(*step)))
                .collect(),
            needed: self.needed().to_vec(),
            files: plan
                .into_iter()
                .map(|file| ((file.variable, file.step, file.level), file.request.dest))
                .collect(),
            reader: Arc::clone(&self.state.context.reader),
        };
        decode_blocking(move || job.run()).await
    }
}

/// Everything needed to decode and stack one run, detached from the source so
/// it can move onto the blocking pool.
struct MergeJob {
    source: String,
    options: IconOptions,
    init: DateTime<Utc>,
    valid_times: Vec<Label>,
    needed: Vec<Variable>,
    files: HashMap<(Variable, u32, Option<u32>), PathBuf>,
    reader: Arc<dyn GridReader>,
}

impl MergeJob {
    fn read(&self, variable: Variable, step: u32, level: Option<u32>) -> Result<Dataset> {
        let path = self.files.get(&(variable, step, level)).ok_or_else(|| Error::IncompleteData {
            data_source: self.source.clone(),
            variable,
            step,
            level,
        })?;
        debug!(file = %path.display(), %variable, "Reading field");
        let field = self.reader.read(path)?;
        Dataset::from_grid(variable, field.latitudes, field.longitudes, field.values)
    }

    /// Stacks levels along pressure, then steps along time, then merges variables.
    fn run(self) -> Result<Dataset> {
        let options = &self.options;
        let levels: Vec<Label> = options
            .pressure_levels
            .iter()
            .map(|level| Label::Number(f64::from(*level)))
            .collect();

        let mut parts = Vec::with_capacity(self.needed.len());
        for &variable in &self.needed {
            let mut per_step = Vec::with_capacity(options.steps.len());
            for &step in &options.steps {
                let field = if variable.is_3d() {
                    let per_level = options
                        .pressure_levels
                        .iter()
                        .map(|level| self.read(variable, step, Some(*level)))
                        .collect::<Result<Vec<_>>>()?;
                    Dataset::concat(per_level, Dimension::Pressure, levels.clone())?
                } else {
                    self.read(variable, step, None)?
                };
                per_step.push(field);
            }
            parts.push(Dataset::concat(per_step, Dimension::Time, self.valid_times.clone())?);
        }

        let mut dataset = Dataset::merge(parts)?.with_scalar(Dimension::InitTime, self.init);
        dataset.set_attr("source", self.source.as_str());
        dataset.set_attr("model", options.model.id());
        if let Some(description) = &options.description {
            dataset.set_attr("description", description.as_str());
        }

        Ok(dataset)
    }
}

#[async_trait]
impl DataSource for IconSource {
    fn state(&self) -> &SourceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SourceState {
        &mut self.state
    }

    fn provides(&self) -> &'static [Variable] {
        &Variable::ALL
    }

    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        let options: IconOptions = parse_options(self.name(), options)?;
        if options.steps.is_empty() {
            return Err(Error::configuration(self.name(), "`steps` must not be empty"));
        }
        if let Some(step) = repeated(&options.steps) {
            return Err(Error::configuration(self.name(), format!("step {step} is listed twice")));
        }
        if let Some(level) = repeated(&options.pressure_levels) {
            return Err(Error::configuration(
                self.name(),
                format!("pressure level {level} is listed twice"),
            ));
        }
        self.options = Some(options);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let options = self.options()?;
        if options.pressure_levels.is_empty() {
            if let Some(variable) = self.needed().iter().find(|v| v.is_3d()) {
                return Err(Error::configuration(
                    self.name(),
                    format!("{variable} is needed but no `pressure_levels` are configured"),
                ));
            }
        }
        Ok(())
    }

    async fn aggregate(&self) -> Result<Dataset> {
        let options = self.options()?;
        let run = ForecastRun::latest(Utc::now(), CYCLE_HOURS, options.slack_hours);
        self.aggregate_run(&run).await
    }
}
