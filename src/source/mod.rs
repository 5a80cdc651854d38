//! Data-source backends.
//!
//! A source declares the variables it can provide, collects the ones its
//! consumers need, and fetches them exactly once into a [`Dataset`].

pub mod icon;
pub mod run;
pub mod wyoming;

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use async_trait::async_trait;
use tracing::info;

use crate::{
    dataset::{DataArray, Dataset, Query},
    download::Fetcher,
    error::{Error, Result},
    reading::GridReader,
    variable::Variable,
};

pub use icon::IconSource;
pub use run::ForecastRun;
pub use wyoming::WyomingSource;

/// Everything a backend is constructed with.
#[derive(Clone)]
pub struct SourceContext {
    pub name: String,
    pub cache_dir: PathBuf,
    pub fetcher: Arc<dyn Fetcher>,
    pub reader: Arc<dyn GridReader>,
    pub parallelism: usize,
}

impl SourceContext {
    /// Per-source download directory.
    pub fn download_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.name)
    }
}

/// State shared by every backend.
pub struct SourceState {
    pub context: SourceContext,
    needed: Vec<Variable>,
    fetch_started: AtomicBool,
    dataset: OnceLock<Arc<Dataset>>,
}

impl SourceState {
    pub fn new(context: SourceContext) -> Self {
        Self {
            context,
            needed: Vec::new(),
            fetch_started: AtomicBool::new(false),
            dataset: OnceLock::new(),
        }
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    fn state(&self) -> &SourceState;

    fn state_mut(&mut self) -> &mut SourceState;

    /// Every variable this backend can supply.
    fn provides(&self) -> &'static [Variable];

    /// Applies backend options from the config entry.
    fn configure(&mut self, options: serde_yaml::Value) -> Result<()>;

    /// Checks the options against the needed set, once all needs are declared.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Downloads and merges the needed variables for the current run.
    async fn aggregate(&self) -> Result<Dataset>;

    fn name(&self) -> &str {
        &self.state().context.name
    }

    /// Needed variables in declaration order.
    fn needed(&self) -> &[Variable] {
        &self.state().needed
    }

    fn declare_needed(&mut self, variable: Variable) -> Result<()> {
        if !self.provides().contains(&variable) {
            return Err(Error::UnsupportedVariable {
                data_source: self.name().to_string(),
                variable,
            });
        }
        let needed = &mut self.state_mut().needed;
        if !needed.contains(&variable) {
            needed.push(variable);
        }
        Ok(())
    }

    /// Aggregates and stores the dataset. Only the first call does any work.
    async fn fetch(&self) -> Result<Arc<Dataset>> {
        let state = self.state();
        if state.fetch_started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyFetched(self.name().to_string()));
        }

        info!(source = %self.name(), needed = ?self.needed(), "Fetching data source");
        let dataset = Arc::new(self.aggregate().await?);
        let stored = state.dataset.get_or_init(|| dataset);
        info!(source = %self.name(), variables = stored.variables().count(), "Data source ready");

        Ok(Arc::clone(stored))
    }

    fn dataset(&self) -> Result<Arc<Dataset>> {
        self.state()
            .dataset
            .get()
            .cloned()
            .ok_or_else(|| Error::DataNotAggregated(self.name().to_string()))
    }

    /// One variable of the fetched dataset, narrowed by `query`.
    fn query(&self, variable: Variable, query: &Query) -> Result<DataArray> {
        let dataset = self.dataset()?;
        let unavailable = || Error::UnsupportedVariable {
            data_source: self.name().to_string(),
            variable,
        };
        if !dataset.contains(variable) {
            return Err(unavailable());
        }

        let selected = dataset.sel(query)?;
        selected.variable(variable).cloned().ok_or_else(unavailable)
    }
}

pub type SourceConstructor = fn(SourceContext) -> Box<dyn DataSource>;

/// Backends by config `module` key.
pub const SOURCES: &[(&str, SourceConstructor)] = &[
    ("dwd_icon", IconSource::create),
    ("wyoming_sounding", WyomingSource::create),
];

/// Runs file decoding on the blocking pool so other sources keep downloading.
pub(crate) async fn decode_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Parses the flattened options of a config entry.
pub(crate) fn parse_options<T: serde::de::DeserializeOwned>(
    name: &str,
    options: serde_yaml::Value,
) -> Result<T> {
    serde_yaml::from_value(options).map_err(|e| Error::configuration(name, e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        dataset::tests::sample_dataset,
        download::tests::RecordingFetcher,
        reading::grib::tests::ConstantReader,
        variable::Dimension,
    };

    pub fn context(name: &str, cache_dir: PathBuf, fetcher: Arc<dyn Fetcher>) -> SourceContext {
        SourceContext {
            name: name.to_string(),
            cache_dir,
            fetcher,
            reader: Arc::new(ConstantReader),
            parallelism: 4,
        }
    }

    /// Serves a canned dataset and counts aggregations.
    pub struct StaticSource {
        state: SourceState,
        pub dataset: Option<Dataset>,
        pub aggregations: std::sync::atomic::AtomicUsize,
    }

    impl StaticSource {
        pub fn new(name: &str, dataset: Option<Dataset>) -> Self {
            Self {
                state: SourceState::new(context(
                    name,
                    std::env::temp_dir(),
                    Arc::new(RecordingFetcher::default()),
                )),
                dataset,
                aggregations: Default::default(),
            }
        }
    }

    #[async_trait]
    impl DataSource for StaticSource {
        fn state(&self) -> &SourceState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut SourceState {
            &mut self.state
        }

        fn provides(&self) -> &'static [Variable] {
            &[Variable::Temperature3d, Variable::PressureSeaLevel]
        }

        fn configure(&mut self, _options: serde_yaml::Value) -> Result<()> {
            Ok(())
        }

        async fn aggregate(&self) -> Result<Dataset> {
            self.aggregations.fetch_add(1, Ordering::SeqCst);
            self.dataset
                .clone()
                .ok_or_else(|| Error::Shape("no canned dataset".to_string()))
        }
    }

    #[test]
    fn should_refuse_variables_outside_provides() {
        let mut source = StaticSource::new("icon_eu", None);
        let err = source.declare_needed(Variable::SnowDepth).unwrap_err();

        assert!(matches!(err, Error::UnsupportedVariable { variable: Variable::SnowDepth, .. }));
        assert!(source.needed().is_empty());
    }

    #[test]
    fn should_declare_each_variable_once() {
        let mut source = StaticSource::new("icon_eu", None);
        source.declare_needed(Variable::Temperature3d).unwrap();
        source.declare_needed(Variable::PressureSeaLevel).unwrap();
        source.declare_needed(Variable::Temperature3d).unwrap();

        assert_eq!(source.needed(), &[Variable::Temperature3d, Variable::PressureSeaLevel]);
    }

    #[tokio::test]
    async fn should_fetch_only_once() {
        let source = StaticSource::new("icon_eu", Some(sample_dataset()));
        source.fetch().await.unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyFetched(name) if name == "icon_eu"));
        assert_eq!(source.aggregations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_not_retry_after_failed_fetch() {
        let source = StaticSource::new("icon_eu", None);
        assert!(source.fetch().await.is_err());
        assert!(matches!(source.fetch().await, Err(Error::AlreadyFetched(_))));
        assert!(matches!(source.dataset(), Err(Error::DataNotAggregated(_))));
    }

    #[tokio::test]
    async fn should_query_only_after_fetch() {
        let source = StaticSource::new("icon_eu", Some(sample_dataset()));
        let query = Query::new().pin(Dimension::Pressure, 850.0);

        let err = source.query(Variable::Temperature3d, &query).unwrap_err();
        assert!(matches!(err, Error::DataNotAggregated(_)));

        source.fetch().await.unwrap();
        let t = source.query(Variable::Temperature3d, &query).unwrap();
        assert_eq!(t.dims, vec![Dimension::Time, Dimension::Latitude, Dimension::Longitude]);

        let err = source.query(Variable::PressureSeaLevel, &query).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVariable { .. }));
    }
}
