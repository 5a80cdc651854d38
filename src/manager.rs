//! Wires data sources to plotters and drives a complete run.
//!
//! Everything that can be checked without the network (module names, source
//! references, variable support) is checked in [`Manager::from_config`].

use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
    sync::Arc,
};

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::{
    config::{Config, PlotErrorPolicy},
    dataset::Dataset,
    download::{Fetcher, HttpFetcher},
    error::{Error, Result},
    index::Index,
    modifier::{self, Modifier, ModifierConstructor},
    plotter::{self, Colormaps, PlotContext, Plotter, PlotterConstructor},
    reading::{GribReader, GridReader},
    source::{self, DataSource, SourceConstructor, SourceContext},
    variable::Dimension,
    view::{QuerySpec, View},
};

/// Module keys available to a config.
#[derive(Clone)]
pub struct Registry {
    sources: Vec<(&'static str, SourceConstructor)>,
    modifiers: Vec<(&'static str, ModifierConstructor)>,
    plotters: Vec<(&'static str, PlotterConstructor)>,
}

impl Registry {
    pub fn standard() -> Self {
        Self {
            sources: source::SOURCES.to_vec(),
            modifiers: modifier::MODIFIERS.to_vec(),
            plotters: plotter::PLOTTERS.to_vec(),
        }
    }

    pub fn with_source(mut self, key: &'static str, create: SourceConstructor) -> Self {
        self.sources.push((key, create));
        self
    }

    pub fn with_modifier(mut self, key: &'static str, create: ModifierConstructor) -> Self {
        self.modifiers.push((key, create));
        self
    }

    pub fn with_plotter(mut self, key: &'static str, create: PlotterConstructor) -> Self {
        self.plotters.push((key, create));
        self
    }

    fn source(&self, key: &str) -> Option<SourceConstructor> {
        self.sources.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
    }

    fn modifier(&self, key: &str) -> Option<ModifierConstructor> {
        self.modifiers.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
    }

    fn plotter(&self, key: &str) -> Option<PlotterConstructor> {
        self.plotters.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
    }
}

/// Shared services handed to the modules at construction.
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn Fetcher>,
    pub reader: Arc<dyn GridReader>,
    pub colormaps: Arc<Colormaps>,
}

impl Services {
    pub fn standard() -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new()?),
            reader: Arc::new(GribReader),
            colormaps: Arc::new(Colormaps::standard()),
        })
    }
}

struct ModifierTask {
    upstream: String,
    modifier: Box<dyn Modifier>,
}

struct PlotterTask {
    name: String,
    module: String,
    aggregator: String,
    for_queries: Vec<QuerySpec>,
    along_dimensions: Vec<Dimension>,
    plotter: Box<dyn Plotter>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub plotted: usize,
    pub failed: usize,
    /// Leaves not attempted because their group was aborted.
    pub skipped: usize,
    /// Plotters whose data source produced no dataset.
    pub skipped_plotters: Vec<String>,
    pub index: PathBuf,
}

impl RunSummary {
    /// True when every planned plot was written.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.skipped_plotters.is_empty()
    }
}

pub struct Manager {
    sources: BTreeMap<String, Box<dyn DataSource>>,
    modifiers: BTreeMap<String, ModifierTask>,
    plotters: Vec<PlotterTask>,
    output_dir: PathBuf,
    policy: PlotErrorPolicy,
}

impl Manager {
    pub fn from_config(config: &Config, registry: &Registry, services: &Services) -> Result<Self> {
        let cache_dir = config.cache_dir();
        let parallelism = config.parallelism();

        let mut sources: BTreeMap<String, Box<dyn DataSource>> = BTreeMap::new();
        for (name, entry) in &config.aggregator {
            let create = registry.source(&entry.module).ok_or_else(|| Error::UnknownModule {
                kind: "aggregator",
                module: entry.module.clone(),
                name: name.clone(),
            })?;
            let mut source = create(SourceContext {
                name: name.clone(),
                cache_dir: cache_dir.clone(),
                fetcher: Arc::clone(&services.fetcher),
                reader: Arc::clone(&services.reader),
                parallelism,
            });
            source.configure(serde_yaml::Value::Mapping(entry.options.clone()))?;
            sources.insert(name.clone(), source);
        }

        let mut modifiers = BTreeMap::new();
        for (name, entry) in &config.modifier {
            if sources.contains_key(name) {
                return Err(Error::configuration(name, "name is already used by an aggregator"));
            }
            let create = registry.modifier(&entry.module).ok_or_else(|| Error::UnknownModule {
                kind: "modifier",
                module: entry.module.clone(),
                name: name.clone(),
            })?;
            let mut modifier = create(name.clone());
            modifier.configure(serde_yaml::Value::Mapping(entry.options.clone()))?;

            let source = sources.get_mut(&entry.aggregator).ok_or_else(|| {
                Error::configuration(name, format!("unknown aggregator `{}`", entry.aggregator))
            })?;
            for variable in modifier.needed_variables() {
                source.declare_needed(variable)?;
            }
            modifiers.insert(
                name.clone(),
                ModifierTask {
                    upstream: entry.aggregator.clone(),
                    modifier,
                },
            );
        }

        let mut names = HashSet::new();
        let mut plotters = Vec::with_capacity(config.plotter.len());
        for entry in &config.plotter {
            let name = entry.name();
            if !names.insert(name.clone()) {
                return Err(Error::configuration(&name, "plotter name is used more than once"));
            }

            let create = registry.plotter(&entry.module).ok_or_else(|| Error::UnknownModule {
                kind: "plotter",
                module: entry.module.clone(),
                name: name.clone(),
            })?;
            let mut plotter = create(PlotContext {
                output_dir: config.output.clone(),
                colormaps: Arc::clone(&services.colormaps),
            });
            plotter.configure(serde_yaml::Value::Mapping(entry.options.clone()))?;

            // Plotters on a modifier fetch through its upstream, minus what
            // the modifier derives itself.
            let (upstream, derived) = match modifiers.get(&entry.aggregator) {
                Some(task) => (task.upstream.as_str(), task.modifier.produces()),
                None => (entry.aggregator.as_str(), Vec::new()),
            };
            let source = sources.get_mut(upstream).ok_or_else(|| {
                Error::configuration(&name, format!("unknown aggregator `{}`", entry.aggregator))
            })?;
            for variable in plotter.needed_variables() {
                if !derived.contains(&variable) {
                    source.declare_needed(variable)?;
                }
            }

            plotters.push(PlotterTask {
                name,
                module: entry.module.clone(),
                aggregator: entry.aggregator.clone(),
                for_queries: entry.for_queries.clone(),
                along_dimensions: entry.along_dimensions.clone(),
                plotter,
            });
        }

        for source in sources.values() {
            source.validate()?;
        }

        info!(
            sources = sources.len(),
            modifiers = modifiers.len(),
            plotters = plotters.len(),
            "Pipeline configured"
        );

        Ok(Self {
            sources,
            modifiers,
            plotters,
            output_dir: config.output.clone(),
            policy: config.on_plot_error,
        })
    }

    /// Needed variables per source name.
    pub fn needs(&self) -> BTreeMap<&str, Vec<crate::variable::Variable>> {
        self.sources
            .iter()
            .map(|(name, source)| (name.as_str(), source.needed().to_vec()))
            .collect()
    }

    /// Fetches every source that something needs, all at once, then applies the
    /// modifiers. A failing source only takes its own plotters down.
    pub async fn aggregate(&self) -> BTreeMap<String, Result<Arc<Dataset>>> {
        let pending = self
            .sources
            .iter()
            .filter(|(name, source)| {
                let needed = !source.needed().is_empty();
                if !needed {
                    info!(source = %name, "Nothing needs this data source, not fetching");
                }
                needed
            })
            .map(|(name, source)| async move { (name.clone(), source.fetch().await) });

        let mut results: BTreeMap<String, Result<Arc<Dataset>>> = join_all(pending).await.into_iter().collect();

        for (name, task) in &self.modifiers {
            let modified = match results.get(&task.upstream) {
                Some(Ok(dataset)) => task.modifier.apply(dataset).map(Arc::new),
                Some(Err(_)) => Err(Error::DataNotAggregated(task.upstream.clone())),
                None => continue,
            };
            results.insert(name.clone(), modified);
        }

        for (name, result) in &results {
            if let Err(e) = result {
                error!(source = %name, error = %e, "Data source failed");
            }
        }
        results
    }

    /// Fetch, slice, plot, then write the index.
    pub async fn run(&mut self) -> Result<RunSummary> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let datasets = self.aggregate().await;

        let mut index = Index::default();
        let mut summary = RunSummary::default();

        for task in &mut self.plotters {
            let dataset = match datasets.get(&task.aggregator) {
                Some(Ok(dataset)) => Arc::clone(dataset),
                _ => {
                    warn!(plotter = %task.name, source = %task.aggregator, "No data, skipping plotter");
                    summary.skipped_plotters.push(task.name.clone());
                    continue;
                }
            };

            let root = View::root(dataset, task.name.clone());
            let leaves = match expand(&root, &task.for_queries, &task.along_dimensions) {
                Ok(leaves) => leaves,
                Err(e) => {
                    error!(plotter = %task.name, error = %e, "Cannot slice dataset");
                    summary.failed += 1;
                    continue;
                }
            };
            info!(plotter = %task.name, leaves = leaves.len(), "Plotting");

            let mut aborted: HashSet<String> = HashSet::new();
            for leaf in leaves {
                let group = Index::group_id(&leaf);
                if aborted.contains(&group) {
                    summary.skipped += 1;
                    continue;
                }

                let unique_name = leaf.full_name();
                match task.plotter.plot(&leaf, &unique_name) {
                    Ok(file) => {
                        index.add(&task.module, &leaf, file);
                        summary.plotted += 1;
                    }
                    Err(e) => {
                        summary.failed += 1;
                        match self.policy {
                            PlotErrorPolicy::Skip => {
                                warn!(plotter = %task.name, view = %unique_name, error = %e, "Plot failed, skipping")
                            }
                            PlotErrorPolicy::AbortGroup => {
                                warn!(plotter = %task.name, group = %group, error = %e, "Plot failed, dropping group");
                                index.drop_group(&task.module, &group);
                                aborted.insert(group);
                            }
                        }
                    }
                }
            }
        }

        if index.is_empty() {
            warn!("Nothing was plotted, writing an empty index");
        }
        summary.index = index.write(&self.output_dir)?;
        info!(
            plotted = summary.plotted,
            indexed = index.len(),
            failed = summary.failed,
            skipped = summary.skipped,
            index = %summary.index.display(),
            "Run finished"
        );

        Ok(summary)
    }
}

/// Explicit queries first, then every combination along the dimensions.
fn expand(root: &View, queries: &[QuerySpec], dimensions: &[Dimension]) -> Result<Vec<View>> {
    let mut leaves = Vec::new();
    for view in root.for_queries(queries)? {
        leaves.extend(view.along_dimensions(dimensions)?);
    }
    Ok(leaves)
}
