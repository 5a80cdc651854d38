pub mod fetch;
pub mod run;
pub mod variables;

use std::path::Path;

use anyhow::{anyhow, Context, Result};

pub use fetch::fetch;
pub use run::run;
pub use variables::variables;

use crate::{
    config::Config,
    manager::{Manager, Registry, Services},
};

/// Loads the config and builds the pipeline, failing before any download.
pub fn load_manager(config: &Config) -> Result<Manager> {
    let services = Services::standard()?;
    Manager::from_config(config, &Registry::standard(), &services).map_err(|e| {
        if e.is_preflight() {
            anyhow!("Configuration rejected: {e}")
        } else {
            e.into()
        }
    })
}

pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Cannot load config `{}`", path.display()))
}
