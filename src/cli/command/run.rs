use std::path::PathBuf;

use anyhow::Result;

use super::{load_config, load_manager};
use crate::manager::RunSummary;

pub async fn run(
    config: PathBuf,
    output: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> Result<RunSummary> {
    let mut config = load_config(&config)?;
    if let Some(output) = output {
        config.output = output;
    }
    if cache_dir.is_some() {
        config.cache_dir = cache_dir;
    }

    let mut manager = load_manager(&config)?;
    Ok(manager.run().await?)
}
