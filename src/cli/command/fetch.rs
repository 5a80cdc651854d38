use std::path::PathBuf;

use anyhow::{anyhow, Result};

use super::{load_config, load_manager};
use crate::cli::create_spinner;

/// Fetches every needed source and reports what arrived.
pub async fn fetch(config: PathBuf) -> Result<()> {
    let config = load_config(&config)?;
    let manager = load_manager(&config)?;

    let bar = create_spinner("Fetching data sources...".to_string());
    let results = manager.aggregate().await;
    bar.finish_with_message("Data sources fetched");

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(dataset) => println!("{name}:\n{dataset}"),
            Err(e) => {
                failed += 1;
                println!("{name}: failed ({e})");
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} data sources failed", results.len()));
    }
    Ok(())
}
