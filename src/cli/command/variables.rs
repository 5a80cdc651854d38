use anyhow::Result;

use crate::{
    manager::Services,
    source::{SourceContext, SOURCES},
    variable::{is_provided, Variable},
};

/// Prints one line per variable with the backends that can supply it.
pub fn variables() -> Result<()> {
    let services = Services::standard()?;
    let sources: Vec<_> = SOURCES
        .iter()
        .map(|(key, create)| {
            let source = create(SourceContext {
                name: key.to_string(),
                cache_dir: std::env::temp_dir(),
                fetcher: services.fetcher.clone(),
                reader: services.reader.clone(),
                parallelism: 1,
            });
            (*key, source)
        })
        .collect();

    for variable in Variable::ALL {
        let providers: Vec<&str> = sources
            .iter()
            .filter(|(_, source)| is_provided(source.as_ref(), variable))
            .map(|(key, _)| *key)
            .collect();
        let kind = if variable.is_3d() { "3d" } else { "surface" };
        println!("{:<28} {:<8} {}", variable.as_str(), kind, providers.join(", "));
    }

    Ok(())
}
