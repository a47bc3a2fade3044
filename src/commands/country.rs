use anyhow::{Context, Result};

use wdgraph::config::Config;

pub fn resolve_country(config: &Config, token: Option<&str>) -> Result<()> {
    let resolver = super::load_resolver(config)?;
    let country = resolver
        .resolve_named(token)
        .with_context(|| format!("Cannot resolve country {:?}", token.unwrap_or("<project>")))?;

    println!("{}\t{}\t{}", country.id, country.name, country.slug);
    Ok(())
}
