//! Subcommand handlers for the `wdgraph` binary

pub mod country;
pub mod run;
pub mod sample;

pub use country::resolve_country;
pub use run::{run, RunParams};
pub use sample::{sample_subjects, SampleParams};

use anyhow::{Context, Result};

use wdgraph::config::{Config, CountryConfig, ProjectConfig};
use wdgraph::country::CountryResolver;

/// Resolver built from `countries.yml` and the optional `project.yml`
pub(crate) fn load_resolver(config: &Config) -> Result<CountryResolver> {
    let countries_path = config.pipeline.countries_path();
    let countries = CountryConfig::load(&countries_path).with_context(|| {
        format!(
            "Failed to load country config: {}",
            countries_path.display()
        )
    })?;

    let project_path = config.pipeline.project_path();
    let project = ProjectConfig::load_optional(&project_path).with_context(|| {
        format!("Failed to load project config: {}", project_path.display())
    })?;

    Ok(CountryResolver::new(countries, project))
}
