use anyhow::{Context, Result};
use std::path::PathBuf;

use wdgraph::config::{ClassConfig, Config};
use wdgraph::pipeline::{write_subjects, SubjectSampler};
use wdgraph::sparql::QueryClient;

/// Options of the `sample-subjects` subcommand
pub struct SampleParams {
    pub country: Option<String>,
    pub wiki_lang: Option<String>,
    pub limit_per_class: Option<usize>,
    pub output: Option<PathBuf>,
}

pub async fn sample_subjects(config: Config, params: SampleParams) -> Result<()> {
    let resolver = super::load_resolver(&config)?;
    let country = resolver
        .resolve_named(params.country.as_deref())
        .context("Cannot resolve target country")?;

    let classes_path = config.pipeline.classes_path();
    let classes = ClassConfig::load(&classes_path)
        .with_context(|| format!("Failed to load classes: {}", classes_path.display()))?;

    let wiki_lang = params
        .wiki_lang
        .unwrap_or_else(|| config.pipeline.wiki_lang.clone());
    let limit = params
        .limit_per_class
        .unwrap_or(config.pipeline.limit_per_class);

    let client = QueryClient::from_config(&config).context("Failed to build SPARQL client")?;
    let sampler = SubjectSampler::new(
        &client,
        config.pipeline.label_languages.clone(),
        wiki_lang,
        limit,
    );
    let rows = sampler.sample(&classes, &country.id).await?;

    let output = params.output.unwrap_or_else(|| {
        config
            .pipeline
            .data_dir
            .join(format!("subjects_{}.csv", country.slug))
    });
    let written = write_subjects(&output, &rows)
        .with_context(|| format!("Failed to write subjects: {}", output.display()))?;

    tracing::info!(rows = written, path = %output.display(), "Subject list written");
    println!("Wrote {written} subjects to {}", output.display());
    Ok(())
}
