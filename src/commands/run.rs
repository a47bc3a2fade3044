use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

use wdgraph::config::{ClassConfig, Config};
use wdgraph::models::LanguagePriority;
use wdgraph::pipeline::{load_subjects, run_output_dir, Pipeline};
use wdgraph::sparql::QueryClient;

/// Options of the `run` subcommand; `None` falls back to the config
pub struct RunParams {
    pub country: Option<String>,
    pub label_langs: Option<String>,
    pub subjects_csv: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub class_config: Option<PathBuf>,
    pub seed: Option<u64>,
}

pub async fn run(mut config: Config, params: RunParams) -> Result<()> {
    if let Some(langs) = &params.label_langs {
        config.pipeline.label_languages =
            LanguagePriority::parse(langs).context("Invalid --label-langs")?;
    }

    let resolver = super::load_resolver(&config)?;
    let country = resolver
        .resolve_named(params.country.as_deref())
        .context("Cannot resolve target country")?;

    let subjects_path = params
        .subjects_csv
        .clone()
        .unwrap_or_else(|| config.pipeline.subjects_path(&country.slug));
    let subjects = load_subjects(&subjects_path)
        .with_context(|| format!("Failed to read subjects: {}", subjects_path.display()))?;

    // an explicit --class-config must exist; the default pool is optional
    let classes = match &params.class_config {
        Some(path) => Some(
            ClassConfig::load(path)
                .with_context(|| format!("Failed to load class config: {}", path.display()))?,
        ),
        None => ClassConfig::load_optional(&config.pipeline.property_pool_path())
            .context("Failed to load property pool")?,
    };

    let output_dir = run_output_dir(
        params.out_dir.as_deref(),
        &config.pipeline.output_dir,
        &country.slug,
    );

    let mut rng = match params.seed.or(config.pipeline.seed) {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    tracing::info!(
        country = %country.id,
        name = %country.name,
        subjects = subjects.len(),
        subjects_csv = %subjects_path.display(),
        sampling = classes.is_some(),
        "Resolved run inputs"
    );

    let client = QueryClient::from_config(&config).context("Failed to build SPARQL client")?;
    let pipeline = Pipeline::from_config(&client, &config, output_dir).class_config(classes);

    let summary = pipeline.run(&subjects, &country.id, &mut rng).await?;

    println!("{summary}");
    Ok(())
}
