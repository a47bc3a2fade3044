use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wdgraph::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "wdgraph",
    version,
    about = "Country-scoped subject graphs from the Wikidata query service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Application config file (default: ./wdgraph.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, filter and write one graph per subject
    Run {
        /// Country as identifier, name or alias (default: project country)
        #[arg(long)]
        country: Option<String>,

        /// Label languages, comma separated (e.g. "es,en")
        #[arg(long)]
        label_langs: Option<String>,

        /// Subject list CSV (default: data/subjects_<country>.csv or data/subjects.csv)
        #[arg(long)]
        subjects_csv: Option<PathBuf>,

        /// Output directory holding full/ and sampled/ (default: <pipeline.output_dir>/<country>)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Class config enabling property sampling (default: config/property_pool.yml when present)
        #[arg(long)]
        class_config: Option<PathBuf>,

        /// Seed for property sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sample subjects per class from their seed occupations
    SampleSubjects {
        /// Country as identifier, name or alias (default: project country)
        #[arg(long)]
        country: Option<String>,

        /// Wikipedia edition the subjects need an article in
        #[arg(long)]
        wiki_lang: Option<String>,

        /// Maximum subjects per class
        #[arg(long)]
        limit_per_class: Option<usize>,

        /// Output CSV (default: data/subjects_<country>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the identifier a country token resolves to
    ResolveCountry {
        /// Country as identifier, name or alias (default: project country)
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, cli.verbose)?;

    tracing::debug!(endpoint = %config.endpoint.url, "wdgraph starting");

    match cli.command {
        Commands::Run {
            country,
            label_langs,
            subjects_csv,
            out_dir,
            class_config,
            seed,
        } => {
            tracing::info!(
                country = ?country,
                subjects_csv = ?subjects_csv,
                out_dir = ?out_dir,
                seed = ?seed,
                "Starting run command"
            );
            commands::run(
                config,
                commands::RunParams {
                    country,
                    label_langs,
                    subjects_csv,
                    out_dir,
                    class_config,
                    seed,
                },
            )
            .await?;
        }

        Commands::SampleSubjects {
            country,
            wiki_lang,
            limit_per_class,
            output,
        } => {
            tracing::info!(
                country = ?country,
                wiki_lang = ?wiki_lang,
                limit_per_class = ?limit_per_class,
                "Starting sample-subjects command"
            );
            commands::sample_subjects(
                config,
                commands::SampleParams {
                    country,
                    wiki_lang,
                    limit_per_class,
                    output,
                },
            )
            .await?;
        }

        Commands::ResolveCountry { token } => {
            commands::resolve_country(&config, token.as_deref())?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("wdgraph=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("wdgraph=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    }

    Ok(())
}
