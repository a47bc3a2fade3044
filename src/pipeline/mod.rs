//! Per-subject extraction pipeline
//!
//! Every subject moves through the same stages, strictly one after another:
//!
//! ```text
//! Start → EdgesFetched → CountryFiltered → (Sampled) → Labeled → Assembled → Persisted
//!   │          │               │                          │
//!   └──────────┴───────────────┴──────────────────────────┴──▶ Skipped(reason)
//! ```
//!
//! A failure inside a subject skips that subject; the run continues. Only
//! run-level problems (empty subject list, output that cannot be written)
//! end the run.
//!
//! # Example
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use wdgraph::config::Config;
//! use wdgraph::models::EntityRef;
//! use wdgraph::pipeline::{load_subjects, Pipeline};
//! use wdgraph::sparql::QueryClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let client = QueryClient::from_config(&config)?;
//! let subjects = load_subjects(std::path::Path::new("data/subjects.csv"))?;
//!
//! let pipeline = Pipeline::new(&client, "graphs/us");
//! let country = EntityRef::parse("Q30").unwrap();
//! let summary = pipeline
//!     .run(&subjects, &country, &mut ChaCha8Rng::seed_from_u64(42))
//!     .await?;
//!
//! println!("{} graphs written", summary.persisted);
//! # Ok(())
//! # }
//! ```

pub mod sampling;
pub mod subjects;

use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ClassConfig, Config};
use crate::error::{Error, Result, WdgraphErrorTrait};
use crate::filter::{CountryMembershipFilter, FilterConfig};
use crate::graph::{assemble, persist_turtle};
use crate::models::{EntityRef, LanguagePriority, SubjectRecord};
use crate::sampler::PropertySampler;
use crate::sparql::{ClientStats, QueryExecutor};
use crate::utils::error::ConfigError;
use crate::wikidata::{LabelResolver, TruthyEdgeExtractor, DEFAULT_LABEL_BATCH};

pub use sampling::SubjectSampler;
pub use subjects::{load_subjects, write_subjects, DEFAULT_CLASS};

const FULL_DIR: &str = "full";
const SAMPLED_DIR: &str = "sampled";

/// Why a subject produced no output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// No conforming outgoing edges
    NoEdges,
    /// No edge object related to the country
    NoCountryEdges,
    /// Edge query failed
    ExtractionFailed,
    /// A cascade query failed
    FilterFailed,
    /// Label query failed
    LabelsFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoEdges => "no_edges",
            Self::NoCountryEdges => "no_country_edges",
            Self::ExtractionFailed => "extraction_failed",
            Self::FilterFailed => "filter_failed",
            Self::LabelsFailed => "labels_failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectOutcome {
    Persisted {
        subject: EntityRef,
        edges: usize,
        triples: usize,
    },
    Skipped {
        subject: EntityRef,
        reason: SkipReason,
    },
}

/// Result of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,
    pub full_dir: PathBuf,
    /// Present when class-driven sampling was active
    pub sampled_dir: Option<PathBuf>,
    pub client: Option<ClientStats>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &SubjectOutcome) {
        match outcome {
            SubjectOutcome::Persisted { .. } => self.persisted += 1,
            SubjectOutcome::Skipped { reason, .. } => {
                self.skipped += 1;
                *self.skipped_by_reason.entry(*reason).or_insert(0) += 1;
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subjects:   {}", self.total)?;
        writeln!(f, "Persisted:  {}", self.persisted)?;
        writeln!(f, "Skipped:    {}", self.skipped)?;
        for (reason, count) in &self.skipped_by_reason {
            writeln!(f, "  {reason}: {count}")?;
        }
        writeln!(f, "Output:     {}", self.full_dir.display())?;
        if let Some(sampled) = &self.sampled_dir {
            writeln!(f, "Sampled:    {}", sampled.display())?;
        }
        if let Some(stats) = &self.client {
            writeln!(
                f,
                "Queries:    {} sent, {} failed, {} cache hits",
                stats.network_calls, stats.failed_attempts, stats.cache.hits
            )?;
        }
        write!(f, "Elapsed:    {} ms", self.elapsed_ms)
    }
}

/// Drives subjects through extraction, filtering, sampling, labelling and output
pub struct Pipeline<'a, Q: QueryExecutor + ?Sized> {
    executor: &'a Q,
    output_dir: PathBuf,
    filter: FilterConfig,
    languages: LanguagePriority,
    label_batch_size: usize,
    classes: Option<ClassConfig>,
    sampler: PropertySampler,
}

impl<'a, Q: QueryExecutor + ?Sized> Pipeline<'a, Q> {
    /// Pipeline writing below `output_dir` (the per-country directory)
    pub fn new(executor: &'a Q, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            output_dir: output_dir.into(),
            filter: FilterConfig::default(),
            languages: LanguagePriority::default(),
            label_batch_size: DEFAULT_LABEL_BATCH,
            classes: None,
            sampler: PropertySampler::new(),
        }
    }

    /// Pipeline settings taken from the application config
    pub fn from_config(executor: &'a Q, config: &Config, output_dir: impl Into<PathBuf>) -> Self {
        Self::new(executor, output_dir)
            .filter_config(config.filter.clone())
            .label_languages(config.pipeline.label_languages.clone())
            .label_batch_size(config.pipeline.label_batch_size)
    }

    pub fn filter_config(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn label_languages(mut self, languages: LanguagePriority) -> Self {
        self.languages = languages;
        self
    }

    pub fn label_batch_size(mut self, size: usize) -> Self {
        self.label_batch_size = size;
        self
    }

    /// Enables per-class property sampling and the `sampled/` output
    pub fn class_config(mut self, classes: Option<ClassConfig>) -> Self {
        self.classes = classes;
        self
    }

    pub fn full_dir(&self) -> PathBuf {
        self.output_dir.join(FULL_DIR)
    }

    pub fn sampled_dir(&self) -> Option<PathBuf> {
        self.classes
            .as_ref()
            .map(|_| self.output_dir.join(SAMPLED_DIR))
    }

    /// Process every subject in order
    ///
    /// # Errors
    ///
    /// Fails before any subject is processed when `subjects` is empty, and
    /// stops the run when an output file cannot be written
    pub async fn run<R: Rng + ?Sized>(
        &self,
        subjects: &[SubjectRecord],
        country: &EntityRef,
        rng: &mut R,
    ) -> Result<RunSummary> {
        if subjects.is_empty() {
            return Err(ConfigError::invalid("subjects", "subject list is empty").into());
        }

        let started = Instant::now();
        let mut summary = RunSummary {
            total: subjects.len(),
            full_dir: self.full_dir(),
            sampled_dir: self.sampled_dir(),
            ..Default::default()
        };

        tracing::info!(
            subjects = subjects.len(),
            country = %country,
            output = %summary.full_dir.display(),
            sampling = self.classes.is_some(),
            "Starting pipeline run"
        );

        for (idx, record) in subjects.iter().enumerate() {
            let outcome = self.process_subject(record, country, rng).await?;
            if let SubjectOutcome::Persisted { edges, triples, .. } = &outcome {
                tracing::info!(
                    index = idx + 1,
                    total = subjects.len(),
                    subject = %record.subject,
                    edges,
                    triples,
                    "Subject persisted"
                );
            }
            summary.record(&outcome);
        }

        summary.client = self.executor.stats();
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            persisted = summary.persisted,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed_ms,
            "Pipeline run complete"
        );

        Ok(summary)
    }

    /// Run one subject to a terminal state
    ///
    /// Only output write failures are returned as errors.
    pub async fn process_subject<R: Rng + ?Sized>(
        &self,
        record: &SubjectRecord,
        country: &EntityRef,
        rng: &mut R,
    ) -> Result<SubjectOutcome> {
        let subject = &record.subject;
        let skip = |reason: SkipReason| SubjectOutcome::Skipped {
            subject: subject.clone(),
            reason,
        };

        // Start → EdgesFetched
        let edges = match TruthyEdgeExtractor::new(self.executor).edges_for(subject).await {
            Ok(edges) => edges,
            Err(e) => {
                warn_skip(subject, SkipReason::ExtractionFailed, &Error::from(e));
                return Ok(skip(SkipReason::ExtractionFailed));
            }
        };
        if edges.is_empty() {
            tracing::debug!(subject = %subject, "No edges, skipping");
            return Ok(skip(SkipReason::NoEdges));
        }

        // EdgesFetched → CountryFiltered
        let objects: Vec<EntityRef> = edges.iter().map(|e| e.object.clone()).collect();
        let members = match CountryMembershipFilter::new(self.executor, self.filter.clone())
            .filter(&objects, country)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                warn_skip(subject, SkipReason::FilterFailed, &Error::from(e));
                return Ok(skip(SkipReason::FilterFailed));
            }
        };
        let mut edges: Vec<_> = edges
            .into_iter()
            .filter(|e| members.contains(&e.object))
            .collect();
        if edges.is_empty() {
            tracing::debug!(subject = %subject, "No edges related to the country, skipping");
            return Ok(skip(SkipReason::NoCountryEdges));
        }

        // CountryFiltered → Sampled
        if let Some(classes) = &self.classes {
            let before = edges.len();
            edges = self
                .sampler
                .sample(&edges, &record.class_name, Some(classes), rng);
            tracing::debug!(
                subject = %subject,
                class = %record.class_name,
                before,
                after = edges.len(),
                "Properties sampled"
            );
        }

        // → Labeled
        let mut ids = Vec::with_capacity(edges.len() + 1);
        ids.push(subject.clone());
        ids.extend(edges.iter().map(|e| e.object.clone()));
        let labels = match LabelResolver::with_batch_size(self.executor, self.label_batch_size)
            .labels(&ids, &self.languages)
            .await
        {
            Ok(labels) => labels,
            Err(e) => {
                warn_skip(subject, SkipReason::LabelsFailed, &Error::from(e));
                return Ok(skip(SkipReason::LabelsFailed));
            }
        };

        // → Assembled → Persisted
        let graph = assemble(subject, &edges, &labels);
        let turtle = graph.to_turtle_at(Utc::now());
        let file_name = format!("{subject}.ttl");

        persist_turtle(&turtle, &self.full_dir().join(&file_name)).await?;
        // sampling is a run-wide toggle: every persisted subject is mirrored,
        // changed or not
        if let Some(sampled) = self.sampled_dir() {
            persist_turtle(&turtle, &sampled.join(&file_name)).await?;
        }

        Ok(SubjectOutcome::Persisted {
            subject: subject.clone(),
            edges: edges.len(),
            triples: graph.len(),
        })
    }
}

fn warn_skip(subject: &EntityRef, reason: SkipReason, error: &Error) {
    tracing::warn!(
        subject = %subject,
        reason = %reason,
        category = %error.category(),
        error = %error,
        "Skipping subject"
    );
}

/// `<output_dir>/<country-slug>`
pub fn country_output_dir(output_dir: &Path, country_slug: &str) -> PathBuf {
    output_dir.join(country_slug)
}

/// Run output directory: an explicit directory is used as given, otherwise
/// the configured root gets a per-country subdirectory
pub fn run_output_dir(explicit: Option<&Path>, output_root: &Path, country_slug: &str) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => country_output_dir(output_root, country_slug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_reasons() {
        let q = EntityRef::parse("Q1").unwrap();
        let mut summary = RunSummary::default();
        summary.record(&SubjectOutcome::Skipped {
            subject: q.clone(),
            reason: SkipReason::FilterFailed,
        });
        summary.record(&SubjectOutcome::Skipped {
            subject: q.clone(),
            reason: SkipReason::FilterFailed,
        });
        summary.record(&SubjectOutcome::Persisted {
            subject: q,
            edges: 1,
            triples: 2,
        });

        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.skipped_by_reason[&SkipReason::FilterFailed], 2);
        assert!(summary.to_string().contains("filter_failed: 2"));
    }

    #[test]
    fn test_output_dirs() {
        struct Never;
        #[async_trait::async_trait]
        impl QueryExecutor for Never {
            async fn execute(
                &self,
                _query: &crate::sparql::SparqlQuery,
            ) -> std::result::Result<serde_json::Value, crate::utils::error::QueryError> {
                unreachable!()
            }
        }

        let pipeline = Pipeline::new(&Never, country_output_dir(Path::new("graphs"), "us"));
        assert_eq!(pipeline.full_dir(), PathBuf::from("graphs/us/full"));
        assert_eq!(pipeline.sampled_dir(), None);

        let pipeline = pipeline.class_config(Some(ClassConfig::default()));
        assert_eq!(pipeline.sampled_dir(), Some(PathBuf::from("graphs/us/sampled")));
    }

    #[test]
    fn test_explicit_output_dir_is_not_nested() {
        let root = Path::new("graphs");
        assert_eq!(
            run_output_dir(Some(Path::new("out/run1")), root, "us"),
            PathBuf::from("out/run1")
        );
        assert_eq!(run_output_dir(None, root, "us"), PathBuf::from("graphs/us"));
    }
}
