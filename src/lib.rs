//! wdgraph - Country-scoped knowledge subgraphs from Wikidata
//!
//! Extracts small, subject-centered graphs from the public Wikidata SPARQL
//! endpoint, keeps only the relations whose objects are tied to a target
//! country, and writes each graph as Turtle.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Application settings and the country/class/project documents
//! - [`sparql`] - Query objects, result decoding and the cached, retrying client
//! - [`cache`] - On-disk response cache keyed by query hash
//! - [`country`] - Country token resolution
//! - [`wikidata`] - Truthy edge extraction and label lookup
//! - [`filter`] - Three-pass country-membership cascade
//! - [`sampler`] - Weighted per-class property sampling
//! - [`graph`] - Star graph assembly, Turtle output and persistence
//! - [`pipeline`] - Per-subject orchestration and subject lists
//! - [`models`] - Identifiers and core data structures
//! - [`utils`] - Retry policy, domain errors and helpers
//!
//! # Example
//!
//! ```no_run
//! use wdgraph::config::Config;
//! use wdgraph::filter::{CountryMembershipFilter, FilterConfig};
//! use wdgraph::models::EntityRef;
//! use wdgraph::sparql::QueryClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = QueryClient::from_config(&config)?;
//!
//!     let candidates = vec![EntityRef::parse("Q60").unwrap()];
//!     let country = EntityRef::parse("Q30").unwrap();
//!     let members = CountryMembershipFilter::new(&client, FilterConfig::default())
//!         .filter(&candidates, &country)
//!         .await?;
//!     println!("{members:?}");
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod country;
pub mod error;
pub mod filter;
pub mod graph;
pub mod models;
pub mod pipeline;
pub mod sampler;
pub mod sparql;
pub mod utils;
pub mod wikidata;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ClassConfig, Config, CountryConfig, ProjectConfig};
    pub use crate::country::{CountryResolver, ResolvedCountry};
    pub use crate::error::{Error, ErrorCategory, Result, WdgraphErrorTrait};
    pub use crate::filter::{CountryMembershipFilter, FilterConfig};
    pub use crate::graph::{assemble, Graph};
    pub use crate::models::{Edge, EntityRef, LabelMap, LanguagePriority, PropertyRef, SubjectRecord};
    pub use crate::pipeline::{Pipeline, RunSummary, SkipReason};
    pub use crate::sampler::PropertySampler;
    pub use crate::sparql::{QueryClient, QueryExecutor, SparqlQuery};
}

// Direct re-exports for convenience
pub use models::{Edge, EntityRef, PropertyRef, SubjectRecord};
