//! Wikidata-specific extraction on top of the SPARQL client
//!
//! - [`truthy`] - Outgoing direct-claim edges of a subject
//! - [`labels`] - Labels in a prioritized language order

pub mod labels;
pub mod truthy;

pub use labels::{LabelResolver, DEFAULT_LABEL_BATCH};
pub use truthy::TruthyEdgeExtractor;

/// Namespace of Wikidata items
pub const WD: &str = "http://www.wikidata.org/entity/";

/// Namespace of truthy direct-claim predicates
pub const WDT: &str = "http://www.wikidata.org/prop/direct/";
