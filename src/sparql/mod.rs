//! SPARQL query execution against the Wikidata Query Service
//!
//! # Submodules
//!
//! - [`query`] - Parameterized query objects built from validated identifiers
//! - [`results`] - Decoding of SPARQL JSON results
//! - [`client`] - Cached, retrying client and the transport seam
//!
//! # Example
//!
//! ```no_run
//! use wdgraph::config::Config;
//! use wdgraph::models::EntityRef;
//! use wdgraph::sparql::{QueryClient, QueryExecutor, SparqlQuery};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let client = QueryClient::from_config(&config)?;
//!
//! let subject = EntityRef::parse("Q42").unwrap();
//! let json = client.execute(&SparqlQuery::truthy_edges(&subject)).await?;
//! println!("{json}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod query;
pub mod results;

pub use client::{ClientStats, HttpTransport, QueryClient, QueryExecutor, Transport};
pub use query::{QueryKind, SparqlQuery};
pub use results::{Binding, BindingValue, SparqlResults};
