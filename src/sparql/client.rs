//! SPARQL client with response caching and retry
//!
//! The client handles:
//! - Cache lookup by exact query text (a hit never touches the network)
//! - Transient/fatal classification of failures
//! - Retry with exponential backoff and jitter for transient failures
//! - A courtesy pause after every successful network call

use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, ACCEPT},
    Client,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::query::SparqlQuery;
use crate::cache::{CacheStats, QueryCache};
use crate::config::{Config, EndpointConfig};
use crate::utils::error::QueryError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::truncate_text;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Sends one query over the wire; no caching, no retry
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, query: &str) -> Result<Value, QueryError>;
}

/// Runs queries; implemented by [`QueryClient`] and by test doubles
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &SparqlQuery) -> Result<Value, QueryError>;

    /// Client counters, when the executor keeps any
    fn stats(&self) -> Option<ClientStats> {
        None
    }
}

/// HTTP POST transport for a SPARQL endpoint
pub struct HttpTransport {
    /// HTTP client with configured timeout, user agent and compression
    client: Client,

    /// Endpoint URL
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Http` if the HTTP client cannot be created
    pub fn new(config: &EndpointConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, query: &str) -> Result<Value, QueryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, HeaderValue::from_static(SPARQL_RESULTS_JSON))
            .form(&[("query", query)])
            .send()
            .await
            .map_err(QueryError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::from_status(
                status.as_u16(),
                truncate_text(body.trim(), 300),
            ));
        }

        // a failed body read is a transport failure; only a complete but
        // undecodable body is malformed
        let bytes = response.bytes().await.map_err(QueryError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| QueryError::MalformedResponse(e.to_string()))
    }
}

/// Counters for one client instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Requests actually sent to the transport
    pub network_calls: u64,
    /// Transport attempts that failed (retried or not)
    pub failed_attempts: u64,
    /// Cache counters
    pub cache: CacheStats,
}

/// Cached, retrying SPARQL client
pub struct QueryClient<T: Transport = HttpTransport> {
    transport: T,
    cache: QueryCache,
    retry: RetryConfig,
    courtesy_delay: Duration,
    network_calls: AtomicU64,
    failed_attempts: AtomicU64,
}

impl QueryClient<HttpTransport> {
    /// Build the HTTP client described by the application config
    pub fn from_config(config: &Config) -> Result<Self, QueryError> {
        let transport = HttpTransport::new(&config.endpoint)?;
        Ok(Self::new(
            transport,
            QueryCache::new(config.cache.clone()),
            config.retry.clone(),
            config.endpoint.courtesy_delay(),
        ))
    }
}

impl<T: Transport> QueryClient<T> {
    pub fn new(
        transport: T,
        cache: QueryCache,
        retry: RetryConfig,
        courtesy_delay: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            retry,
            courtesy_delay,
            network_calls: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
        }
    }

    /// Execute raw query text
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, or the last transient error once the
    /// retry budget is exhausted
    pub async fn execute_text(&self, query: &str) -> Result<Value, QueryError> {
        if let Some(cached) = self.cache.get(query).await {
            return Ok(cached);
        }

        let transport = &self.transport;
        let network_calls = &self.network_calls;
        let failed_attempts = &self.failed_attempts;

        let value = with_retry_if(
            &self.retry,
            || async move {
                network_calls.fetch_add(1, Ordering::Relaxed);
                let result = transport.send(query).await;
                if result.is_err() {
                    failed_attempts.fetch_add(1, Ordering::Relaxed);
                }
                result
            },
            |e: &QueryError| e.is_transient(),
        )
        .await?;

        if let Err(e) = self.cache.put(query, &value).await {
            tracing::warn!(error = %e, "Failed to cache query response");
        }

        if !self.courtesy_delay.is_zero() {
            tokio::time::sleep(self.courtesy_delay).await;
        }

        Ok(value)
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            network_calls: self.network_calls.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: Transport> QueryExecutor for QueryClient<T> {
    async fn execute(&self, query: &SparqlQuery) -> Result<Value, QueryError> {
        tracing::debug!(
            kind = %query.kind(),
            values = query.values().len(),
            "Executing query"
        );
        self.execute_text(query.text()).await
    }

    fn stats(&self) -> Option<ClientStats> {
        Some(QueryClient::stats(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Plays back a fixed script of responses, then repeats the last one
    struct ScriptedTransport {
        script: Mutex<Vec<Result<Value, QueryError>>>,
    }

    impl ScriptedTransport {
        fn new(mut script: Vec<Result<Value, QueryError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _query: &str) -> Result<Value, QueryError> {
            let mut script = self.script.lock().unwrap();
            match script.len() {
                0 => Err(QueryError::Timeout),
                1 => match &script[0] {
                    Ok(v) => Ok(v.clone()),
                    Err(_) => Err(QueryError::Unavailable { status: 503 }),
                },
                _ => script.pop().unwrap(),
            }
        }
    }

    fn client(transport: ScriptedTransport, attempts: u32) -> QueryClient<ScriptedTransport> {
        QueryClient::new(
            transport,
            QueryCache::disabled(),
            RetryConfig::immediate(attempts),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let transport = ScriptedTransport::new(vec![
            Err(QueryError::Throttled { status: 429 }),
            Err(QueryError::Timeout),
            Ok(json!({"results": {"bindings": []}})),
        ]);
        let client = client(transport, 5);

        let value = client.execute_text("SELECT * {}").await.unwrap();
        assert_eq!(value["results"]["bindings"], json!([]));

        let stats = client.stats();
        assert_eq!(stats.network_calls, 3);
        assert_eq!(stats.failed_attempts, 2);
    }

    #[tokio::test]
    async fn test_fatal_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(QueryError::from_status(400, "syntax")),
            Ok(json!({})),
        ]);
        let client = client(transport, 5);

        let err = client.execute_text("SELECT").await.unwrap_err();
        assert!(matches!(err, QueryError::Rejected { status: 400, .. }));
        assert_eq!(client.stats().network_calls, 1);
    }
}
