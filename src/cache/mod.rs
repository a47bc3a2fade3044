//! On-disk cache of raw SPARQL responses
//!
//! One file per distinct query text, named by the SHA-256 of that text:
//!
//! ```text
//! data/cache_wd/
//!   3f1c...9a.json   <- raw JSON response of exactly one query
//! ```
//!
//! Entries are append-only and never invalidated: once written, a file is
//! treated as the permanent answer for that exact query text. Writes go
//! through a temporary file and a rename, so readers never see a partial
//! entry. A single process is assumed to own the directory.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON file per query
    pub dir: PathBuf,

    /// When disabled every query goes to the network and nothing is written
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/cache_wd"),
            enabled: true,
        }
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Total entries written
    pub writes: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// File-per-query response cache
#[derive(Debug)]
pub struct QueryCache {
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(CacheConfig {
            enabled: false,
            ..Default::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Hash query text for the cache key
    pub fn hash_query(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Path of the entry for this exact query text
    pub fn entry_path(&self, query: &str) -> PathBuf {
        self.config
            .dir
            .join(format!("{}.json", Self::hash_query(query)))
    }

    /// Look up a response; an unreadable or corrupt entry counts as a miss
    pub async fn get(&self, query: &str) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }

        let path = self.entry_path(query);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %path.display(), "Query cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt cache entry, ignoring");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a response for this exact query text
    pub async fn put(&self, query: &str, value: &Value) -> io::Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.dir).await?;

        let path = self.entry_path(query);
        let temp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(value)?;

        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path.display(), "Query cache write");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
