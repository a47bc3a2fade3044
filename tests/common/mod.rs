//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use wdgraph::models::{EntityRef, PropertyRef};
use wdgraph::sparql::{QueryExecutor, QueryKind, SparqlQuery, Transport};
use wdgraph::utils::error::QueryError;

pub const WD: &str = "http://www.wikidata.org/entity/";
pub const WDT: &str = "http://www.wikidata.org/prop/direct/";

pub fn q(id: &str) -> EntityRef {
    EntityRef::parse(id).unwrap()
}

pub fn p(id: &str) -> PropertyRef {
    PropertyRef::parse(id).unwrap()
}

pub fn ids(list: &[&str]) -> Vec<EntityRef> {
    list.iter().map(|s| q(s)).collect()
}

pub fn bindings(rows: Vec<Value>) -> Value {
    json!({"head": {"vars": []}, "results": {"bindings": rows}})
}

pub fn uri_row(var: &str, id: &str) -> Value {
    let mut row = serde_json::Map::new();
    row.insert(
        var.to_string(),
        json!({"type": "uri", "value": format!("{WD}{id}")}),
    );
    Value::Object(row)
}

/// Country membership by cascade pass
#[derive(Debug, Default, Clone)]
pub struct Membership {
    pub direct: HashSet<String>,
    pub containment: HashSet<String>,
    pub indirect: HashSet<String>,
}

impl Membership {
    pub fn new(direct: &[&str], containment: &[&str], indirect: &[&str]) -> Self {
        let set = |l: &[&str]| -> HashSet<String> { l.iter().map(|s| s.to_string()).collect() };
        Self {
            direct: set(direct),
            containment: set(containment),
            indirect: set(indirect),
        }
    }

    fn members(&self, kind: QueryKind) -> &HashSet<String> {
        match kind {
            QueryKind::CountryDirect => &self.direct,
            QueryKind::CountryContainment => &self.containment,
            _ => &self.indirect,
        }
    }
}

/// In-memory stand-in for the query service, answering by query kind
#[derive(Default)]
pub struct FakeWikidata {
    /// subject -> (property, object) pairs, as full IRIs
    pub edges: HashMap<String, Vec<(String, String)>>,
    pub membership: Membership,
    pub labels: HashMap<String, String>,
    /// Any cascade query containing one of these ids fails
    pub poison: HashSet<String>,
    /// Subjects whose edge query fails
    pub broken_subjects: HashSet<String>,
    pub calls: Mutex<Vec<QueryKind>>,
}

impl FakeWikidata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edges(mut self, subject: &str, edges: &[(&str, &str)]) -> Self {
        self.edges.insert(
            subject.to_string(),
            edges
                .iter()
                .map(|(p, o)| (format!("{WDT}{p}"), format!("{WD}{o}")))
                .collect(),
        );
        self
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    pub fn with_label(mut self, id: &str, label: &str) -> Self {
        self.labels.insert(id.to_string(), label.to_string());
        self
    }

    pub fn calls_of(&self, kind: QueryKind) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

#[async_trait]
impl QueryExecutor for FakeWikidata {
    async fn execute(&self, query: &SparqlQuery) -> Result<Value, QueryError> {
        self.calls.lock().unwrap().push(query.kind());
        let values: Vec<&str> = query.values().iter().map(|v| v.as_str()).collect();

        match query.kind() {
            QueryKind::TruthyEdges => {
                let subject = values[0];
                if self.broken_subjects.contains(subject) {
                    return Err(QueryError::Timeout);
                }
                let rows = self
                    .edges
                    .get(subject)
                    .map(|edges| {
                        edges
                            .iter()
                            .map(|(p, o)| {
                                json!({
                                    "p": {"type": "uri", "value": p},
                                    "o": {"type": "uri", "value": o}
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(bindings(rows))
            }
            kind @ (QueryKind::CountryDirect
            | QueryKind::CountryContainment
            | QueryKind::CountryIndirect) => {
                if values.iter().any(|v| self.poison.contains(*v)) {
                    return Err(QueryError::Unavailable { status: 503 });
                }
                let members = self.membership.members(kind);
                let rows = values
                    .iter()
                    .filter(|v| members.contains(**v))
                    .map(|v| uri_row("o", v))
                    .collect();
                Ok(bindings(rows))
            }
            QueryKind::Labels => {
                let rows = values
                    .iter()
                    .map(|v| {
                        let label = self.labels.get(*v).cloned().unwrap_or_else(|| v.to_string());
                        json!({
                            "x": {"type": "uri", "value": format!("{WD}{v}")},
                            "xLabel": {"type": "literal", "value": label, "xml:lang": "es"}
                        })
                    })
                    .collect();
                Ok(bindings(rows))
            }
            QueryKind::SubjectSample => Ok(bindings(Vec::new())),
        }
    }
}

/// Transport that answers cascade queries from the raw query text and
/// counts every call
pub struct FakeEndpoint {
    pub membership: Membership,
    pub sent: AtomicU64,
}

impl FakeEndpoint {
    pub fn new(membership: Membership) -> Self {
        Self {
            membership,
            sent: AtomicU64::new(0),
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeEndpoint {
    async fn send(&self, query: &str) -> Result<Value, QueryError> {
        self.sent.fetch_add(1, Ordering::SeqCst);

        let kind = if query.contains("wdt:P159") {
            QueryKind::CountryIndirect
        } else if query.contains("wdt:P131") {
            QueryKind::CountryContainment
        } else {
            QueryKind::CountryDirect
        };

        let values_line = query
            .lines()
            .find(|l| l.trim_start().starts_with("VALUES"))
            .unwrap_or_default();
        let id = Regex::new(r"wd:(Q\d+)").unwrap();
        let members = self.membership.members(kind);

        let rows = id
            .captures_iter(values_line)
            .map(|c| c[1].to_string())
            .filter(|v| members.contains(v))
            .map(|v| uri_row("o", &v))
            .collect();
        Ok(bindings(rows))
    }
}
