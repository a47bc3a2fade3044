//! Subject-centered graphs and their Turtle form
//!
//! A graph is a star around one subject: one `wdt:` triple per edge and an
//! `rdfs:label` triple for each labelled entity. The Turtle written here
//! uses one triple per line and only prefixed names, which is also the only
//! subset [`Graph::from_turtle`] reads back.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{Edge, EntityRef, LabelMap, PropertyRef};

const PREFIXES: &str = "@prefix wd: <http://www.wikidata.org/entity/> .\n\
@prefix wdt: <http://www.wikidata.org/prop/direct/> .\n\
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n";

const SUBJECT_HEADER: &str = "# Subject: ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Predicate {
    /// `wdt:P...`
    Direct(PropertyRef),
    /// `rdfs:label`
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Object {
    Entity(EntityRef),
    /// Plain string, written as `xsd:string`
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: EntityRef,
    pub predicate: Predicate,
    pub object: Object,
}

impl Triple {
    pub fn edge(subject: &EntityRef, edge: &Edge) -> Self {
        Self {
            subject: subject.clone(),
            predicate: Predicate::Direct(edge.property.clone()),
            object: Object::Entity(edge.object.clone()),
        }
    }

    pub fn label(entity: &EntityRef, label: &str) -> Self {
        Self {
            subject: entity.clone(),
            predicate: Predicate::Label,
            object: Object::Literal(label.to_string()),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd:{} ", self.subject)?;
        match &self.predicate {
            Predicate::Direct(p) => write!(f, "wdt:{p} ")?,
            Predicate::Label => f.write_str("rdfs:label ")?,
        }
        match &self.object {
            Object::Entity(o) => write!(f, "wd:{o} .")?,
            Object::Literal(s) => write!(f, "\"{}\"^^xsd:string .", escape_literal(s))?,
        }
        Ok(())
    }
}

/// A subject and the triples describing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    pub subject: EntityRef,
    pub triples: BTreeSet<Triple>,
}

impl Graph {
    pub fn new(subject: EntityRef) -> Self {
        Self {
            subject,
            triples: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Triples whose predicate is a direct claim
    pub fn edge_count(&self) -> usize {
        self.triples
            .iter()
            .filter(|t| matches!(t.predicate, Predicate::Direct(_)))
            .count()
    }

    /// Serialize with the current time in the header
    pub fn to_turtle(&self) -> String {
        self.to_turtle_at(Utc::now())
    }

    pub fn to_turtle_at(&self, generated: DateTime<Utc>) -> String {
        let mut output = String::with_capacity(PREFIXES.len() + self.triples.len() * 48);
        output.push_str(PREFIXES);
        output.push('\n');
        output.push_str(&format!("{SUBJECT_HEADER}{}\n", self.subject));
        output.push_str(&format!("# Generated: {}\n\n", generated.to_rfc3339()));

        for triple in &self.triples {
            output.push_str(&triple.to_string());
            output.push('\n');
        }
        output
    }

    /// Parse the line-oriented Turtle produced by [`to_turtle`](Self::to_turtle)
    pub fn from_turtle(input: &str) -> Result<Self> {
        let mut subject: Option<EntityRef> = None;
        let mut triples = BTreeSet::new();

        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if let Some(rest) = line.strip_prefix(SUBJECT_HEADER) {
                subject = subject.or_else(|| EntityRef::parse(rest.trim()));
                continue;
            }
            if line.is_empty() || line.starts_with('#') || line.starts_with("@prefix") {
                continue;
            }

            let triple = parse_triple(line).map_err(|reason| Error::Turtle {
                line: line_no,
                reason,
            })?;
            if subject.is_none() {
                subject = Some(triple.subject.clone());
            }
            triples.insert(triple);
        }

        let subject = subject.ok_or_else(|| Error::Turtle {
            line: 0,
            reason: "no subject header and no triples".to_string(),
        })?;
        Ok(Self { subject, triples })
    }
}

/// Star graph for `subject`
///
/// Labels are attached to the subject and to edge objects only; entries of
/// `labels` for other entities are ignored.
pub fn assemble(subject: &EntityRef, edges: &[Edge], labels: &LabelMap) -> Graph {
    let mut graph = Graph::new(subject.clone());

    if let Some(label) = labels.get(subject) {
        graph.insert(Triple::label(subject, label));
    }

    for edge in edges {
        graph.insert(Triple::edge(subject, edge));
        if let Some(label) = labels.get(&edge.object) {
            graph.insert(Triple::label(&edge.object, label));
        }
    }

    graph
}

/// Write `graph` to `path` as Turtle
pub async fn persist(graph: &Graph, path: &Path) -> Result<()> {
    persist_turtle(&graph.to_turtle(), path).await
}

/// Write already rendered Turtle; parents are created and the file is
/// replaced atomically
pub async fn persist_turtle(turtle: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("ttl.tmp");
    tokio::fs::write(&temp_path, turtle).await?;
    tokio::fs::rename(&temp_path, path).await?;

    tracing::debug!(path = %path.display(), bytes = turtle.len(), "Graph written");
    Ok(())
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn unescape_literal(s: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(format!("unsupported escape \\{other}")),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}

fn parse_entity(token: &str) -> std::result::Result<EntityRef, String> {
    token
        .strip_prefix("wd:")
        .and_then(EntityRef::parse)
        .ok_or_else(|| format!("expected wd:Q..., found {token:?}"))
}

fn parse_triple(line: &str) -> std::result::Result<Triple, String> {
    let body = line
        .strip_suffix('.')
        .ok_or_else(|| "missing terminating '.'".to_string())?
        .trim_end();

    let (subject, rest) = body
        .split_once(char::is_whitespace)
        .ok_or_else(|| "missing predicate".to_string())?;
    let (predicate, object) = rest
        .trim_start()
        .split_once(char::is_whitespace)
        .ok_or_else(|| "missing object".to_string())?;
    let object = object.trim();

    let subject = parse_entity(subject)?;

    if predicate == "rdfs:label" {
        let literal = object
            .strip_prefix('"')
            .and_then(|o| o.strip_suffix("\"^^xsd:string"))
            .ok_or_else(|| format!("expected \"...\"^^xsd:string, found {object:?}"))?;
        return Ok(Triple {
            subject,
            predicate: Predicate::Label,
            object: Object::Literal(unescape_literal(literal)?),
        });
    }

    let property = predicate
        .strip_prefix("wdt:")
        .and_then(PropertyRef::parse)
        .ok_or_else(|| format!("expected wdt:P... or rdfs:label, found {predicate:?}"))?;

    Ok(Triple {
        subject,
        predicate: Predicate::Direct(property),
        object: Object::Entity(parse_entity(object)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str) -> EntityRef {
        EntityRef::parse(id).unwrap()
    }

    fn p(id: &str) -> PropertyRef {
        PropertyRef::parse(id).unwrap()
    }

    #[test]
    fn test_assemble_star() {
        let edges = vec![Edge::new(p("P27"), q("Q30")), Edge::new(p("P106"), q("Q36180"))];
        let labels = LabelMap::from([
            (q("Q42"), "Douglas Adams".to_string()),
            (q("Q30"), "United States".to_string()),
            (q("Q999"), "Unrelated".to_string()),
        ]);

        let graph = assemble(&q("Q42"), &edges, &labels);

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.triples.contains(&Triple::label(&q("Q30"), "United States")));
        assert!(!graph.triples.iter().any(|t| t.subject == q("Q999")));
    }

    #[test]
    fn test_turtle_lines() {
        let edges = vec![Edge::new(p("P27"), q("Q30"))];
        let labels = LabelMap::from([(q("Q42"), "Say \"hi\"\\now".to_string())]);
        let turtle = assemble(&q("Q42"), &edges, &labels).to_turtle();

        assert!(turtle.starts_with("@prefix wd: <http://www.wikidata.org/entity/> ."));
        assert!(turtle.contains("# Subject: Q42\n"));
        assert!(turtle.contains("wd:Q42 wdt:P27 wd:Q30 .\n"));
        assert!(turtle.contains(r#"wd:Q42 rdfs:label "Say \"hi\"\\now"^^xsd:string ."#));
    }

    #[test]
    fn test_escape_roundtrip() {
        let raw = "tab\there \"quoted\" back\\slash\nline";
        assert_eq!(unescape_literal(&escape_literal(raw)).unwrap(), raw);
    }

    #[test]
    fn test_from_turtle_rejects_garbage() {
        let err = Graph::from_turtle("# Subject: Q1\nwd:Q1 wdt:P27 .\n").unwrap_err();
        assert!(matches!(err, Error::Turtle { line: 2, .. }));

        let err = Graph::from_turtle("wd:Q1 owl:sameAs wd:Q2 .\n").unwrap_err();
        assert!(matches!(err, Error::Turtle { line: 1, .. }));

        assert!(Graph::from_turtle("").is_err());
    }

    #[test]
    fn test_from_turtle_empty_graph_keeps_subject() {
        let graph = Graph::new(q("Q42"));
        let parsed = Graph::from_turtle(&graph.to_turtle()).unwrap();
        assert_eq!(parsed.subject, q("Q42"));
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn test_persist_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("us").join("full").join("Q42.ttl");

        let graph = assemble(&q("Q42"), &[Edge::new(p("P27"), q("Q30"))], &LabelMap::new());
        persist(&graph, &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Graph::from_turtle(&written).unwrap(), graph);
        assert!(!path.with_extension("ttl.tmp").exists());
    }
}
