// Core data structures for the wdgraph pipeline

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::utils::error::ValidationError;

fn entity_re() -> &'static Regex {
    static ENTITY_RE: OnceLock<Regex> = OnceLock::new();
    ENTITY_RE.get_or_init(|| Regex::new(r"^Q\d+$").expect("Invalid regex pattern"))
}

fn property_re() -> &'static Regex {
    static PROPERTY_RE: OnceLock<Regex> = OnceLock::new();
    PROPERTY_RE.get_or_init(|| Regex::new(r"^P\d+$").expect("Invalid regex pattern"))
}

fn language_re() -> &'static Regex {
    static LANGUAGE_RE: OnceLock<Regex> = OnceLock::new();
    LANGUAGE_RE.get_or_init(|| Regex::new(r"^[a-z]{2,3}(-[a-z]+)?$").expect("Invalid regex pattern"))
}

/// Wikidata item identifier (`Q42`)
///
/// Only values matching `^Q\d+$` can be constructed, so an `EntityRef`
/// is always safe to interpolate into a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityRef(String);

impl EntityRef {
    /// Parse a strict identifier, returning `None` for anything else
    pub fn parse(value: &str) -> Option<Self> {
        entity_re().is_match(value).then(|| Self(value.to_string()))
    }

    /// Parse the last path segment of an entity IRI
    /// (`http://www.wikidata.org/entity/Q42` -> `Q42`)
    pub fn from_iri(iri: &str) -> Option<Self> {
        Self::parse(last_segment(iri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError {
            kind: "entity",
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for EntityRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityRef> for String {
    fn from(value: EntityRef) -> Self {
        value.0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wikidata property identifier (`P31`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyRef(String);

impl PropertyRef {
    pub fn parse(value: &str) -> Option<Self> {
        property_re().is_match(value).then(|| Self(value.to_string()))
    }

    /// Parse the last path segment of a direct-claim IRI
    /// (`http://www.wikidata.org/prop/direct/P31` -> `P31`)
    pub fn from_iri(iri: &str) -> Option<Self> {
        Self::parse(last_segment(iri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PropertyRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError {
            kind: "property",
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for PropertyRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyRef> for String {
    fn from(value: PropertyRef) -> Self {
        value.0
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn last_segment(iri: &str) -> &str {
    iri.rsplit('/').next().unwrap_or(iri)
}

/// Outgoing truthy statement of an implicit subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub property: PropertyRef,
    pub object: EntityRef,
}

impl Edge {
    pub fn new(property: PropertyRef, object: EntityRef) -> Self {
        Self { property, object }
    }
}

/// Human-readable labels keyed by entity; entities without a label are absent
pub type LabelMap = BTreeMap<EntityRef, String>;

/// Ordered list of label languages, highest priority first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LanguagePriority(Vec<String>);

impl LanguagePriority {
    /// Parse a comma-separated list such as `"es,en"`
    pub fn parse(list: &str) -> Result<Self, ValidationError> {
        Self::try_from(
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>(),
        )
    }

    pub fn languages(&self) -> &[String] {
        &self.0
    }

    /// Language list as the label service expects it
    pub fn to_service_param(&self) -> String {
        self.0.join(",")
    }
}

impl TryFrom<Vec<String>> for LanguagePriority {
    type Error = ValidationError;

    fn try_from(langs: Vec<String>) -> Result<Self, Self::Error> {
        if langs.is_empty() {
            return Err(ValidationError {
                kind: "language",
                value: String::new(),
            });
        }
        if let Some(bad) = langs.iter().find(|l| !language_re().is_match(l)) {
            return Err(ValidationError {
                kind: "language",
                value: bad.clone(),
            });
        }
        Ok(Self(langs))
    }
}

impl From<LanguagePriority> for Vec<String> {
    fn from(value: LanguagePriority) -> Self {
        value.0
    }
}

impl Default for LanguagePriority {
    fn default() -> Self {
        Self(vec!["es".to_string(), "en".to_string()])
    }
}

/// Check a single language code (also used for Wikipedia site prefixes)
pub fn is_valid_language(code: &str) -> bool {
    language_re().is_match(code)
}

/// One row of the subject list; the unit of orchestration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub subject: EntityRef,
    pub wiki_title: Option<String>,
    pub class_name: String,
}

impl SubjectRecord {
    pub fn new(subject: EntityRef, class_name: impl Into<String>) -> Self {
        Self {
            subject,
            wiki_title: None,
            class_name: class_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_validation() {
        assert!(EntityRef::parse("Q42").is_some());
        assert!(EntityRef::parse("Q").is_none());
        assert!(EntityRef::parse("q42").is_none());
        assert!(EntityRef::parse("P31").is_none());
        assert!(EntityRef::parse("Q42 } . ?x ?y ?z").is_none());
        assert!(" Q42".parse::<EntityRef>().is_err());
    }

    #[test]
    fn test_property_ref_validation() {
        assert!(PropertyRef::parse("P31").is_some());
        assert!(PropertyRef::parse("Q31").is_none());
        assert!(PropertyRef::parse("P31a").is_none());
    }

    #[test]
    fn test_from_iri() {
        let q = EntityRef::from_iri("http://www.wikidata.org/entity/Q30").unwrap();
        assert_eq!(q.as_str(), "Q30");

        let p = PropertyRef::from_iri("http://www.wikidata.org/prop/direct/P17").unwrap();
        assert_eq!(p.as_str(), "P17");

        assert!(EntityRef::from_iri("http://commons.wikimedia.org/wiki/Special:FilePath/x.jpg").is_none());
    }

    #[test]
    fn test_entity_ref_serde_rejects_malformed() {
        let ok: EntityRef = serde_json::from_str("\"Q5\"").unwrap();
        assert_eq!(ok.as_str(), "Q5");
        assert!(serde_json::from_str::<EntityRef>("\"Z5\"").is_err());
    }

    #[test]
    fn test_language_priority() {
        let langs = LanguagePriority::parse("fr, en").unwrap();
        assert_eq!(langs.to_service_param(), "fr,en");

        assert!(LanguagePriority::parse("").is_err());
        assert!(LanguagePriority::parse("es,\"en").is_err());
        assert_eq!(LanguagePriority::default().to_service_param(), "es,en");
    }
}
