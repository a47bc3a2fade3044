//! SPARQL 1.1 JSON results decoding

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::utils::error::QueryError;

/// `application/sparql-results+json` document
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    pub results: ResultSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Variable name -> bound value for one solution
pub type Binding = HashMap<String, BindingValue>;

#[derive(Debug, Clone, Deserialize)]
pub struct BindingValue {
    /// `uri`, `literal` or `bnode`
    #[serde(rename = "type")]
    pub kind: String,

    pub value: String,

    #[serde(rename = "xml:lang", default)]
    pub lang: Option<String>,
}

impl SparqlResults {
    pub fn from_value(value: &Value) -> Result<Self, QueryError> {
        Self::deserialize(value).map_err(|e| QueryError::MalformedResponse(e.to_string()))
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.results.bindings
    }

    /// Values bound to `var` across all solutions, skipping unbound rows
    pub fn column<'a>(&'a self, var: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.results
            .bindings
            .iter()
            .filter_map(move |b| b.get(var).map(|v| v.value.as_str()))
    }
}
