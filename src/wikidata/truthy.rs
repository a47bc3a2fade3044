//! Truthy outgoing edges of a subject

use crate::models::{Edge, EntityRef, PropertyRef};
use crate::sparql::{QueryExecutor, SparqlQuery, SparqlResults};
use crate::utils::error::QueryError;

/// Retrieves direct-claim statements whose object is another Wikidata item
pub struct TruthyEdgeExtractor<'a, Q: QueryExecutor + ?Sized> {
    executor: &'a Q,
}

impl<'a, Q: QueryExecutor + ?Sized> TruthyEdgeExtractor<'a, Q> {
    pub fn new(executor: &'a Q) -> Self {
        Self { executor }
    }

    /// Edges of `subject`, in response order
    ///
    /// Every pair is checked again against the strict identifier patterns;
    /// anything that does not conform is dropped.
    pub async fn edges_for(&self, subject: &EntityRef) -> Result<Vec<Edge>, QueryError> {
        let json = self
            .executor
            .execute(&SparqlQuery::truthy_edges(subject))
            .await?;
        let results = SparqlResults::from_value(&json)?;

        let total = results.bindings().len();
        let edges: Vec<Edge> = results
            .bindings()
            .iter()
            .filter_map(|b| {
                let property = PropertyRef::from_iri(&b.get("p")?.value)?;
                let object = EntityRef::from_iri(&b.get("o")?.value)?;
                Some(Edge::new(property, object))
            })
            .collect();

        if edges.len() < total {
            tracing::debug!(
                subject = %subject,
                dropped = total - edges.len(),
                "Dropped non-conforming edges"
            );
        }

        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::QueryKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Canned(Value);

    #[async_trait]
    impl QueryExecutor for Canned {
        async fn execute(&self, query: &SparqlQuery) -> Result<Value, QueryError> {
            assert_eq!(query.kind(), QueryKind::TruthyEdges);
            Ok(self.0.clone())
        }
    }

    fn row(p: &str, o: &str) -> Value {
        json!({
            "p": {"type": "uri", "value": p},
            "o": {"type": "uri", "value": o}
        })
    }

    #[tokio::test]
    async fn test_edges_are_revalidated() {
        let executor = Canned(json!({"results": {"bindings": [
            row("http://www.wikidata.org/prop/direct/P27", "http://www.wikidata.org/entity/Q30"),
            row("http://www.wikidata.org/prop/direct/P106", "http://www.wikidata.org/entity/Q82955"),
            row("http://www.wikidata.org/prop/direct/P18", "http://commons.wikimedia.org/wiki/Special:FilePath/a.jpg"),
            row("http://schema.org/about", "http://www.wikidata.org/entity/Q1"),
            row("http://www.wikidata.org/prop/direct/P31", "http://www.wikidata.org/entity/L123"),
        ]}}));

        let subject = EntityRef::parse("Q42").unwrap();
        let edges = TruthyEdgeExtractor::new(&executor)
            .edges_for(&subject)
            .await
            .unwrap();

        let pairs: Vec<_> = edges
            .iter()
            .map(|e| (e.property.as_str(), e.object.as_str()))
            .collect();
        assert_eq!(pairs, vec![("P27", "Q30"), ("P106", "Q82955")]);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let executor = Canned(json!({"results": {"bindings": []}}));
        let subject = EntityRef::parse("Q42").unwrap();
        let edges = TruthyEdgeExtractor::new(&executor)
            .edges_for(&subject)
            .await
            .unwrap();
        assert!(edges.is_empty());
    }
}
