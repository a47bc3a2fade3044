//! Human-readable labels in language-priority order

use crate::models::{EntityRef, LabelMap, LanguagePriority};
use crate::sparql::{QueryExecutor, SparqlQuery, SparqlResults};
use crate::utils::error::QueryError;

/// Default number of entities per label query
pub const DEFAULT_LABEL_BATCH: usize = 200;

pub struct LabelResolver<'a, Q: QueryExecutor + ?Sized> {
    executor: &'a Q,
    batch_size: usize,
}

impl<'a, Q: QueryExecutor + ?Sized> LabelResolver<'a, Q> {
    pub fn new(executor: &'a Q) -> Self {
        Self::with_batch_size(executor, DEFAULT_LABEL_BATCH)
    }

    pub fn with_batch_size(executor: &'a Q, batch_size: usize) -> Self {
        Self {
            executor,
            batch_size: batch_size.max(1),
        }
    }

    /// Labels for `ids`; entities the service has no label for are left out
    ///
    /// The label service echoes the bare id when no language in the priority
    /// list has a label; those echoes are not labels.
    pub async fn labels(
        &self,
        ids: &[EntityRef],
        languages: &LanguagePriority,
    ) -> Result<LabelMap, QueryError> {
        let mut unique: Vec<EntityRef> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        let mut labels = LabelMap::new();
        for chunk in unique.chunks(self.batch_size) {
            let json = self
                .executor
                .execute(&SparqlQuery::labels(chunk, languages))
                .await?;
            let results = SparqlResults::from_value(&json)?;

            for binding in results.bindings() {
                let Some(id) = binding.get("x").and_then(|x| EntityRef::from_iri(&x.value)) else {
                    continue;
                };
                let Some(label) = binding.get("xLabel").map(|l| l.value.trim()) else {
                    continue;
                };
                if label.is_empty() || label == id.as_str() {
                    continue;
                }
                labels.insert(id, label.to_string());
            }
        }

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::QueryKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct LabelService {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl QueryExecutor for LabelService {
        async fn execute(&self, query: &SparqlQuery) -> Result<Value, QueryError> {
            assert_eq!(query.kind(), QueryKind::Labels);
            self.batches.lock().unwrap().push(query.values().len());
            let bindings: Vec<Value> = query
                .values()
                .iter()
                .map(|q| {
                    // Q2 has no label in any requested language
                    let label = if q.as_str() == "Q2" {
                        q.to_string()
                    } else {
                        format!("Label {q}")
                    };
                    json!({
                        "x": {"type": "uri", "value": format!("http://www.wikidata.org/entity/{q}")},
                        "xLabel": {"type": "literal", "value": label}
                    })
                })
                .collect();
            Ok(json!({"results": {"bindings": bindings}}))
        }
    }

    fn q(id: &str) -> EntityRef {
        EntityRef::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_labels_batched_and_partial() {
        let service = LabelService {
            batches: Mutex::new(Vec::new()),
        };
        let resolver = LabelResolver::with_batch_size(&service, 2);

        let labels = resolver
            .labels(
                &[q("Q1"), q("Q2"), q("Q1"), q("Q3")],
                &LanguagePriority::default(),
            )
            .await
            .unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[&q("Q1")], "Label Q1");
        assert!(!labels.contains_key(&q("Q2")));
        assert_eq!(*service.batches.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_no_ids_no_queries() {
        let service = LabelService {
            batches: Mutex::new(Vec::new()),
        };
        let labels = LabelResolver::new(&service)
            .labels(&[], &LanguagePriority::default())
            .await
            .unwrap();
        assert!(labels.is_empty());
        assert!(service.batches.lock().unwrap().is_empty());
    }
}
