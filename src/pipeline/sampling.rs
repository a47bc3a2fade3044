//! Subject sampling per class
//!
//! Builds a subject list from the seed occupations of each class: people
//! with one of those occupations, citizenship in the target country and an
//! article in the chosen Wikipedia edition.

use std::collections::HashSet;
use std::time::Instant;

use crate::config::ClassConfig;
use crate::error::{Result, WdgraphErrorTrait};
use crate::models::{is_valid_language, EntityRef, LanguagePriority, SubjectRecord};
use crate::sparql::{QueryExecutor, SparqlQuery, SparqlResults};
use crate::utils::error::ValidationError;

pub struct SubjectSampler<'a, Q: QueryExecutor + ?Sized> {
    executor: &'a Q,
    languages: LanguagePriority,
    wiki_lang: String,
    limit_per_class: usize,
}

impl<'a, Q: QueryExecutor + ?Sized> SubjectSampler<'a, Q> {
    pub fn new(
        executor: &'a Q,
        languages: LanguagePriority,
        wiki_lang: impl Into<String>,
        limit_per_class: usize,
    ) -> Self {
        Self {
            executor,
            languages,
            wiki_lang: wiki_lang.into(),
            limit_per_class,
        }
    }

    /// Sample subjects for every class that lists occupations
    ///
    /// A class whose query fails is logged and skipped. Each subject appears
    /// once, under the first class that produced it.
    pub async fn sample(
        &self,
        classes: &ClassConfig,
        country: &EntityRef,
    ) -> Result<Vec<SubjectRecord>> {
        if !is_valid_language(&self.wiki_lang) {
            return Err(ValidationError {
                kind: "language",
                value: self.wiki_lang.clone(),
            }
            .into());
        }

        tracing::info!(
            country = %country,
            wiki_lang = %self.wiki_lang,
            classes = classes.len(),
            "Sampling subjects per class"
        );

        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for (class_name, spec) in classes.iter() {
            if spec.occupations.is_empty() {
                tracing::debug!(class = %class_name, "No occupations, skipping class");
                continue;
            }

            let started = Instant::now();
            let found = match self.sample_class(class_name, &spec.occupations, country).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(
                        class = %class_name,
                        category = %e.category(),
                        error = %e,
                        "Class sampling failed, skipping"
                    );
                    continue;
                }
            };

            let total = found.len();
            let mut added = 0;
            for row in found {
                if seen.insert(row.subject.clone()) {
                    rows.push(row);
                    added += 1;
                }
            }

            tracing::info!(
                class = %class_name,
                found = total,
                added,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Class sampled"
            );
        }

        Ok(rows)
    }

    async fn sample_class(
        &self,
        class_name: &str,
        occupations: &[EntityRef],
        country: &EntityRef,
    ) -> Result<Vec<SubjectRecord>> {
        let query = SparqlQuery::subjects_by_occupation(
            occupations,
            country,
            &self.wiki_lang,
            &self.languages,
            self.limit_per_class,
        )?;

        let json = self.executor.execute(&query).await?;
        let results = SparqlResults::from_value(&json)?;

        Ok(results
            .bindings()
            .iter()
            .filter_map(|b| {
                let subject = EntityRef::from_iri(&b.get("person")?.value)?;
                let wiki_title = b
                    .get("article")
                    .and_then(|a| a.value.rsplit('/').next())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                Some(SubjectRecord {
                    subject,
                    wiki_title,
                    class_name: class_name.to_string(),
                })
            })
            .collect())
    }
}
