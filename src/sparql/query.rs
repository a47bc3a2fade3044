//! Parameterized SPARQL queries
//!
//! SPARQL as served by the endpoint has no parameter binding, so every query
//! is rendered from values that already passed the strict identifier checks
//! in [`crate::models`]. Nothing else is ever interpolated.

use std::fmt;

use crate::models::{is_valid_language, EntityRef, LanguagePriority};
use crate::utils::error::ValidationError;

/// What a query asks; lets test doubles answer without parsing SPARQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Direct-claim statements of one subject whose object is an item
    TruthyEdges,
    /// Labels for a batch of items
    Labels,
    /// Cascade pass 1: nationality or country equals the target
    CountryDirect,
    /// Cascade pass 2: 1-3 administrative containment hops to the target
    CountryContainment,
    /// Cascade pass 3: headquarters or location placed in the target
    CountryIndirect,
    /// Humans of given occupations and citizenship with a Wikipedia article
    SubjectSample,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TruthyEdges => "truthy_edges",
            Self::Labels => "labels",
            Self::CountryDirect => "country_direct",
            Self::CountryContainment => "country_containment",
            Self::CountryIndirect => "country_indirect",
            Self::SubjectSample => "subject_sample",
        };
        f.write_str(name)
    }
}

/// A rendered query plus the validated values it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlQuery {
    kind: QueryKind,
    values: Vec<EntityRef>,
    text: String,
}

fn values_block(ids: &[EntityRef]) -> String {
    ids.iter()
        .map(|q| format!("wd:{q}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl SparqlQuery {
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// The entities placed in the query's `VALUES` block
    pub fn values(&self) -> &[EntityRef] {
        &self.values
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Truthy statements of `subject` whose object is a Wikidata item
    pub fn truthy_edges(subject: &EntityRef) -> Self {
        let text = format!(
            r#"SELECT ?p ?o WHERE {{
  VALUES ?s {{ wd:{subject} }}
  ?s ?p ?o .
  ?prop wikibase:directClaim ?p .
  FILTER(isIRI(?o))
  FILTER(STRSTARTS(STR(?o), "http://www.wikidata.org/entity/Q") ||
         STRSTARTS(STR(?o), "https://www.wikidata.org/entity/Q"))
}}"#
        );
        Self {
            kind: QueryKind::TruthyEdges,
            values: vec![subject.clone()],
            text,
        }
    }

    /// Labels for `ids` in the given language priority
    pub fn labels(ids: &[EntityRef], languages: &LanguagePriority) -> Self {
        let text = format!(
            r#"SELECT ?x ?xLabel WHERE {{
  VALUES ?x {{ {values} }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{langs}". }}
}}"#,
            values = values_block(ids),
            langs = languages.to_service_param(),
        );
        Self {
            kind: QueryKind::Labels,
            values: ids.to_vec(),
            text,
        }
    }

    /// Pass 1: `P27` (citizenship) or `P17` (country) equals `country`
    pub fn country_direct(batch: &[EntityRef], country: &EntityRef) -> Self {
        let text = format!(
            r#"SELECT DISTINCT ?o WHERE {{
  VALUES ?o {{ {values} }}
  {{ ?o wdt:P27 wd:{country} . }} UNION {{ ?o wdt:P17 wd:{country} . }}
}}"#,
            values = values_block(batch),
        );
        Self {
            kind: QueryKind::CountryDirect,
            values: batch.to_vec(),
            text,
        }
    }

    /// Pass 2: explicit chains of 1, 2 or 3 `P131` hops ending in `P17 = country`
    ///
    /// Fixed-length chains instead of `P131*` keep the cost predictable on
    /// deep or cyclic containment data.
    pub fn country_containment(batch: &[EntityRef], country: &EntityRef) -> Self {
        let text = format!(
            r#"SELECT DISTINCT ?o WHERE {{
  VALUES ?o {{ {values} }}
  {{
    ?o wdt:P131 ?a1 . ?a1 wdt:P17 wd:{country} .
  }} UNION {{
    ?o wdt:P131 ?a1 . ?a1 wdt:P131 ?a2 . ?a2 wdt:P17 wd:{country} .
  }} UNION {{
    ?o wdt:P131 ?a1 . ?a1 wdt:P131 ?a2 . ?a2 wdt:P131 ?a3 . ?a3 wdt:P17 wd:{country} .
  }}
}}"#,
            values = values_block(batch),
        );
        Self {
            kind: QueryKind::CountryContainment,
            values: batch.to_vec(),
            text,
        }
    }

    /// Pass 3: `P159` (headquarters) or `P276` (location) in a place that is in
    /// `country` directly or through 1-2 `P131` hops
    pub fn country_indirect(batch: &[EntityRef], country: &EntityRef) -> Self {
        let text = format!(
            r#"SELECT DISTINCT ?o WHERE {{
  VALUES ?o {{ {values} }}
  {{
    ?o wdt:P159 ?hq .
    {{ ?hq wdt:P17 wd:{country} . }}
    UNION
    {{ ?hq wdt:P131 ?b1 . ?b1 wdt:P17 wd:{country} . }}
    UNION
    {{ ?hq wdt:P131 ?b1 . ?b1 wdt:P131 ?b2 . ?b2 wdt:P17 wd:{country} . }}
  }}
  UNION
  {{
    ?o wdt:P276 ?place .
    {{ ?place wdt:P17 wd:{country} . }}
    UNION
    {{ ?place wdt:P131 ?c1 . ?c1 wdt:P17 wd:{country} . }}
    UNION
    {{ ?place wdt:P131 ?c1 . ?c1 wdt:P131 ?c2 . ?c2 wdt:P17 wd:{country} . }}
  }}
}}"#,
            values = values_block(batch),
        );
        Self {
            kind: QueryKind::CountryIndirect,
            values: batch.to_vec(),
            text,
        }
    }

    /// Humans with one of `occupations`, citizenship `country`, and an article
    /// on `<wiki_lang>.wikipedia.org`
    pub fn subjects_by_occupation(
        occupations: &[EntityRef],
        country: &EntityRef,
        wiki_lang: &str,
        languages: &LanguagePriority,
        limit: usize,
    ) -> Result<Self, ValidationError> {
        if !is_valid_language(wiki_lang) {
            return Err(ValidationError {
                kind: "language",
                value: wiki_lang.to_string(),
            });
        }

        let text = format!(
            r#"SELECT ?person ?personLabel ?article WHERE {{
  VALUES ?occupation {{ {occupations} }}
  ?person wdt:P31 wd:Q5 ;
          wdt:P27 wd:{country} ;
          wdt:P106 ?occupation .
  ?article schema:about ?person ;
           schema:isPartOf <https://{wiki_lang}.wikipedia.org/> .
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{langs}". }}
}}
LIMIT {limit}"#,
            occupations = values_block(occupations),
            langs = languages.to_service_param(),
        );
        Ok(Self {
            kind: QueryKind::SubjectSample,
            values: occupations.to_vec(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str) -> EntityRef {
        EntityRef::parse(id).unwrap()
    }

    #[test]
    fn test_country_direct_renders_values() {
        let query = SparqlQuery::country_direct(&[q("Q1"), q("Q2")], &q("Q30"));
        assert_eq!(query.kind(), QueryKind::CountryDirect);
        assert!(query.text().contains("VALUES ?o { wd:Q1 wd:Q2 }"));
        assert!(query.text().contains("wdt:P27 wd:Q30"));
        assert!(query.text().contains("wdt:P17 wd:Q30"));
        assert_eq!(query.values(), &[q("Q1"), q("Q2")]);
    }

    #[test]
    fn test_containment_uses_explicit_hops() {
        let query = SparqlQuery::country_containment(&[q("Q1")], &q("Q183"));
        assert!(!query.text().contains("P131*"));
        assert!(query.text().contains("?a3 wdt:P17 wd:Q183"));
        assert_eq!(query.text().matches("UNION").count(), 2);
    }

    #[test]
    fn test_indirect_covers_hq_and_location() {
        let query = SparqlQuery::country_indirect(&[q("Q1")], &q("Q30"));
        assert!(query.text().contains("wdt:P159 ?hq"));
        assert!(query.text().contains("wdt:P276 ?place"));
        assert!(query.text().contains("?c2 wdt:P17 wd:Q30"));
    }

    #[test]
    fn test_labels_language_param() {
        let langs = LanguagePriority::parse("fr,en").unwrap();
        let query = SparqlQuery::labels(&[q("Q5")], &langs);
        assert!(query.text().contains(r#"wikibase:language "fr,en""#));
    }

    #[test]
    fn test_subject_sample_rejects_bad_site() {
        let langs = LanguagePriority::default();
        let err = SparqlQuery::subjects_by_occupation(&[q("Q82955")], &q("Q29"), "es/>", &langs, 10);
        assert!(err.is_err());

        let ok = SparqlQuery::subjects_by_occupation(&[q("Q82955")], &q("Q29"), "es", &langs, 10)
            .unwrap();
        assert!(ok.text().contains("<https://es.wikipedia.org/>"));
        assert!(ok.text().ends_with("LIMIT 10"));
    }

    #[test]
    fn test_same_inputs_same_text() {
        let a = SparqlQuery::truthy_edges(&q("Q42"));
        let b = SparqlQuery::truthy_edges(&q("Q42"));
        assert_eq!(a.text(), b.text());
    }
}
