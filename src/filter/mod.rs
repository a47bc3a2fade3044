//! Country-membership filter
//!
//! Decides which candidate entities relate to a target country through a
//! cascade of three increasingly expensive SPARQL passes. Each pass only sees
//! what the previous passes left unresolved, and uses a smaller batch so the
//! heavier query shapes stay within the endpoint's time limits.
//!
//! Membership is best effort: an entity tied to the country only through
//! longer chains than the ones encoded here is reported as not a member.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::models::EntityRef;
use crate::sparql::{QueryExecutor, QueryKind, SparqlQuery, SparqlResults};
use crate::utils::error::{ConfigError, QueryError};

/// Batch sizes for the three cascade passes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Pass 1 (nationality / country)
    pub batch_direct: usize,

    /// Pass 2 (administrative containment)
    pub batch_containment: usize,

    /// Pass 3 (headquarters / location)
    pub batch_indirect: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            batch_direct: 40,
            batch_containment: 10,
            batch_indirect: 8,
        }
    }
}

impl FilterConfig {
    /// Batches must be non-increasing across passes and at least 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_indirect == 0 {
            return Err(ConfigError::invalid(
                "filter.batch_indirect",
                "must be at least 1",
            ));
        }
        if self.batch_containment < self.batch_indirect {
            return Err(ConfigError::invalid(
                "filter.batch_containment",
                "must not be smaller than filter.batch_indirect",
            ));
        }
        if self.batch_direct < self.batch_containment {
            return Err(ConfigError::invalid(
                "filter.batch_direct",
                "must not be smaller than filter.batch_containment",
            ));
        }
        Ok(())
    }
}

/// What a cascade run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Distinct candidates after de-duplication
    pub candidates: usize,
    /// New members found by each pass
    pub direct: usize,
    pub containment: usize,
    pub indirect: usize,
    /// Queries handed to the executor
    pub queries: usize,
}

impl CascadeReport {
    pub fn members(&self) -> usize {
        self.direct + self.containment + self.indirect
    }
}

#[derive(Debug, Clone, Copy)]
enum Pass {
    Direct,
    Containment,
    Indirect,
}

impl Pass {
    const ALL: [Pass; 3] = [Pass::Direct, Pass::Containment, Pass::Indirect];

    fn query(self, batch: &[EntityRef], country: &EntityRef) -> SparqlQuery {
        match self {
            Pass::Direct => SparqlQuery::country_direct(batch, country),
            Pass::Containment => SparqlQuery::country_containment(batch, country),
            Pass::Indirect => SparqlQuery::country_indirect(batch, country),
        }
    }

    fn kind(self) -> QueryKind {
        match self {
            Pass::Direct => QueryKind::CountryDirect,
            Pass::Containment => QueryKind::CountryContainment,
            Pass::Indirect => QueryKind::CountryIndirect,
        }
    }
}

/// Three-pass country-membership cascade
pub struct CountryMembershipFilter<'a, Q: QueryExecutor + ?Sized> {
    executor: &'a Q,
    config: FilterConfig,
}

impl<'a, Q: QueryExecutor + ?Sized> CountryMembershipFilter<'a, Q> {
    pub fn new(executor: &'a Q, config: FilterConfig) -> Self {
        Self { executor, config }
    }

    /// Members of `candidates` related to `country`
    ///
    /// The result is always a subset of `candidates`.
    pub async fn filter(
        &self,
        candidates: &[EntityRef],
        country: &EntityRef,
    ) -> Result<BTreeSet<EntityRef>, QueryError> {
        self.filter_with_report(candidates, country)
            .await
            .map(|(members, _)| members)
    }

    /// Same as [`filter`](Self::filter), plus per-pass counts
    pub async fn filter_with_report(
        &self,
        candidates: &[EntityRef],
        country: &EntityRef,
    ) -> Result<(BTreeSet<EntityRef>, CascadeReport), QueryError> {
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut remaining: Vec<EntityRef> = candidates
            .iter()
            .filter(|c| seen.insert(*c))
            .cloned()
            .collect();

        let mut report = CascadeReport {
            candidates: remaining.len(),
            ..Default::default()
        };
        let mut members = BTreeSet::new();

        for pass in Pass::ALL {
            if remaining.is_empty() {
                break;
            }

            let found = self.run_pass(pass, &remaining, country, &mut report).await?;
            match pass {
                Pass::Direct => report.direct = found.len(),
                Pass::Containment => report.containment = found.len(),
                Pass::Indirect => report.indirect = found.len(),
            }

            tracing::debug!(
                pass = %pass.kind(),
                checked = remaining.len(),
                matched = found.len(),
                "Country pass complete"
            );

            remaining.retain(|c| !found.contains(c));
            members.extend(found);
        }

        Ok((members, report))
    }

    async fn run_pass(
        &self,
        pass: Pass,
        remaining: &[EntityRef],
        country: &EntityRef,
        report: &mut CascadeReport,
    ) -> Result<HashSet<EntityRef>, QueryError> {
        let batch_size = match pass {
            Pass::Direct => self.config.batch_direct,
            Pass::Containment => self.config.batch_containment,
            Pass::Indirect => self.config.batch_indirect,
        }
        .max(1);

        let mut found = HashSet::new();
        for batch in remaining.chunks(batch_size) {
            report.queries += 1;
            let json = self.executor.execute(&pass.query(batch, country)).await?;
            let results = SparqlResults::from_value(&json)?;

            found.extend(
                results
                    .column("o")
                    .filter_map(EntityRef::from_iri)
                    .filter(|id| batch.contains(id)),
            );
        }
        Ok(found)
    }
}
