//! Country resolution
//!
//! Maps a user or project token (identifier, exact name, alias) to a
//! canonical Wikidata country identifier. Pure function of its
//! configuration; no network access.

use crate::config::{CountryConfig, ProjectConfig};
use crate::models::EntityRef;
use crate::utils::error::ResolutionError;
use crate::utils::slugify;

/// A resolved country plus the names used for output paths and messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCountry {
    /// Canonical identifier
    pub id: EntityRef,

    /// The token as given, or "Default" when the fallback was used
    pub name: String,

    /// Directory-friendly name
    pub slug: String,
}

/// Resolves country tokens against the country and project documents
#[derive(Debug, Clone)]
pub struct CountryResolver {
    countries: CountryConfig,
    project: ProjectConfig,
}

impl CountryResolver {
    pub fn new(countries: CountryConfig, project: ProjectConfig) -> Self {
        Self { countries, project }
    }

    /// Resolve a token to its identifier
    ///
    /// With no token, the project country is used, then the configured default.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::Unknown` if the token (or the project country)
    /// matches no identifier, name, or alias
    pub fn resolve(&self, token: Option<&str>) -> Result<EntityRef, ResolutionError> {
        self.resolve_named(token).map(|country| country.id)
    }

    /// Resolve a token and keep its display name and slug
    pub fn resolve_named(&self, token: Option<&str>) -> Result<ResolvedCountry, ResolutionError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty());

        match token.or(self.project.country.as_deref()) {
            Some(token) => {
                let id = self.resolve_token(token)?;
                let slug = if EntityRef::parse(token).is_some() {
                    id.as_str().to_lowercase()
                } else {
                    slugify(token)
                };
                Ok(ResolvedCountry {
                    id,
                    name: token.to_string(),
                    slug,
                })
            }
            None => {
                let id = self.countries.default.clone();
                tracing::debug!(country = %id, "No country given, using configured default");
                let name = String::from("Default");
                Ok(ResolvedCountry {
                    slug: slugify(&name),
                    name,
                    id,
                })
            }
        }
    }

    /// Identifier, then exact name, then case-insensitive alias
    fn resolve_token(&self, token: &str) -> Result<EntityRef, ResolutionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ResolutionError::Empty);
        }

        if let Some(id) = EntityRef::parse(token) {
            return Ok(id);
        }

        if let Some(id) = self.countries.names.get(token) {
            return Ok(id.clone());
        }

        if let Some(id) = self.countries.aliases.get(&token.to_lowercase()) {
            return Ok(id.clone());
        }

        Err(ResolutionError::Unknown {
            token: token.to_string(),
        })
    }
}
