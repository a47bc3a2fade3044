//! Country, class and project documents
//!
//! These YAML documents accept a few alternate spellings for the same key
//! (`classes`/`clases`, `occupations`/`ocupaciones`, `props`/`weights`).
//! They are normalized into one schema here, at load time, and validated once.

use serde::Deserialize;
use serde_yaml_ng::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::models::{EntityRef, PropertyRef};
use crate::utils::error::ConfigError;

/// Identifier used when neither the project nor the country document names one
pub const FALLBACK_COUNTRY: &str = "Q30";

/// Weight assumed for properties absent from a class weight table
pub const DEFAULT_PROPERTY_WEIGHT: f64 = 0.5;

fn read_document(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_error(path: &Path, err: impl ToString) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn entity(field: &str, value: &str) -> Result<EntityRef, ConfigError> {
    EntityRef::parse(value.trim())
        .ok_or_else(|| ConfigError::invalid(field, format!("'{value}' is not an entity id")))
}

// ============================================================================
// Countries
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCountries {
    countries: Option<HashMap<String, String>>,
    aliases: Option<HashMap<String, String>>,
    default: Option<String>,
}

/// Country lookup tables; read-only after load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryConfig {
    /// Exact display name -> identifier
    pub names: HashMap<String, EntityRef>,

    /// Lower-cased alias -> identifier
    pub aliases: HashMap<String, EntityRef>,

    /// Identifier used when nothing else is configured
    pub default: EntityRef,
}

impl CountryConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_document(path)?;
        Self::from_yaml_str(&content, path)
    }

    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawCountries =
            serde_yaml_ng::from_str(content).map_err(|e| parse_error(origin, e))?;

        if raw.countries.is_none() && raw.aliases.is_none() && raw.default.is_none() {
            return Err(ConfigError::MissingSection {
                path: origin.to_path_buf(),
                section: "countries".to_string(),
            });
        }

        let names = raw
            .countries
            .unwrap_or_default()
            .into_iter()
            .map(|(name, id)| Ok((name.clone(), entity(&format!("countries.{name}"), &id)?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        let aliases = raw
            .aliases
            .unwrap_or_default()
            .into_iter()
            .map(|(alias, id)| {
                let qid = entity(&format!("aliases.{alias}"), &id)?;
                Ok((alias.trim().to_lowercase(), qid))
            })
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        let default = match raw.default {
            Some(id) => entity("default", &id)?,
            None => EntityRef::parse(FALLBACK_COUNTRY).expect("fallback country id is valid"),
        };

        Ok(Self {
            names,
            aliases,
            default,
        })
    }

    /// Lookup tables with nothing but the fallback default
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
            aliases: HashMap::new(),
            default: EntityRef::parse(FALLBACK_COUNTRY).expect("fallback country id is valid"),
        }
    }
}

// ============================================================================
// Project
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawProject {
    project: Option<RawProjectSection>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProjectSection {
    #[serde(alias = "pais")]
    country: Option<String>,
}

/// Project-level settings; currently only the active country
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Active country by name, alias or identifier
    pub country: Option<String>,
}

impl ProjectConfig {
    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Option<RawProject> =
            serde_yaml_ng::from_str(content).map_err(|e| parse_error(origin, e))?;
        let country = raw
            .and_then(|r| r.project)
            .and_then(|p| p.country)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(Self { country })
    }

    /// The project document is optional; a missing file means no project country
    pub fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = read_document(path)?;
        Self::from_yaml_str(&content, path)
    }
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawClassSpec {
    #[serde(default, alias = "ocupaciones")]
    occupations: Vec<String>,
    #[serde(default, alias = "weights")]
    props: BTreeMap<String, f64>,
    #[serde(default)]
    max_props: Option<usize>,
}

/// Per-class sampling and seeding rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassSpec {
    /// Occupations used to sample subjects for this class
    pub occupations: Vec<EntityRef>,

    /// Inclusion probability per property
    pub weights: BTreeMap<PropertyRef, f64>,

    /// Maximum number of distinct properties kept; no cap when absent
    pub max_props: Option<usize>,
}

impl ClassSpec {
    /// Configured weight, or [`DEFAULT_PROPERTY_WEIGHT`]
    pub fn weight(&self, property: &PropertyRef) -> f64 {
        self.weights
            .get(property)
            .copied()
            .unwrap_or(DEFAULT_PROPERTY_WEIGHT)
    }
}

/// Class name -> [`ClassSpec`], in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassConfig {
    classes: Vec<(String, ClassSpec)>,
}

impl ClassConfig {
    /// Later duplicates of a class name are ignored
    pub fn new(classes: impl IntoIterator<Item = (String, ClassSpec)>) -> Self {
        let mut unique: Vec<(String, ClassSpec)> = Vec::new();
        for (name, spec) in classes {
            if !unique.iter().any(|(n, _)| *n == name) {
                unique.push((name, spec));
            }
        }
        Self { classes: unique }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_document(path)?;
        Self::from_yaml_str(&content, path)
    }

    /// Load when the file exists, `None` otherwise
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Err(ConfigError::MissingSection {
                path: origin.to_path_buf(),
                section: "classes".to_string(),
            });
        }
        let doc: Value = serde_yaml_ng::from_str(content).map_err(|e| parse_error(origin, e))?;

        // `classes:` / `clases:` wrapper, or the bare property-pool layout
        let section = match &doc {
            Value::Mapping(map) => map
                .get("classes")
                .or_else(|| map.get("clases"))
                .cloned()
                .unwrap_or_else(|| doc.clone()),
            _ => Value::Null,
        };

        // the mapping keeps document order; the first class listed wins ties
        let Value::Mapping(map) = section else {
            return Err(ConfigError::MissingSection {
                path: origin.to_path_buf(),
                section: "classes".to_string(),
            });
        };

        if map.is_empty() {
            return Err(ConfigError::MissingSection {
                path: origin.to_path_buf(),
                section: "classes".to_string(),
            });
        }

        let mut classes = Vec::with_capacity(map.len());
        for (key, value) in map {
            let name = match key {
                Value::String(name) => name,
                other => {
                    return Err(ConfigError::invalid(
                        "classes",
                        format!("class name {other:?} is not a string"),
                    ))
                }
            };
            let raw: RawClassSpec =
                serde_yaml_ng::from_value(value).map_err(|e| parse_error(origin, e))?;
            let spec = normalize_class(&name, raw)?;
            classes.push((name, spec));
        }

        Ok(Self::new(classes))
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassSpec> {
        self.classes
            .iter()
            .find(|(name, _)| name == class_name)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClassSpec)> {
        self.classes.iter().map(|(name, spec)| (name, spec))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn normalize_class(name: &str, raw: RawClassSpec) -> Result<ClassSpec, ConfigError> {
    let occupations = raw
        .occupations
        .iter()
        .map(|q| entity(&format!("{name}.occupations"), q))
        .collect::<Result<Vec<_>, _>>()?;

    let mut weights = BTreeMap::new();
    for (prop, weight) in raw.props {
        let field = format!("{name}.props.{prop}");
        let property = PropertyRef::parse(prop.trim())
            .ok_or_else(|| ConfigError::invalid(&field, "not a property id"))?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::invalid(
                field,
                format!("weight {weight} outside [0, 1]"),
            ));
        }
        weights.insert(property, weight);
    }

    Ok(ClassSpec {
        occupations,
        weights,
        max_props: raw.max_props,
    })
}
