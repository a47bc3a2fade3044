//! Weighted per-class property sampling
//!
//! Keeps a random subset of a subject's properties. Every edge of a kept
//! property is kept, so a sampled graph never splits a property.

use rand::Rng;

use crate::config::ClassConfig;
use crate::models::{Edge, PropertyRef};

/// Property sampler; randomness comes from the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertySampler;

impl PropertySampler {
    pub fn new() -> Self {
        Self
    }

    /// Sample `edges` with the weights configured for `class_name`
    ///
    /// Edges pass through untouched when there is no configuration for the
    /// class. Properties are tried from the highest weight down; a property
    /// is kept when a uniform draw does not exceed its weight, until
    /// `max_props` properties are kept. If no property survives, the first
    /// `max_props` edges are returned instead.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        edges: &[Edge],
        class_name: &str,
        classes: Option<&ClassConfig>,
        rng: &mut R,
    ) -> Vec<Edge> {
        let Some(spec) = classes.and_then(|c| c.get(class_name)) else {
            return edges.to_vec();
        };
        let max_props = spec.max_props.unwrap_or(usize::MAX);
        if max_props == 0 {
            return Vec::new();
        }

        // properties in order of first appearance
        let mut properties: Vec<&PropertyRef> = Vec::new();
        for edge in edges {
            if !properties.contains(&&edge.property) {
                properties.push(&edge.property);
            }
        }

        // stable, so ties keep first-appearance order
        properties.sort_by(|a, b| spec.weight(b).total_cmp(&spec.weight(a)));

        let mut chosen: Vec<&PropertyRef> = Vec::new();
        for property in properties {
            if chosen.len() >= max_props {
                break;
            }
            if rng.gen::<f64>() <= spec.weight(property) {
                chosen.push(property);
            }
        }

        if chosen.is_empty() {
            let keep = max_props.min(edges.len());
            tracing::debug!(class = class_name, keep, "No property drawn, keeping leading edges");
            return edges[..keep].to_vec();
        }

        edges
            .iter()
            .filter(|e| chosen.contains(&&e.property))
            .cloned()
            .collect()
    }
}
