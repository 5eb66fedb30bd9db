pub mod rayon_pool;

use crate::error::ConfigError;
use crate::models::{Body, Candidate, CategoryKey};
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Thresholds and names for the shard-site search. Defaults are the
/// community criteria for crystalline shard sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Strict lower bound on distance from the arrival star (ls).
    pub min_arrival_distance: f64,
    /// Inclusive upper bound on surface temperature (K).
    pub max_surface_temperature: f64,
    pub excluded_volcanism: String,
    pub required_materials: Vec<String>,
    /// Parent-chain label naming the body a candidate must orbit.
    pub parent_label: String,
    pub category_type: String,
    /// Case-insensitive regex matched against `subType`.
    pub category_subtype_pattern: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_arrival_distance: 12_000.0,
            max_surface_temperature: 220.0,
            excluded_volcanism: "No volcanism".into(),
            required_materials: ["Ruthenium", "Antimony", "Yttrium", "Technetium", "Polonium", "Tellurium"]
                .into_iter()
                .map(String::from)
                .collect(),
            parent_label: "Planet".into(),
            category_type: "Planet".into(),
            category_subtype_pattern: "gas giant".into(),
        }
    }
}

impl FilterCriteria {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_arrival_distance.is_finite() || self.min_arrival_distance < 0.0 {
            return Err(ConfigError::OutOfRange { field: "min_arrival_distance", detail: self.min_arrival_distance.to_string() });
        }
        if !self.max_surface_temperature.is_finite() {
            return Err(ConfigError::OutOfRange { field: "max_surface_temperature", detail: self.max_surface_temperature.to_string() });
        }
        if self.required_materials.is_empty() {
            return Err(ConfigError::Missing("required_materials"));
        }
        if self.parent_label.is_empty() {
            return Err(ConfigError::Missing("parent_label"));
        }
        if self.category_subtype_pattern.is_empty() {
            return Err(ConfigError::Missing("category_subtype_pattern"));
        }
        self.compile().map(|_| ())
    }

    pub fn compile(&self) -> Result<CompiledCriteria<'_>, ConfigError> {
        let subtype = RegexBuilder::new(&self.category_subtype_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::Invalid { field: "category_subtype_pattern", detail: e.to_string() })?;
        Ok(CompiledCriteria { criteria: self, subtype })
    }
}

/// Criteria with the subtype pattern compiled; shared by all workers of a run.
#[derive(Debug, Clone)]
pub struct CompiledCriteria<'a> {
    criteria: &'a FilterCriteria,
    subtype: Regex,
}

impl CompiledCriteria<'_> {
    /// Landable, far from the arrival star, volcanic, cold, and carrying a wanted material.
    pub fn is_candidate(&self, body: &Body) -> bool {
        let c = self.criteria;
        body.is_landable
            && body.distance_to_arrival > c.min_arrival_distance
            && !body.volcanism_type.is_empty()
            && body.volcanism_type != c.excluded_volcanism
            && body.surface_temperature <= c.max_surface_temperature
            && body.has_any_material(&c.required_materials)
    }

    /// Whether the body itself belongs to the parent category (e.g. a gas giant).
    pub fn is_category_member(&self, body: &Body) -> bool {
        body.body_type == self.criteria.category_type && self.subtype.is_match(&body.sub_type)
    }
}

/// Completed set of category members. Only produced once the builder has
/// drained every key, so holding one means no further writes can happen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    members: HashSet<CategoryKey>,
}

impl CategoryRegistry {
    pub fn contains(&self, key: &CategoryKey) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the candidate's nearest `parent_label` parent is a member.
    pub fn admits(&self, candidate: &Candidate, parent_label: &str) -> bool {
        candidate
            .body
            .parent_id(parent_label)
            .is_some_and(|parent| self.contains(&CategoryKey::new(candidate.body.system_id, parent)))
    }
}

impl FromIterator<CategoryKey> for CategoryRegistry {
    fn from_iter<I: IntoIterator<Item = CategoryKey>>(iter: I) -> Self {
        Self { members: iter.into_iter().collect() }
    }
}

/// Accumulates keys on the single aggregator thread; `finish` freezes it.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    members: HashSet<CategoryKey>,
}

impl RegistryBuilder {
    pub fn insert(&mut self, key: CategoryKey) -> bool {
        self.members.insert(key)
    }

    pub fn finish(self) -> CategoryRegistry {
        CategoryRegistry { members: self.members }
    }
}

/// Distance ascending, arrival distance ascending, gravity descending.
/// Identity fields break any remaining tie so the order is total.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.body.distance_to_arrival.total_cmp(&b.body.distance_to_arrival))
        .then_with(|| b.body.gravity.total_cmp(&a.body.gravity))
        .then_with(|| a.body.system_id.cmp(&b.body.system_id))
        .then_with(|| a.body.body_id.cmp(&b.body.body_id))
        .then_with(|| a.body.id.cmp(&b.body.id))
}

/// Keep candidates orbiting a registered body.
pub fn post_join(candidates: Vec<Candidate>, registry: &CategoryRegistry, parent_label: &str) -> Vec<Candidate> {
    if !rayon_pool::worth_parallel(candidates.len()) {
        return candidates.into_iter().filter(|c| registry.admits(c, parent_label)).collect();
    }
    rayon_pool::install(|| {
        candidates
            .into_par_iter()
            .filter(|c| registry.admits(c, parent_label))
            .collect()
    })
}

/// Stable in both paths, so small and large inputs order ties the same way.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    if rayon_pool::worth_parallel(candidates.len()) {
        rayon_pool::install(|| candidates.par_sort_by(compare_candidates));
    } else {
        candidates.sort_by(compare_candidates);
    }
}
