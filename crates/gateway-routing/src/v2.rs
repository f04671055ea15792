//! The current routing config shape: each tier is just an ordered model list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub models: Vec<String>,
}

/// `BTreeMap` rather than `HashMap` so serialization order is stable without
/// a separate canonicalization pass before hashing (see [`crate::marker`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfigV2 {
    pub schema_version: u32,
    pub tiers: BTreeMap<String, TierConfig>,
    /// Incoming `model` string → tier name.
    pub classifier: BTreeMap<String, String>,
}

impl RoutingConfigV2 {
    pub const CURRENT_SCHEMA_VERSION: u32 = 2;

    pub fn tier_for(&self, original_model: &str) -> Option<&str> {
        self.classifier.get(original_model).map(String::as_str)
    }

    pub fn preferred_model(&self, tier: &str) -> Option<&str> {
        self.tiers.get(tier)?.models.first().map(String::as_str)
    }
}
