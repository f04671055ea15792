//! The legacy routing config shape, read but never written.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfigV1 {
    pub tiers: BTreeMap<String, TierEntryV1>,
    #[serde(default)]
    pub classifier: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierEntryV1 {
    pub target_model: String,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    pub failover_model: Option<String>,
}
