//! The live, swappable routing table the forwarder resolves models through.

use crate::v2::RoutingConfigV2;
use gateway_forwarder::routing::{MappedModel, ModelRouter};
use parking_lot::RwLock;

pub struct TableRouter {
    table: RwLock<RoutingConfigV2>,
}

impl TableRouter {
    pub fn new(config: RoutingConfigV2) -> Self {
        Self { table: RwLock::new(config) }
    }

    /// Swaps in a freshly loaded config, used on hot-reload.
    pub fn swap(&self, config: RoutingConfigV2) {
        *self.table.write() = config;
    }

    /// A clone of the live table, for read-only surfaces like `/models`.
    pub fn snapshot(&self) -> RoutingConfigV2 {
        self.table.read().clone()
    }
}

impl ModelRouter for TableRouter {
    fn resolve(&self, original_model: &str) -> Option<MappedModel> {
        let table = self.table.read();
        let tier = table.tier_for(original_model)?;
        let mapped_model = table.preferred_model(tier)?;
        Some(MappedModel {
            mapped_model: mapped_model.to_string(),
            tier: tier.to_string(),
            source: "routing_table",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v2::TierConfig;
    use std::collections::BTreeMap;

    fn config() -> RoutingConfigV2 {
        let mut tiers = BTreeMap::new();
        tiers.insert("fast".to_string(), TierConfig { models: vec!["claude-haiku".into(), "claude-sonnet".into()] });
        let mut classifier = BTreeMap::new();
        classifier.insert("gpt-4".to_string(), "fast".to_string());
        RoutingConfigV2 { schema_version: 2, tiers, classifier }
    }

    #[test]
    fn resolves_to_the_tiers_preferred_model() {
        let router = TableRouter::new(config());
        let mapped = router.resolve("gpt-4").unwrap();
        assert_eq!(mapped.mapped_model, "claude-haiku");
        assert_eq!(mapped.tier, "fast");
    }

    #[test]
    fn unclassified_model_resolves_to_none() {
        let router = TableRouter::new(config());
        assert!(router.resolve("unknown-model").is_none());
    }

    #[test]
    fn swap_replaces_the_table_atomically() {
        let router = TableRouter::new(config());
        let mut updated = config();
        updated.classifier.insert("gpt-4".to_string(), "fast".to_string());
        updated.tiers.get_mut("fast").unwrap().models = vec!["claude-opus".into()];
        router.swap(updated);
        assert_eq!(router.resolve("gpt-4").unwrap().mapped_model, "claude-opus");
    }
}
