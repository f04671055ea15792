//! One-time v1 → v2 normalisation: `{targetModel, fallbackModels[],
//! failoverModel}` becomes a single ordered `models[]` per tier.

use crate::v1::RoutingConfigV1;
use crate::v2::{RoutingConfigV2, TierConfig};

pub fn migrate_v1_to_v2(v1: RoutingConfigV1) -> RoutingConfigV2 {
    let tiers = v1
        .tiers
        .into_iter()
        .map(|(tier, entry)| {
            let mut models = Vec::with_capacity(entry.fallback_models.len() + 2);
            models.push(entry.target_model);
            for fallback in entry.fallback_models {
                if !models.contains(&fallback) {
                    models.push(fallback);
                }
            }
            if let Some(failover) = entry.failover_model {
                if !models.contains(&failover) {
                    models.push(failover);
                }
            }
            (tier, TierConfig { models })
        })
        .collect();

    RoutingConfigV2 {
        schema_version: RoutingConfigV2::CURRENT_SCHEMA_VERSION,
        tiers,
        classifier: v1.classifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1::TierEntryV1;
    use std::collections::BTreeMap;

    #[test]
    fn orders_target_then_fallbacks_then_failover() {
        let mut tiers = BTreeMap::new();
        tiers.insert(
            "fast".to_string(),
            TierEntryV1 {
                target_model: "claude-haiku".into(),
                fallback_models: vec!["claude-sonnet".into()],
                failover_model: Some("claude-opus".into()),
            },
        );
        let v1 = RoutingConfigV1 { tiers, classifier: BTreeMap::new() };
        let v2 = migrate_v1_to_v2(v1);
        assert_eq!(
            v2.tiers["fast"].models,
            vec!["claude-haiku", "claude-sonnet", "claude-opus"]
        );
    }

    #[test]
    fn deduplicates_a_failover_that_repeats_the_target() {
        let mut tiers = BTreeMap::new();
        tiers.insert(
            "fast".to_string(),
            TierEntryV1 {
                target_model: "claude-haiku".into(),
                fallback_models: vec![],
                failover_model: Some("claude-haiku".into()),
            },
        );
        let v1 = RoutingConfigV1 { tiers, classifier: BTreeMap::new() };
        let v2 = migrate_v1_to_v2(v1);
        assert_eq!(v2.tiers["fast"].models, vec!["claude-haiku"]);
    }
}
