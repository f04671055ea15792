//! Property: migrating a v1 routing config is deterministic — running the
//! same migration twice over the same input yields byte-identical v2 output
//! and an identical change-detection hash, so a reload that re-reads an
//! already-migrated file never spuriously looks "changed".

use gateway_routing::{migrate_v1_to_v2, migration_marker, RoutingConfigV1, TierEntryV1};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn model_name() -> impl Strategy<Value = String> {
    "[a-z]{3,10}-[a-z]{3,8}"
}

fn tier_entry() -> impl Strategy<Value = TierEntryV1> {
    (
        model_name(),
        proptest::collection::vec(model_name(), 0..4),
        proptest::option::of(model_name()),
    )
        .prop_map(|(target_model, fallback_models, failover_model)| TierEntryV1 {
            target_model,
            fallback_models,
            failover_model,
        })
}

fn routing_config_v1() -> impl Strategy<Value = RoutingConfigV1> {
    proptest::collection::btree_map("[a-z]{3,8}", tier_entry(), 0..5)
        .prop_map(|tiers| RoutingConfigV1 { tiers, classifier: BTreeMap::new() })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn migrating_the_same_config_twice_is_identical(v1 in routing_config_v1()) {
        let first = migrate_v1_to_v2(v1.clone());
        let second = migrate_v1_to_v2(v1);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(migration_marker(&first), migration_marker(&second));
    }

    #[test]
    fn migration_never_duplicates_a_model_within_a_tier(v1 in routing_config_v1()) {
        let v2 = migrate_v1_to_v2(v1);
        for tier in v2.tiers.values() {
            let mut seen = std::collections::HashSet::new();
            for model in &tier.models {
                prop_assert!(seen.insert(model), "duplicate model {model} in a migrated tier");
            }
        }
    }

    #[test]
    fn every_tier_keeps_its_target_model_first(v1 in routing_config_v1()) {
        let original_targets: BTreeMap<String, String> = v1
            .tiers
            .iter()
            .map(|(tier, entry)| (tier.clone(), entry.target_model.clone()))
            .collect();
        let v2 = migrate_v1_to_v2(v1);
        for (tier, target) in original_targets {
            prop_assert_eq!(v2.tiers[&tier].models.first().cloned(), Some(target));
        }
    }
}
