//! Change-detection hash for the normalised routing config, so a reload that
//! finds nothing changed skips rewriting the file on disk.

use crate::v2::RoutingConfigV2;

/// `BLAKE3` of the canonical (already-`BTreeMap`-ordered) JSON encoding.
/// Stable under key reordering in the source file since `RoutingConfigV2`
/// only ever serializes via its `BTreeMap` fields.
pub fn migration_marker(config: &RoutingConfigV2) -> String {
    let canonical = serde_json::to_vec(config).expect("routing config serializes");
    blake3::hash(&canonical).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v2::TierConfig;
    use std::collections::BTreeMap;

    fn config() -> RoutingConfigV2 {
        let mut tiers = BTreeMap::new();
        tiers.insert("fast".to_string(), TierConfig { models: vec!["a".into(), "b".into()] });
        let mut classifier = BTreeMap::new();
        classifier.insert("gpt-4".to_string(), "fast".to_string());
        RoutingConfigV2 { schema_version: 2, tiers, classifier }
    }

    #[test]
    fn identical_configs_hash_identically() {
        assert_eq!(migration_marker(&config()), migration_marker(&config()));
    }

    #[test]
    fn a_changed_model_list_changes_the_hash() {
        let mut changed = config();
        changed.tiers.get_mut("fast").unwrap().models.push("c".into());
        assert_ne!(migration_marker(&config()), migration_marker(&changed));
    }
}
