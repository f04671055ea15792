//! Loads a routing config file, migrating v1 → v2 on first read and
//! skipping the rewrite on subsequent loads once the marker matches.
//!
//! File-watching itself is `gateway-config`'s job (it owns the `notify`
//! debounce loop for both the credential file and this one); this module is
//! the pure load-and-migrate step it calls into, mirroring how
//! `gateway-pool::reload` is the pure diff step behind the same watch loop.

use crate::marker::migration_marker;
use crate::migrate::migrate_v1_to_v2;
use crate::v1::RoutingConfigV1;
use crate::v2::RoutingConfigV2;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default)]
struct MarkerFile {
    hash: String,
}

#[derive(Debug)]
pub struct LoadedRouting {
    pub config: RoutingConfigV2,
    pub migrated_from_v1: bool,
    pub rewrote_file: bool,
}

fn marker_path(config_path: &Path) -> PathBuf {
    let mut name = config_path.as_os_str().to_os_string();
    name.push(".migrated");
    PathBuf::from(name)
}

fn looks_like_v2(value: &serde_json::Value) -> bool {
    value
        .get("tiers")
        .and_then(|t| t.as_object())
        .and_then(|tiers| tiers.values().next())
        .map(|tier| tier.get("models").is_some())
        .unwrap_or(true) // an empty tier map has no shape to disambiguate; default to v2
}

pub fn load(config_path: &Path) -> io::Result<LoadedRouting> {
    let raw = std::fs::read(config_path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let (config, migrated_from_v1) = if looks_like_v2(&value) {
        let config: RoutingConfigV2 = serde_json::from_value(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        (config, false)
    } else {
        let v1: RoutingConfigV1 = serde_json::from_value(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        (migrate_v1_to_v2(v1), true)
    };

    let hash = migration_marker(&config);
    let marker_file_path = marker_path(config_path);
    let previous = gateway_persistence::atomic_read::<MarkerFile>(&marker_file_path);

    let rewrote_file = if migrated_from_v1 && previous.hash != hash {
        write_v2_atomically(config_path, &config)?;
        gateway_persistence::atomic_write(&marker_file_path, 1, &MarkerFile { hash })?;
        true
    } else {
        false
    };

    Ok(LoadedRouting { config, migrated_from_v1, rewrote_file })
}

/// Writes the plain v2 JSON back to `config_path` with no envelope, since
/// this file's shape is a public contract for any non-Rust operator tooling
/// that edits it by hand; only the `.migrated` marker goes through
/// `gateway-persistence`'s schema-versioned envelope.
fn write_v2_atomically(config_path: &Path, config: &RoutingConfigV2) -> io::Result<()> {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_vec_pretty(config).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        use std::io::Write;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;
    }
    temp.persist(config_path).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn migrates_a_v1_file_and_rewrites_it_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "routing.json",
            r#"{"tiers":{"fast":{"targetModel":"claude-haiku","fallbackModels":["claude-sonnet"],"failoverModel":null}},"classifier":{"gpt-4":"fast"}}"#,
        );

        let first = load(&path).unwrap();
        assert!(first.migrated_from_v1);
        assert!(first.rewrote_file);
        assert_eq!(first.config.tiers["fast"].models, vec!["claude-haiku", "claude-sonnet"]);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("\"schemaVersion\""));

        let second = load(&path).unwrap();
        assert!(!second.rewrote_file, "unchanged config should not be rewritten again");
    }

    #[test]
    fn a_v2_file_loads_without_any_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "routing.json",
            r#"{"schemaVersion":2,"tiers":{"fast":{"models":["claude-haiku"]}},"classifier":{"gpt-4":"fast"}}"#,
        );
        let loaded = load(&path).unwrap();
        assert!(!loaded.migrated_from_v1);
        assert!(!loaded.rewrote_file);
    }
}
