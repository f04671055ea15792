//! Parses the credential file (spec §6: `{keys:[…], baseUrl}`) into the
//! [`gateway_pool::CredentialSpec`] list `gateway-pool::reload` diffs
//! against. The per-credential concurrency/rate-limit numbers aren't part
//! of that file — they come from [`crate::schema::PoolTuning`] and are
//! applied uniformly, the same way the pool has no notion of per-credential
//! tuning beyond what the caller passes into `new_credential`.

use crate::schema::PoolTuning;
use gateway_pool::CredentialSpec;
use serde::Deserialize;
use std::io;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysFile {
    keys: Vec<KeyEntry>,
    #[serde(default)]
    base_url: Option<String>,
}

/// A key entry is either a bare secret string or `{secret, priority}` when
/// the operator wants to set the `balanced` strategy's tie-break tier.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeyEntry {
    Secret(String),
    WithPriority {
        secret: String,
        #[serde(default = "default_priority")]
        priority: u32,
    },
}

fn default_priority() -> u32 {
    1
}

impl KeyEntry {
    fn secret(&self) -> &str {
        match self {
            KeyEntry::Secret(s) => s,
            KeyEntry::WithPriority { secret, .. } => secret,
        }
    }

    fn priority(&self) -> u32 {
        match self {
            KeyEntry::Secret(_) => default_priority(),
            KeyEntry::WithPriority { priority, .. } => *priority,
        }
    }
}

#[derive(Debug)]
pub struct LoadedCredentials {
    pub specs: Vec<CredentialSpec>,
    pub base_url: Option<String>,
}

pub fn load(keys_file_path: &Path, tuning: &PoolTuning) -> io::Result<LoadedCredentials> {
    let raw = std::fs::read(keys_file_path)?;
    let parsed: KeysFile =
        serde_json::from_slice(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let specs = parsed
        .keys
        .into_iter()
        .map(|entry| CredentialSpec {
            secret: entry.secret().to_string(),
            max_concurrency: tuning.max_concurrency,
            bucket_capacity: tuning.requests_per_minute,
            bucket_burst: tuning.burst,
            bucket_refill_per_second: tuning.refill_per_second(),
            priority: entry.priority(),
        })
        .collect();

    Ok(LoadedCredentials { specs, base_url: parsed.base_url })
}
