//! Atomic JSON snapshot/restore, shared by the stats aggregator and the cost
//! tracker (spec §4.8) — they each call into this crate with their own file,
//! never the same one.
//!
//! Write sequence: serialise to a temp file in the target's own directory
//! (so the final rename stays on one filesystem), fsync, rename over the
//! final path. Reads tolerate a missing or corrupt file by logging and
//! falling back to the caller's default, the same "don't crash on a bad
//! snapshot" posture the teacher's plugin state store takes with
//! `PluginStateStore::load`, generalized here with an explicit
//! `schemaVersion` envelope so a newer writer's extra fields don't break an
//! older reader (serde's own field defaulting handles the reverse case).

use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, serde::Serialize)]
struct WriteEnvelope<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Debug, serde::Deserialize)]
struct ReadEnvelope<T> {
    #[allow(dead_code)]
    schema_version: u32,
    data: T,
}

/// Writes `payload` to `path` atomically: temp file alongside `path`, fsync,
/// rename. A reader never observes a partially written file.
pub fn atomic_write<T: Serialize>(path: &Path, schema_version: u32, payload: &T) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let envelope = WriteEnvelope {
        schema_version,
        data: payload,
    };
    let json = serde_json::to_vec_pretty(&envelope)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        use std::io::Write;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;
    }
    temp.persist(path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(())
}

/// Reads `path` and deserialises its payload. A missing file or one that
/// fails to parse is logged and treated as "no snapshot yet": the caller's
/// `Default` is returned rather than propagating an error.
pub fn atomic_read<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<ReadEnvelope<T>>(&bytes) {
            Ok(envelope) => envelope.data,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(path = %path.display(), error = %_err, "snapshot file is corrupt, starting from defaults");
                T::default()
            }
        },
        Err(_err) => T::default(),
    }
}
