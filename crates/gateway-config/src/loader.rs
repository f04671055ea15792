//! Layered configuration loading: defaults → optional file → environment
//! variables → CLI overrides, in the same priority order (later layers win)
//! that `agentreplay_server::config::ServerConfig::load` follows by hand;
//! here the merge itself is delegated to the `config` crate, and only the
//! "apply explicit CLI overrides last" step stays hand-written, since
//! `config`'s own `Environment` source can't see `clap`'s parsed flags.

use crate::cli::Cli;
use crate::schema::GatewayConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Environment variables are namespaced `GATEWAY_<SECTION>__<FIELD>`, e.g.
/// `GATEWAY_POOL__MAX_CONCURRENCY=16` or `GATEWAY_SECURITY__MODE=internet`.
const ENV_PREFIX: &str = "GATEWAY";

/// Loads and validates a [`GatewayConfig`], applying `cli`'s overrides last.
/// `config_file`, when given, is read as JSON or TOML by extension; a
/// missing file is not an error — defaults and environment still apply.
pub fn load(config_file: Option<&Path>, cli: &Cli) -> Result<GatewayConfig, String> {
    let mut builder = Config::builder().add_source(
        Config::try_from(&GatewayConfig::default()).map_err(|e| e.to_string())?,
    );

    if let Some(path) = config_file {
        if path.exists() {
            let format = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => FileFormat::Toml,
                _ => FileFormat::Json,
            };
            builder = builder.add_source(File::from(path).format(format).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let merged = builder.build().map_err(|e| e.to_string())?;
    let mut config: GatewayConfig = merged.try_deserialize().map_err(|e| e.to_string())?;

    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("gateway").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_validate_with_no_file_and_no_env() {
        let config = load(None, &cli(&[])).unwrap();
        assert_eq!(config.concurrency.max_total_concurrency, 64);
    }

    #[test]
    fn a_json_file_overrides_a_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"concurrency":{"maxTotalConcurrency":10}}"#).unwrap();

        let config = load(Some(&path), &cli(&[])).unwrap();
        assert_eq!(config.concurrency.max_total_concurrency, 10);
    }

    #[test]
    fn an_environment_variable_overrides_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"concurrency":{"maxTotalConcurrency":10}}"#).unwrap();

        std::env::set_var("GATEWAY_CONCURRENCY__MAX_TOTAL_CONCURRENCY", "20");
        let config = load(Some(&path), &cli(&[])).unwrap();
        std::env::remove_var("GATEWAY_CONCURRENCY__MAX_TOTAL_CONCURRENCY");
        assert_eq!(config.concurrency.max_total_concurrency, 20);
    }

    #[test]
    fn a_cli_flag_overrides_everything() {
        let config = load(None, &cli(&["--max-total-concurrency", "5"])).unwrap();
        assert_eq!(config.concurrency.max_total_concurrency, 5);
    }

    #[test]
    fn admin_auth_enabled_without_tokens_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"security":{"adminAuth":{"enabled":true}}}"#).unwrap();
        assert!(load(Some(&path), &cli(&[])).is_err());
    }
}
