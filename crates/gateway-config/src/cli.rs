//! Process invocation surface (spec §6's "CLI surface"): flags mirror the
//! environment-variable namespace, the same `clap::Parser` derive idiom
//! `flowtrace_cli::Cli` uses, plus the `--dry-run` flag that loads and
//! validates configuration without binding a listener.

use crate::schema::GatewayConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gateway", about = "LLM reverse-proxy gateway", version)]
pub struct Cli {
    /// Path to a JSON or TOML configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the credential file and routing table.
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Address to bind the HTTP listener to.
    #[arg(long, value_name = "ADDR")]
    pub listen_addr: Option<String>,

    /// Upstream base URL, overriding the one in the credential file.
    #[arg(long, value_name = "URL")]
    pub upstream_base_url: Option<String>,

    /// Overall concurrency ceiling across all credentials.
    #[arg(long, value_name = "N")]
    pub max_total_concurrency: Option<usize>,

    /// Admission queue depth.
    #[arg(long, value_name = "N")]
    pub queue_size: Option<usize>,

    /// Per-credential concurrency ceiling.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<u32>,

    /// Security posture: `local` (no auth required) or `internet` (admin auth required).
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<SecurityModeArg>,

    /// Log verbosity, passed straight to `tracing_subscriber`'s env filter.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON instead of human-readable text for CLI-facing output.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Load and validate configuration, then exit without binding a listener.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SecurityModeArg {
    Local,
    Internet,
}

impl Cli {
    /// Applies every flag the operator actually passed on top of `config`,
    /// which was already built from defaults, file, and environment.
    pub fn apply_overrides(&self, config: &mut GatewayConfig) {
        if let Some(dir) = &self.config_dir {
            config.credentials.config_dir = dir.clone();
        }
        if let Some(addr) = &self.listen_addr {
            config.listen_addr = Some(addr.clone());
        }
        if let Some(url) = &self.upstream_base_url {
            config.upstream.base_url = Some(url.clone());
        }
        if let Some(n) = self.max_total_concurrency {
            config.concurrency.max_total_concurrency = n;
        }
        if let Some(n) = self.queue_size {
            config.concurrency.queue_size = n;
        }
        if let Some(n) = self.max_concurrency {
            config.pool.max_concurrency = n;
        }
        if let Some(mode) = self.mode {
            config.security.mode = match mode {
                SecurityModeArg::Local => crate::schema::SecurityMode::Local,
                SecurityModeArg::Internet => crate::schema::SecurityMode::Internet,
            };
        }
        if let Some(level) = &self.log_level {
            config.telemetry.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_leave_the_config_untouched() {
        let cli = Cli::parse_from(["gateway"]);
        let mut config = GatewayConfig::default();
        let before = config.concurrency.max_total_concurrency;
        cli.apply_overrides(&mut config);
        assert_eq!(config.concurrency.max_total_concurrency, before);
    }

    #[test]
    fn an_explicit_flag_overrides_the_default() {
        let cli = Cli::parse_from(["gateway", "--max-concurrency", "3"]);
        let mut config = GatewayConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.pool.max_concurrency, 3);
    }

    #[test]
    fn dry_run_defaults_to_false() {
        let cli = Cli::parse_from(["gateway"]);
        assert!(!cli.dry_run);
    }
}
