use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::healing::healing_model::HealingConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "selector-healing",
    version,
    about = "Self-healing element locators for UI test suites"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: selector-healing.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Minimum confidence (0-100) required to heal
    #[arg(long, global = true, env = "HEAL_THRESHOLD")]
    pub threshold: Option<f64>,

    /// Directory for the file-backed fingerprint store
    #[arg(long, global = true, env = "HEAL_STORE_DIR")]
    pub store_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the healing HTTP server
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Learn the fingerprint of an element from a saved markup snapshot
    Learn {
        /// Page URL or page key the snapshot belongs to
        #[arg(long)]
        page: String,

        /// Id of the element to learn
        #[arg(long)]
        id: String,

        /// Path to the markup snapshot (HTML)
        #[arg(long)]
        snapshot: String,

        /// Send to a running healing server instead of the local store
        #[arg(long)]
        server: Option<String>,
    },

    /// Heal a broken id against a saved markup snapshot
    Heal {
        /// Page URL or page key the snapshot belongs to
        #[arg(long)]
        page: String,

        /// The id that no longer matches
        #[arg(long)]
        broken_id: String,

        /// Path to the markup snapshot (HTML)
        #[arg(long)]
        snapshot: String,

        /// Send to a running healing server instead of the local store
        #[arg(long)]
        server: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `selector-healing.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub healing: HealingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    #[serde(default = "default_store_dir")]
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: default_store_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    /// JSONL audit file; no audit trail when unset
    pub path: Option<String>,
}

// Serde default helpers
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }
fn default_backend() -> StoreBackend { StoreBackend::File }
fn default_store_dir() -> String { "snapshots".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "selector-healing.yaml";

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed (a malformed file is logged).
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "Ignoring malformed config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

// ============================================================================
// Validation and overrides
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be between 0 and 100, got {0}")]
    Threshold(f64),

    #[error("scoring weights must be finite and non-negative")]
    NegativeWeight,

    #[error("at least one scoring weight must be positive")]
    AllWeightsZero,
}

pub fn validate_healing_config(config: &HealingConfig) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&config.threshold) {
        return Err(ConfigError::Threshold(config.threshold));
    }

    let weights = config.weights.values();
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::NegativeWeight);
    }
    if weights.iter().all(|w| *w == 0.0) {
        return Err(ConfigError::AllWeightsZero);
    }

    Ok(())
}

/// Merge global CLI overrides into the file config and validate the result.
///
/// Precedence: CLI flag (or its environment variable) > file > defaults.
pub fn resolve_config(mut config: AppConfig, cli: &Cli) -> Result<AppConfig, ConfigError> {
    if let Some(threshold) = cli.threshold {
        config.healing.threshold = threshold;
    }
    if let Some(dir) = &cli.store_dir {
        config.store.dir = dir.clone();
    }

    validate_healing_config(&config.healing)?;
    Ok(config)
}
