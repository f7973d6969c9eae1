//! Configuration loading
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the service binary)
//! 2. Environment variables (`FMSC_PORT`, `FMSC_DATABASE`, `FMSC_CATALOG`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The TOML file is located via `--config`, then `FMSC_CONFIG`, then
//! `~/.config/fmsc/config.toml`, then `/etc/fmsc/config.toml`. A missing
//! file is not an error; an unreadable or invalid one is.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::catalog::PATTERN_TAGS;
use crate::profile::Severity;
use crate::{Error, Result};

/// Environment variable naming the TOML file
pub const CONFIG_ENV: &str = "FMSC_CONFIG";
pub const PORT_ENV: &str = "FMSC_PORT";
pub const DATABASE_ENV: &str = "FMSC_DATABASE";
pub const CATALOG_ENV: &str = "FMSC_CATALOG";

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Exercise catalog JSON file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub candidates: CandidateConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub plan_writer: PlanWriterConfig,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database_path: default_database_path(),
            catalog_path: default_catalog_path(),
            scoring: ScoringConfig::default(),
            candidates: CandidateConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            plan_writer: PlanWriterConfig::default(),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Default: 5740
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

/// Fault-scoring thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// A fault is present when its severity exceeds this value
    #[serde(default)]
    pub presence_threshold: Severity,

    /// Maximum severity accepted on input (`S`)
    #[serde(default = "default_severity_scale")]
    pub severity_scale: Severity,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            presence_threshold: 0,
            severity_scale: default_severity_scale(),
        }
    }
}

/// Corrective shortlist ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateConfig {
    /// Maximum shortlist length (K)
    #[serde(default = "default_shortlist_size")]
    pub shortlist_size: usize,

    /// Added to an entry's match score when any matched tag is `fix_*`
    #[serde(default = "default_corrective_bonus")]
    pub corrective_bonus: u32,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            shortlist_size: default_shortlist_size(),
            corrective_bonus: default_corrective_bonus(),
        }
    }
}

/// Response cache bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,

    /// Entry lifetime; `None` keeps entries until evicted by size
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Which plan writer turns an assessment into a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanWriterKind {
    #[default]
    Template,
    Chat,
}

/// Plan writer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanWriterConfig {
    #[serde(default)]
    pub kind: PlanWriterKind,

    /// Chat-completion endpoint (OpenAI-compatible)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_plan_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PlanWriterConfig {
    fn default() -> Self {
        Self {
            kind: PlanWriterKind::default(),
            endpoint: None,
            model: None,
            api_key_env: default_api_key_env(),
            timeout_seconds: default_plan_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fmsc"))
        .unwrap_or_else(|| PathBuf::from("./fmsc_data"))
}

fn default_database_path() -> PathBuf {
    default_data_dir().join("fmsc.db")
}

fn default_catalog_path() -> PathBuf {
    default_data_dir().join("exercise_catalog.json")
}

fn default_severity_scale() -> Severity {
    4
}

fn default_shortlist_size() -> usize {
    3
}

fn default_corrective_bonus() -> u32 {
    5
}

fn default_cache_entries() -> usize {
    256
}

fn default_cache_ttl() -> Option<u64> {
    Some(3600)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_key_env() -> String {
    "FMSC_PLAN_API_KEY".to_string()
}

fn default_plan_timeout() -> u64 {
    30
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl CoachConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CoachConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve the full configuration, CLI arguments aside
    ///
    /// Reads the TOML file (if one is found), then applies environment
    /// overrides. Falls back to defaults with a warning when no file exists.
    pub fn resolve(cli_config_path: Option<&Path>) -> Result<Self> {
        let (config, origin) = Self::resolve_with_origin(cli_config_path)?;
        origin.log();
        Ok(config)
    }

    /// Same as [`resolve`](Self::resolve) without logging
    ///
    /// For callers that resolve configuration before the subscriber exists;
    /// log the returned origin once tracing is up.
    pub fn resolve_with_origin(cli_config_path: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        let (mut config, origin) = match locate_config_file(cli_config_path) {
            Some(path) if path.exists() => (Self::load(&path)?, ConfigOrigin::File(path)),
            Some(path) => (Self::default(), ConfigOrigin::Missing(path)),
            None => (Self::default(), ConfigOrigin::Defaults),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, origin))
    }

    /// Apply `FMSC_PORT`, `FMSC_DATABASE` and `FMSC_CATALOG`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port.parse().map_err(|_| {
                Error::Configuration(format!("{} is not a valid port: '{}'", PORT_ENV, port))
            })?;
        }
        if let Ok(path) = std::env::var(DATABASE_ENV) {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(CATALOG_ENV) {
            self.catalog_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Reject out-of-range settings
    pub fn validate(&self) -> Result<()> {
        if self.scoring.severity_scale == 0 {
            return Err(Error::Configuration(
                "scoring.severity_scale must be at least 1".to_string(),
            ));
        }
        if self.scoring.presence_threshold >= self.scoring.severity_scale {
            return Err(Error::Configuration(format!(
                "scoring.presence_threshold {} must be below severity_scale {}",
                self.scoring.presence_threshold, self.scoring.severity_scale
            )));
        }
        if !(1..=10).contains(&self.candidates.shortlist_size) {
            return Err(Error::Configuration(format!(
                "candidates.shortlist_size {} out of range [1, 10]",
                self.candidates.shortlist_size
            )));
        }
        if self.candidates.corrective_bonus < min_corrective_bonus() {
            return Err(Error::Configuration(format!(
                "candidates.corrective_bonus {} must be at least {} so corrective matches outrank pattern matches",
                self.candidates.corrective_bonus,
                min_corrective_bonus()
            )));
        }
        if self.cache.max_entries == 0 {
            return Err(Error::Configuration(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_seconds == Some(0) {
            return Err(Error::Configuration(
                "cache.ttl_seconds must be positive when set".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Configuration(format!(
                "logging.level '{}' is not one of {:?}",
                self.logging.level, LOG_LEVELS
            )));
        }
        if self.plan_writer.kind == PlanWriterKind::Chat
            && (self.plan_writer.endpoint.is_none() || self.plan_writer.model.is_none())
        {
            return Err(Error::Configuration(
                "plan_writer kind 'chat' requires endpoint and model".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the resolved configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Loaded from this file
    File(PathBuf),
    /// Named file did not exist; defaults used
    Missing(PathBuf),
    /// No candidate file; defaults used
    Defaults,
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loading configuration from {}", path.display()),
            ConfigOrigin::Missing(path) => {
                warn!("Config file {} not found, using defaults", path.display())
            }
            ConfigOrigin::Defaults => warn!("No config file found, using defaults"),
        }
    }
}

/// Smallest bonus that keeps any corrective match above any non-corrective one
///
/// A non-corrective entry matches at most the level tag plus every pattern
/// tag; a corrective entry scores at least `1 + bonus`.
pub fn min_corrective_bonus() -> u32 {
    PATTERN_TAGS.len() as u32 + 1
}

/// Path of the TOML file to read, if any candidate applies
///
/// Returns the explicit path (CLI or `FMSC_CONFIG`) even when it does not
/// exist, so the caller can report it.
pub fn locate_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("fmsc").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/fmsc/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoachConfig::default();
        assert_eq!(config.server.port, 5740);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.scoring.presence_threshold, 0);
        assert_eq!(config.scoring.severity_scale, 4);
        assert_eq!(config.candidates.shortlist_size, 3);
        assert_eq!(config.candidates.corrective_bonus, 5);
        assert_eq!(config.cache.max_entries, 256);
        assert_eq!(config.cache.ttl_seconds, Some(3600));
        assert_eq!(config.plan_writer.kind, PlanWriterKind::Template);
        assert!(config.database_path.ends_with("fmsc.db"));
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config = CoachConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoachConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = CoachConfig::from_toml_str(
            r#"
            database_path = "/tmp/fmsc-test.db"

            [server]
            port = 6000

            [scoring]
            severity_scale = 1

            [candidates]
            shortlist_size = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database_path, PathBuf::from("/tmp/fmsc-test.db"));
        assert_eq!(config.scoring.severity_scale, 1);
        assert_eq!(config.scoring.presence_threshold, 0);
        assert_eq!(config.candidates.shortlist_size, 6);
        assert_eq!(config.candidates.corrective_bonus, 5);
    }

    #[test]
    fn test_shortlist_size_out_of_range() {
        let err = CoachConfig::from_toml_str("[candidates]\nshortlist_size = 0\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = CoachConfig::from_toml_str("[candidates]\nshortlist_size = 11\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_corrective_bonus_lower_bound() {
        let err = CoachConfig::from_toml_str("[candidates]\ncorrective_bonus = 0\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let toml = format!("[candidates]\ncorrective_bonus = {}\n", min_corrective_bonus());
        assert!(CoachConfig::from_toml_str(&toml).is_ok());
    }

    #[test]
    fn test_threshold_must_be_below_scale() {
        let err = CoachConfig::from_toml_str(
            "[scoring]\npresence_threshold = 1\nseverity_scale = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_chat_writer_requires_endpoint() {
        let err = CoachConfig::from_toml_str("[plan_writer]\nkind = \"chat\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let config = CoachConfig::from_toml_str(
            "[plan_writer]\nkind = \"chat\"\nendpoint = \"http://localhost:8080/v1/chat/completions\"\nmodel = \"coach\"\n",
        )
        .unwrap();
        assert_eq!(config.plan_writer.kind, PlanWriterKind::Chat);
        assert_eq!(config.plan_writer.timeout_seconds, 30);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = CoachConfig::from_toml_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let err = CoachConfig::from_toml_str("[logging]\nlevel = \"verbose\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
