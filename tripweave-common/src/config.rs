//! Configuration loading and config file resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TRIPWEAVE_CONFIG";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5830";

/// Default generative model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default whole-request timeout (generation + pipeline)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Used when RUST_LOG is unset: a bare level ("debug") applies to the
    /// service crate, a full directive ("tripweave_planner=debug,hyper=warn")
    /// is used as given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// `EnvFilter` directive string for `crate_name`
    pub fn filter_directive(&self, crate_name: &str) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else if level.is_empty() {
            format!("{}={},tower_http=info", crate_name, default_log_level())
        } else {
            format!("{}={},tower_http=info", crate_name, level)
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`
///
/// Every field is optional so a partial (or empty) file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: Option<String>,
    #[serde(default)]
    pub geocoding_api_key: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Per-day geocoding fan-out; 1 (or absent) means strictly sequential
    #[serde(default)]
    pub geocode_concurrency: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    Toml,
    Default,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::CommandLine => "command line",
            ConfigSource::Environment => "environment",
            ConfigSource::Toml => "TOML",
            ConfigSource::Default => "default",
        }
    }
}

/// Resolve a string setting across CLI → ENV → TOML
///
/// Blank values are treated as absent at every tier.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<(String, ConfigSource)> {
    if let Some(value) = cli_arg.filter(|v| is_present(v)) {
        return Some((value.trim().to_string(), ConfigSource::CommandLine));
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if is_present(&value) {
            return Some((value.trim().to_string(), ConfigSource::Environment));
        }
    }

    toml_value
        .filter(|v| is_present(v))
        .map(|v| (v.trim().to_string(), ConfigSource::Toml))
}

/// Non-empty, non-whitespace check
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Locate the config file: explicit path → `TRIPWEAVE_CONFIG` → platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if is_present(&path) {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// `~/.config/tripweave/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tripweave").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the config file if it exists, falling back to defaults
///
/// A missing file is only logged. A file that exists but does not parse
/// is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config directory available; using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found; using compiled defaults");
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(path)?;
    debug!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Serialize a config to TOML text
pub fn to_toml_string(config: &TomlConfig) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_present_rejects_whitespace() {
        assert!(!is_present(""));
        assert!(!is_present("   \t"));
        assert!(is_present(" key "));
    }

    #[test]
    fn test_empty_toml_parses_to_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bare_level_is_scoped_to_crate() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
        };
        assert_eq!(
            logging.filter_directive("tripweave_planner"),
            "tripweave_planner=debug,tower_http=info"
        );
    }

    #[test]
    fn test_full_directive_is_used_verbatim() {
        let logging = LoggingConfig {
            level: " tripweave_planner=debug,hyper=warn ".to_string(),
        };
        assert_eq!(
            logging.filter_directive("tripweave_planner"),
            "tripweave_planner=debug,hyper=warn"
        );
    }

    #[test]
    fn test_cli_wins_over_toml() {
        let resolved = resolve_setting(
            Some("cli-value"),
            "TRIPWEAVE_TEST_UNSET_VAR",
            Some("toml-value"),
        );
        assert_eq!(
            resolved,
            Some(("cli-value".to_string(), ConfigSource::CommandLine))
        );
    }

    #[test]
    fn test_blank_cli_falls_through() {
        let resolved = resolve_setting(Some("  "), "TRIPWEAVE_TEST_UNSET_VAR", Some("toml-value"));
        assert_eq!(resolved, Some(("toml-value".to_string(), ConfigSource::Toml)));
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let config = TomlConfig {
            bind_address: Some("0.0.0.0:8080".to_string()),
            gemini_model: Some("gemini-pro".to_string()),
            geocode_concurrency: Some(4),
            ..Default::default()
        };
        let text = to_toml_string(&config).unwrap();
        let parsed: TomlConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
