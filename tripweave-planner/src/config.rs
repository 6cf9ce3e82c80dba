//! Service configuration for tripweave-planner
//!
//! Each setting resolves CLI → ENV → TOML → compiled default through
//! [`tripweave_common::config::resolve_setting`].

use std::time::Duration;

use tracing::{info, warn};
use tripweave_common::config::{
    resolve_setting, TomlConfig, DEFAULT_BIND_ADDRESS, DEFAULT_GEMINI_MODEL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

use crate::pipeline::EnrichOptions;
use crate::services::geocoding_client::DEFAULT_REQUESTS_PER_SECOND;

pub const BIND_ADDRESS_ENV: &str = "TRIPWEAVE_BIND_ADDRESS";
pub const GEMINI_API_KEY_ENV: &str = "TRIPWEAVE_GEMINI_API_KEY";
pub const GEMINI_MODEL_ENV: &str = "TRIPWEAVE_GEMINI_MODEL";
pub const GEOCODING_API_KEY_ENV: &str = "TRIPWEAVE_GEOCODING_API_KEY";

/// Upper bound on per-day geocoding fan-out
pub const MAX_GEOCODE_CONCURRENCY: usize = 8;

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub bind_address: String,
    /// `None` is allowed at startup; generation then fails with a configuration error
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// `None` disables geocoding; events without coordinates degrade to `{0,0}`
    pub geocoding_api_key: Option<String>,
    pub geocode_requests_per_second: u32,
    pub request_timeout: Duration,
    pub enrich: EnrichOptions,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            geocoding_api_key: None,
            geocode_requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            enrich: EnrichOptions::default(),
        }
    }
}

impl PlannerConfig {
    /// Resolve every setting
    ///
    /// `cli_bind` is the `--bind` argument, if given. API keys are never
    /// logged; only the tier they came from is.
    pub fn resolve(cli_bind: Option<&str>, toml: &TomlConfig) -> Self {
        let defaults = Self::default();

        let toml_bind = toml.bind_address.as_deref();
        let bind_address = match resolve_setting(cli_bind, BIND_ADDRESS_ENV, toml_bind) {
            Some((value, source)) => {
                info!(bind_address = %value, source = source.as_str(), "Bind address resolved");
                value
            }
            None => defaults.bind_address,
        };

        let gemini_api_key = resolve_key(
            "Gemini",
            GEMINI_API_KEY_ENV,
            toml.gemini_api_key.as_deref(),
        );
        if gemini_api_key.is_none() {
            warn!(
                "Gemini API key not configured; set {} or gemini_api_key in config.toml. \
                 Itinerary generation will fail until it is set",
                GEMINI_API_KEY_ENV
            );
        }

        let geocoding_api_key = resolve_key(
            "Geocoding",
            GEOCODING_API_KEY_ENV,
            toml.geocoding_api_key.as_deref(),
        );
        if geocoding_api_key.is_none() {
            warn!(
                "Geocoding API key not configured; events without coordinates will be placed at 0,0"
            );
        }

        let gemini_model = resolve_setting(None, GEMINI_MODEL_ENV, toml.gemini_model.as_deref())
            .map(|(value, _)| value)
            .unwrap_or(defaults.gemini_model);

        let request_timeout = toml
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let geocode_concurrency = toml
            .geocode_concurrency
            .unwrap_or(1)
            .clamp(1, MAX_GEOCODE_CONCURRENCY);

        Self {
            bind_address,
            gemini_api_key,
            gemini_model,
            geocoding_api_key,
            geocode_requests_per_second: defaults.geocode_requests_per_second,
            request_timeout,
            enrich: EnrichOptions {
                geocode_concurrency,
            },
        }
    }
}

fn resolve_key(label: &str, env_name: &str, toml_value: Option<&str>) -> Option<String> {
    let env_present = std::env::var(env_name)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    let toml_present = toml_value.map(|v| !v.trim().is_empty()).unwrap_or(false);
    if env_present && toml_present {
        warn!(
            "{} API key found in both environment and TOML; using environment",
            label
        );
    }

    resolve_setting(None, env_name, toml_value).map(|(key, source)| {
        info!("{} API key loaded from {}", label, source.as_str());
        key
    })
}
