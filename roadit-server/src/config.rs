//! Gateway configuration resolution
//!
//! API keys resolve with ENV → TOML priority. Everything else comes from the
//! `[gateways]` table or compiled defaults.

use roadit_common::config::GatewaysToml;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "ROADIT_GEMINI_API_KEY";

/// Environment variable holding the Google Maps API key
pub const MAPS_API_KEY_ENV: &str = "ROADIT_MAPS_API_KEY";

pub const DEFAULT_ASSESSMENT_MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings passed to the gateway constructors
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub gemini_api_key: Option<String>,
    pub maps_api_key: Option<String>,
    pub assessment_model: String,
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            maps_api_key: None,
            assessment_model: DEFAULT_ASSESSMENT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    /// Merge the environment over the `[gateways]` table
    pub fn resolve(toml: &GatewaysToml) -> Self {
        let assessment_model = toml
            .assessment_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_ASSESSMENT_MODEL)
            .to_string();

        let timeout_secs = toml
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            gemini_api_key: resolve_api_key(
                "Gemini",
                GEMINI_API_KEY_ENV,
                toml.gemini_api_key.as_deref(),
            ),
            maps_api_key: resolve_api_key("Maps", MAPS_API_KEY_ENV, toml.maps_api_key.as_deref()),
            assessment_model,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Resolve one API key
///
/// **Priority:** ENV → TOML. A key present in both logs a warning.
pub fn resolve_api_key(label: &str, env_var: &str, toml_key: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both {} and TOML config. Using environment (highest priority).",
            label, env_var
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", label);
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Some(key.trim().to_string());
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
