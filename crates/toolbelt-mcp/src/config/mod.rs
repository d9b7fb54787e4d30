//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit CLI flag, then environment variable,
//! then built-in default.

use std::fmt;
use std::time::Duration;

use crate::types::{McpError, McpResult};

pub const GEOCODE_URL_ENV: &str = "TOOLBELT_GEOCODE_URL";
pub const WEATHER_URL_ENV: &str = "TOOLBELT_WEATHER_URL";
pub const IMAGE_URL_ENV: &str = "TOOLBELT_IMAGE_URL";
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";
pub const HTTP_TIMEOUT_ENV: &str = "TOOLBELT_HTTP_TIMEOUT_SECS";
pub const STRICT_ARGS_ENV: &str = "TOOLBELT_STRICT_ARGS";

pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_IMAGE_URL: &str =
    "https://router.huggingface.co/hf-inference/models/black-forest-labs/FLUX.1-schnell";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Values given on the command line. `None` falls through to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub geocode_url: Option<String>,
    pub weather_url: Option<String>,
    pub image_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub strict_args: bool,
}

/// Resolved server settings.
#[derive(Clone)]
pub struct ServerConfig {
    pub geocode_url: String,
    pub weather_url: String,
    pub image_url: String,
    pub hf_token: Option<String>,
    pub http_timeout: Duration,
    pub strict_args: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            hf_token: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            strict_args: false,
        }
    }
}

// The token never reaches logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("geocode_url", &self.geocode_url)
            .field("weather_url", &self.weather_url)
            .field("image_url", &self.image_url)
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .field("http_timeout", &self.http_timeout)
            .field("strict_args", &self.strict_args)
            .finish()
    }
}

impl ServerConfig {
    /// Resolve from CLI overrides and the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> McpResult<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> McpResult<Self> {
        let pick = |explicit: &Option<String>, key: &str, default: &str| -> String {
            explicit
                .clone()
                .or_else(|| env(key).filter(|v| !v.trim().is_empty()))
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };

        let http_timeout_secs = match overrides.http_timeout_secs {
            Some(secs) => secs,
            None => match env(HTTP_TIMEOUT_ENV) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                    McpError::Config(format!(
                        "{HTTP_TIMEOUT_ENV} must be a whole number of seconds, got '{raw}'"
                    ))
                })?,
                None => DEFAULT_HTTP_TIMEOUT_SECS,
            },
        };
        if http_timeout_secs == 0 {
            return Err(McpError::Config(
                "HTTP timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            geocode_url: pick(&overrides.geocode_url, GEOCODE_URL_ENV, DEFAULT_GEOCODE_URL),
            weather_url: pick(&overrides.weather_url, WEATHER_URL_ENV, DEFAULT_WEATHER_URL),
            image_url: pick(&overrides.image_url, IMAGE_URL_ENV, DEFAULT_IMAGE_URL),
            hf_token: env(HF_TOKEN_ENV).filter(|t| !t.trim().is_empty()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            strict_args: overrides.strict_args || env(STRICT_ARGS_ENV).is_some_and(|v| is_truthy(&v)),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
