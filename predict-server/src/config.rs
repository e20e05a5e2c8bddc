//! Configuration module

use std::env;
use std::path::PathBuf;

use predict_core::LoadOptions;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Model artifact loaded at startup
    pub model_path: PathBuf,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Request body limit in bytes
    pub max_content_length: usize,

    /// Accept bare-classifier artifacts (lenient column handling)
    pub allow_legacy_model: bool,

    /// Refuse to start when the model fails to load
    pub require_model: bool,

    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("ml/model.json"),
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_content_length: 16 * 1024 * 1024,
            allow_legacy_model: false,
            require_model: true,
            log_json: false,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),

            host: env::var("HOST").unwrap_or(defaults.host),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            max_content_length: env::var("MAX_CONTENT_LENGTH")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_content_length),

            allow_legacy_model: env::var("ALLOW_LEGACY_MODEL")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.allow_legacy_model),

            require_model: env::var("REQUIRE_MODEL")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.require_model),

            log_json: env::var("LOG_JSON")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.log_json),

            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            allow_legacy: self.allow_legacy_model,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `true/false`, `1/0`, `yes/no`, `on/off`; anything else is ignored
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
