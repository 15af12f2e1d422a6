use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub model_path: PathBuf,
    pub yahoo_base_url: String,
    pub synthetic_fallback: bool,
    pub model_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            model_path: PathBuf::from("models/cnn_lstm.onnx"),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            synthetic_fallback: true,
            model_seed: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup("BIND_ADDR") {
            Some(v) => v.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.bind_addr,
        };

        let synthetic_fallback = match lookup("SYNTHETIC_FALLBACK") {
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid {
                key: "SYNTHETIC_FALLBACK",
                value: v.clone(),
                reason: "expected true/false".to_string(),
            })?,
            None => defaults.synthetic_fallback,
        };

        let model_seed = match lookup("MODEL_SEED") {
            Some(v) => Some(v.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: "MODEL_SEED",
                    value: v.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            bind_addr,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            synthetic_fallback,
            model_seed,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
