use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the speech provider relay. Present only when an API key is
/// configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub api_key: String,
    pub model: String,
    pub voice: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub site_dir: PathBuf,
    pub avatar_target: String,
    pub viewer_buffer: usize,
    pub realtime: Option<RealtimeConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5173".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let site_dir = std::env::var("SITE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./site"));

        let avatar_target = std::env::var("AVATAR_TARGET")
            .ok()
            .map(|target| target.trim().to_string())
            .filter(|target| !target.is_empty())
            .unwrap_or_else(|| "avatar-1".to_string());

        let viewer_buffer = match std::env::var("VIEWER_BUFFER") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "VIEWER_BUFFER".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ));
                }
            },
            Err(_) => 32,
        };

        let realtime = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| RealtimeConfig {
                api_key,
                model: std::env::var("REALTIME_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-realtime-preview-2024-12-17".to_string()),
                voice: std::env::var("REALTIME_VOICE").unwrap_or_else(|_| "alloy".to_string()),
            });

        Ok(Self {
            bind_address,
            log_level,
            site_dir,
            avatar_target,
            viewer_buffer,
            realtime,
        })
    }
}
