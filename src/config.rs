use crate::error::AppError;
use serde::{Deserialize, Serialize};

const EMBEDDED_CONFIG: &str = include_str!("../config/config.toml");

/// Environment variable naming an alternative TOML file on disk.
pub const CONFIG_PATH_ENV: &str = "POKEDEX_CONFIG";

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub pokemon: PokemonConfig,
    pub server: ServerConfig,
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PokemonConfig {
    pub api_url: String,
    pub sprite_base_url: String,
    // seconds; 0 leaves the HTTP client without a timeout
    pub timeout: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub window_size: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StreamingConfig {
    pub description_delay_ms: u64,
}

impl Config {
    pub fn parse(source: &str) -> Result<Self, AppError> {
        toml::from_str(source).map_err(|e| {
            tracing::error!("Failed to parse configuration: {}", e);
            AppError::from(e)
        })
    }
}

/// Loads the configuration file named by `POKEDEX_CONFIG`, falling back to
/// the copy of `config/config.toml` compiled into the binary.
pub fn load_config() -> Result<Config, AppError> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            let source = std::fs::read_to_string(&path).map_err(|e| {
                let error_msg = format!("Failed to read {}: {}", path, e);
                tracing::error!("{}", error_msg);
                AppError::Config(error_msg)
            })?;
            Config::parse(&source)
        }
        Err(_) => Config::parse(EMBEDDED_CONFIG),
    }
}
