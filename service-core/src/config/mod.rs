use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

use crate::error::AppError;

/// Settings shared by every service process.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Shared bus "node type" all services subscribe under.
    #[serde(default = "default_node_type")]
    pub node_type: String,
    #[serde(default = "default_redis_uri")]
    pub redis_uri: String,
    /// Key prefix isolating this deployment's bus traffic.
    #[serde(default = "default_bus_prefix")]
    pub bus_prefix: String,
    #[serde(default = "default_bus_timeout_secs")]
    pub bus_timeout_secs: u64,
}

fn default_node_type() -> String {
    "school".to_string()
}

fn default_redis_uri() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_bus_prefix() -> String {
    "school".to_string()
}

fn default_bus_timeout_secs() -> u64 {
    5
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

pub fn is_prod() -> bool {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod"
}

/// Read an env var, falling back to `default` outside production; in
/// production a missing value is a hard startup error.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
