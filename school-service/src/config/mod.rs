use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct SchoolConfig {
    pub common: core_config::Config,
    pub mongo: MongoConfig,
    /// `mongo` or `memory`.
    pub storage: String,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl SchoolConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = core_config::is_prod();

        Ok(Self {
            common,
            mongo: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("school_db"), is_prod)?,
            },
            storage: get_env("STORAGE_BACKEND", Some("mongo"), is_prod)?,
        })
    }
}
