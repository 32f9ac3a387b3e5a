use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub mongo: MongoConfig,
    /// `mongo` or `memory`.
    pub storage: String,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub long_secret: String,
    pub short_secret: String,
    pub long_expiry_days: i64,
    pub short_expiry_days: i64,
}

impl AuthConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = core_config::is_prod();

        Ok(Self {
            common,
            mongo: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("auth_db"), is_prod)?,
            },
            storage: get_env("STORAGE_BACKEND", Some("mongo"), is_prod)?,
            tokens: TokenConfig {
                // Secrets have dev fallbacks; production refuses to start
                // without real ones.
                long_secret: get_env("LONG_TOKEN_SECRET", Some("dev-long-token-secret"), is_prod)?,
                short_secret: get_env(
                    "SHORT_TOKEN_SECRET",
                    Some("dev-short-token-secret"),
                    is_prod,
                )?,
                long_expiry_days: get_env("LONG_TOKEN_EXPIRY_DAYS", Some("1095"), is_prod)?
                    .parse()
                    .unwrap_or(1095),
                short_expiry_days: get_env("SHORT_TOKEN_EXPIRY_DAYS", Some("365"), is_prod)?
                    .parse()
                    .unwrap_or(365),
            },
        })
    }
}
