use anyhow::Context;
use serde::Deserialize;
use verbo_srs::EngineConfig;

/// Deployment environment, read from `APP_ENV`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_db_max_connections() -> u32 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:8080".to_string()]
}

const fn default_retention_days() -> u32 {
    180
}

const fn default_rate_limit_per_second() -> u64 {
    10
}

const fn default_rate_limit_burst() -> u32 {
    20
}

/// Service configuration.
///
/// Every field maps to the upper-case environment variable of the same name
/// (`DATABASE_URL`, `PORT`, ...). Engine tunables are read separately from
/// `SRS_`-prefixed variables, e.g. `SRS_MASTERY_THRESHOLD`.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub database_url: String,
    #[serde(default, rename = "app_env")]
    pub env: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Comma separated in the environment
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Attempt log entries older than this are pruned
    #[serde(default = "default_retention_days")]
    pub attempt_log_retention_days: u32,
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
    #[serde(skip)]
    pub engine: EngineConfig,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Build the configuration from explicit `(name, value)` pairs.
    pub fn from_vars(vars: Vec<(String, String)>) -> anyhow::Result<Self> {
        let mut config: Self =
            envy::from_iter(vars.clone()).context("invalid service configuration")?;

        config.engine = envy::prefixed("SRS_")
            .from_iter(vars)
            .context("invalid SRS_ engine configuration")?;
        config
            .engine
            .validate()
            .context("invalid SRS_ engine configuration")?;

        Ok(config)
    }
}
