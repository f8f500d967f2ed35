// Layered configuration: built-in defaults, then compliance.toml, then
// COMPLIANCE_* environment variables (`__` separates sections).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationConfig;
use crate::errors::{ComplianceError, ComplianceResult};
use crate::policy::UserEntry;

pub const DEFAULT_CONFIG_FILE: &str = "compliance.toml";
pub const CONFIG_PATH_ENV: &str = "COMPLIANCE_CONFIG";
pub const ENV_PREFIX: &str = "COMPLIANCE_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            cors_origin: "http://localhost:5175".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub path: String,
    pub timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Sled,
            path: "data/ledger".into(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// TOML file with `[[rules]]`; the built-in table is used when unset.
    #[serde(default)]
    pub rules_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Report a missing record as 404 instead of the historical 500.
    #[serde(default)]
    pub distinct_not_found: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Serialize)]
struct ConfigDefaults {
    server: ServerConfig,
    auth: AuthConfig,
    ledger: LedgerConfig,
    classifier: ClassifierConfig,
    aggregation: AggregationConfig,
    api: ApiConfig,
    log_level: String,
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(ConfigDefaults {
        server: ServerConfig::default(),
        auth: AuthConfig::default(),
        ledger: LedgerConfig::default(),
        classifier: ClassifierConfig::default(),
        aggregation: AggregationConfig::default(),
        api: ApiConfig::default(),
        log_level: default_log_level(),
    }))
}

/// Load configuration from the default file location and the environment.
pub fn load_config() -> ComplianceResult<ComplianceConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    load_config_from(&path)
}

pub fn load_config_from(path: &str) -> ComplianceResult<ComplianceConfig> {
    let figment = defaults()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    extract(figment)
}

/// Load configuration from an in-memory TOML document (no environment).
pub fn load_config_str(toml: &str) -> ComplianceResult<ComplianceConfig> {
    extract(defaults().merge(Toml::string(toml)))
}

fn extract(figment: Figment) -> ComplianceResult<ComplianceConfig> {
    let config: ComplianceConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl ComplianceConfig {
    pub fn validate(&self) -> ComplianceResult<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ComplianceError::config("auth.jwt_secret must be set"));
        }
        for user in &self.auth.users {
            if user.username.trim().is_empty() {
                return Err(ComplianceError::config("auth.users entry without username"));
            }
            let digest = &user.password_sha256;
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ComplianceError::config(format!(
                    "auth.users '{}' password_sha256 must be 64 hex characters",
                    user.username
                )));
            }
        }
        if self.ledger.timeout_ms == 0 {
            return Err(ComplianceError::config("ledger.timeout_ms must be positive"));
        }
        Ok(())
    }
}
