use std::path::PathBuf;

use anyhow::{anyhow, Context};
use bookshelf_db::DbConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`Settings::load`], with an explicit config directory taking
    /// precedence over `BOOKSHELF_CONFIG_DIR`.
    pub fn load_from(config_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let environment: Environment = environment.parse()?;

        let config_dir = match config_dir {
            Some(dir) => dir,
            None => match std::env::var(CONFIG_DIR_ENV) {
                Ok(dir) => PathBuf::from(dir),
                // Default to repo root `config` directory.
                Err(_) => std::env::current_dir()
                    .context("unable to resolve current directory")?
                    .join("config"),
            },
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", env_file_stem(&environment)));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.protected_operations"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The env var decides the environment, not the files.
        settings.environment = environment;

        Ok(settings)
    }
}

fn env_file_stem(environment: &Environment) -> &'static str {
    match environment {
        Environment::Local => "local",
        Environment::Staging => "staging",
        Environment::Production => "production",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://bookshelf.db".to_string()
    }

    fn default_max_connections() -> u32 {
        10
    }

    fn default_min_connections() -> u32 {
        1
    }

    fn default_acquire_timeout_secs() -> u64 {
        30
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout_secs: self.acquire_timeout_secs,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            min_connections: Self::default_min_connections(),
            acquire_timeout_secs: Self::default_acquire_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Shared-secret credential and the operations that require it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "AuthSettings::default_api_key")]
    pub api_key: String,
    /// Operation names (`create`, `update`, `delete`) gated by the API key.
    #[serde(default = "AuthSettings::default_protected_operations")]
    pub protected_operations: Vec<String>,
}

impl AuthSettings {
    fn default_api_key() -> String {
        "SecretKey".to_string()
    }

    // Only create is gated by default. Whether update and delete should be
    // gated too is pending product-owner confirmation.
    fn default_protected_operations() -> Vec<String> {
        vec!["create".to_string()]
    }

    /// Copy with the API key masked, for printing.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: "***".to_string(),
            protected_operations: self.protected_operations.clone(),
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("api_key", &"***")
            .field("protected_operations", &self.protected_operations)
            .finish()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            api_key: Self::default_api_key(),
            protected_operations: Self::default_protected_operations(),
        }
    }
}
