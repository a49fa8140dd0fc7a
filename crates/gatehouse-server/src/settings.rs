//! Process settings for the Gatehouse bootstrap binary.

use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use gatehouse_db::DbConfig;
use gatehouse_service::{SeedConfig, ServiceConfig};
use serde::Deserialize;

const CONFIG_FILE: &str = "gatehouse.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let db = DbConfig::default();
        Self {
            url: db.url,
            namespace: db.namespace,
            database: db.database,
            username: db.username,
            password: db.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "gatehouse=info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub pepper: Option<String>,
    pub min_password_length: usize,
    pub seed: SeedSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            pepper: service.pepper,
            min_password_length: service.min_password_length,
            seed: SeedSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    /// Seed default data into an empty store at startup.
    pub enabled: bool,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_group: String,
    pub admin_role: String,
}

impl Default for SeedSettings {
    fn default() -> Self {
        let seed = SeedConfig::default();
        Self {
            enabled: true,
            admin_username: seed.admin_username,
            admin_email: seed.admin_email,
            admin_password: seed.admin_password,
            admin_group: seed.admin_group,
            admin_role: seed.admin_role,
        }
    }
}

impl Settings {
    /// Load `.env`, then `gatehouse.toml` if present, then `GATEHOUSE_*`
    /// variables. Nested keys use `__`, e.g. `GATEHOUSE_DATABASE__URL`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix("GATEHOUSE")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from TOML text alone.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database.url.clone(),
            namespace: self.database.namespace.clone(),
            database: self.database.database.clone(),
            username: self.database.username.clone(),
            password: self.database.password.clone(),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        let seed = &self.service.seed;
        ServiceConfig {
            pepper: self.service.pepper.clone(),
            min_password_length: self.service.min_password_length,
            seed: SeedConfig {
                admin_username: seed.admin_username.clone(),
                admin_email: seed.admin_email.clone(),
                admin_password: seed.admin_password.clone(),
                admin_group: seed.admin_group.clone(),
                admin_role: seed.admin_role.clone(),
                ..SeedConfig::default()
            },
        }
    }
}
