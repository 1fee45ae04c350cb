use chrono::{DateTime, TimeZone, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for Server {
    fn default() -> Self {
        Server {
            listen: default_listen(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    /// Without an API key tokens are not checked and every request acts as
    /// `dev_user_id`.
    pub api_key: Option<String>,
    #[serde(default = "default_auth_url")]
    pub base_url: String,
    #[serde(default = "default_dev_user")]
    pub dev_user_id: String,
}

fn default_auth_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_dev_user() -> String {
    "dev-user-001".to_string()
}

impl Default for Auth {
    fn default() -> Self {
        Auth {
            api_key: None,
            base_url: default_auth_url(),
            dev_user_id: default_dev_user(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Credits {
    pub starting_balance: i64,
}

impl Default for Credits {
    fn default() -> Self {
        Credits {
            starting_balance: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Badges {
    pub early_adopter_cutoff: DateTime<Utc>,
}

impl Default for Badges {
    fn default() -> Self {
        Badges {
            early_adopter_cutoff: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,
    pub postgres: Postgres,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub badges: Badges,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("CORAIL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
