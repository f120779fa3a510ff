use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Environment variable holding the store connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Environment variable holding the database name.
pub const ENV_DATABASE_NAME: &str = "DATABASE_NAME";
/// Environment variable holding the HTTP listening port.
pub const ENV_PORT: &str = "PORT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WispConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub name: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: None,
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Both the connection string and the database name are set.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.name.is_some()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl HttpConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl WispConfig {
    /// Load from an optional TOML file, then apply `DATABASE_URL`,
    /// `DATABASE_NAME` and `PORT` from the process environment.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`WispConfig::load`] with an injectable environment lookup.
    /// Empty values count as unset.
    pub fn load_with_env<F>(path: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .set_override_option("database.url", lookup(ENV_DATABASE_URL))?
            .set_override_option("database.name", lookup(ENV_DATABASE_NAME))?
            .set_override_option("http.port", lookup(ENV_PORT))?
            .build()?;
        s.try_deserialize()
    }
}
