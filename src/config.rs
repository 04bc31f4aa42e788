use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub mongo: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Which movie store backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongo,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown store backend '{}'", other),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Mongo => write!(f, "mongo"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
}

/// MongoDB connection settings.
///
/// Defaults target the demo replica set and are not meant for production.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub conn_str: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub collection: String,
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            conn_str: "mongodb://mongo-0.mongo,mongo-1.mongo,mongo-2.mongo:27017/moviedb"
                .to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
            database: "moviedb".to_string(),
            collection: "movies".to_string(),
            connect_timeout_secs: 10,
            operation_timeout_secs: 5,
        }
    }
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("conn_str", &self.redacted_conn_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

impl MongoConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Connection string with any embedded user info masked, for logging
    pub fn redacted_conn_str(&self) -> String {
        let Some((scheme, rest)) = self.conn_str.split_once("://") else {
            return self.conn_str.clone();
        };
        let authority_end = rest.find('/').unwrap_or(rest.len());
        match rest[..authority_end].rfind('@') {
            Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
            None => self.conn_str.clone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional TOML file, then the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        Self::from_toml(&raw).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `PORT`, `STORE_BACKEND` and `MONGO_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(conn_str) = lookup("MONGO_CONN_STR") {
            self.mongo.conn_str = conn_str;
        }
        if let Some(username) = lookup("MONGO_USERNAME") {
            self.mongo.username = username;
        }
        if let Some(password) = lookup("MONGO_PASSWORD") {
            self.mongo.password = password;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.storage.backend == StoreBackend::Mongo {
            let mongo = &self.mongo;
            if mongo.conn_str.trim().is_empty() {
                bail!("mongo.conn_str cannot be empty");
            }
            if mongo.database.trim().is_empty() || mongo.collection.trim().is_empty() {
                bail!("mongo.database and mongo.collection cannot be empty");
            }
            if mongo.connect_timeout_secs == 0 || mongo.operation_timeout_secs == 0 {
                bail!("mongo timeouts must be non-zero");
            }
        }
        Ok(())
    }
}
