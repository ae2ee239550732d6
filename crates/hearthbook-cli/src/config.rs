//! Connection settings.
//!
//! Sources, later ones winning: built-in defaults, `.config/hearthbook.toml`
//! (searched for from the current directory upwards, or given with
//! `--config`), then `DB_*` environment variables.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = ".config/hearthbook.toml";

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    /// Database name
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: Option<String>,
}

/// figment types env values, so `DB_PASSWORD=12345` arrives as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    UInt(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Str(s) => s,
        Scalar::UInt(n) => n.to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5433,
            name: None,
            username: None,
            password: None,
        }
    }
}

impl DbConfig {
    /// Build a driver config, failing if anything needed to log in is unset.
    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config, ConfigError> {
        let name = self.name.as_deref().ok_or(ConfigError::Missing("DB_NAME"))?;
        let username = self
            .username
            .as_deref()
            .ok_or(ConfigError::Missing("DB_USERNAME"))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ConfigError::Missing("DB_PASSWORD"))?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(name)
            .user(username)
            .password(password)
            .application_name("hearthbook");
        Ok(config)
    }

    /// `user@host:port/db`, never the password.
    pub fn endpoint(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username.as_deref().unwrap_or("?"),
            self.host,
            self.port,
            self.name.as_deref().unwrap_or("?")
        )
    }
}

/// Load settings starting from the current directory.
pub fn load(explicit: Option<&Path>) -> Result<(DbConfig, Option<PathBuf>), ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
    load_from(&cwd, explicit)
}

/// Load settings, searching for the config file from `start` upwards unless
/// `explicit` names one.
pub fn load_from(
    start: &Path,
    explicit: Option<&Path>,
) -> Result<(DbConfig, Option<PathBuf>), ConfigError> {
    let config_path = match explicit {
        Some(path) if path.is_file() => Some(path.to_path_buf()),
        Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
        None => find_config_file(start),
    };

    let mut figment = Figment::from(Serialized::defaults(DbConfig::default()));
    if let Some(path) = &config_path {
        figment = figment.merge(Toml::file(path));
    }
    let config: DbConfig = figment
        .merge(Env::prefixed("DB_"))
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok((config, config_path))
}

/// Find `.config/hearthbook.toml` by searching up the directory tree.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A config file given on the command line doesn't exist
    NotFound(PathBuf),
    /// I/O error reading the environment
    Io(String),
    /// A source had a value of the wrong shape
    Parse(String),
    /// A required setting is unset
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => {
                write!(f, "config file {} does not exist", path.display())
            }
            ConfigError::Io(e) => write!(f, "failed to read configuration: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid configuration: {}", e),
            ConfigError::Missing(var) => write!(
                f,
                "{} is not set (set it in the environment, .env or {})",
                var, CONFIG_FILE
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
