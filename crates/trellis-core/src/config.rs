//! Runtime configuration.
//!
//! Resolution order, later wins: built-in defaults, `config.toml` in the
//! user config directory, the `TRELLIS_DB` environment variable, then
//! whatever the caller sets explicitly (the CLI `--db` flag).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the application directory under the user config dir.
pub const APP_NAME: &str = "trellis";

/// Environment variable overriding the database path.
pub const DB_ENV_VAR: &str = "TRELLIS_DB";

const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "graph.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl Config {
    /// `<user config dir>/trellis`, if the platform has one.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME))
    }

    /// Load from the user config directory and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config.toml` exists but cannot be read
    /// or parsed.
    pub fn load() -> Result<Self> {
        let env_db = std::env::var_os(DB_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::load_from(Self::config_dir().as_deref(), env_db)
    }

    /// Load from an explicit config directory and database override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config.toml` exists but cannot be read
    /// or parsed.
    pub fn load_from(dir: Option<&Path>, db_override: Option<PathBuf>) -> Result<Self> {
        let mut config = match dir.map(|d| d.join(CONFIG_FILE)) {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path).map_err(|err| {
                    Error::Config(format!("failed to read {}: {err}", path.display()))
                })?;
                Self::from_toml(&content)
                    .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?
            }
            _ => Self::default(),
        };
        if let Some(path) = db_override {
            config.database = path;
        }
        Ok(config)
    }

    /// Parse TOML text; missing keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed input.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Replace the database path.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }
}

fn default_database() -> PathBuf {
    Config::config_dir()
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_NAME}")))
        .join(DB_FILE)
}
