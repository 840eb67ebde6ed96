//! Wallet settings
//!
//! Loaded in three layers: built in defaults, then an optional TOML file,
//! then `CDK_METERED_*` environment variables.

use std::env;
use std::path::PathBuf;

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::node::http_client::normalize_base_url;

/// Node url env var
pub const ENV_NODE_URL: &str = "CDK_METERED_NODE_URL";
/// Mint url env var
pub const ENV_MINT_URL: &str = "CDK_METERED_MINT_URL";
/// Unit env var
pub const ENV_UNIT: &str = "CDK_METERED_UNIT";
/// Refund after request env var
pub const ENV_REFUND_AFTER_REQUEST: &str = "CDK_METERED_REFUND_AFTER_REQUEST";
/// Storage backend env var
pub const ENV_STORAGE_BACKEND: &str = "CDK_METERED_STORAGE_BACKEND";
/// Storage path env var
pub const ENV_STORAGE_PATH: &str = "CDK_METERED_STORAGE_PATH";

const DEFAULT_DIR_NAME: &str = ".cdk-metered";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory, lost on exit
    #[default]
    Memory,
    /// One JSON file per key
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(Error::Validation(format!("Unknown storage backend: {other}"))),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// Backend
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the file backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Wallet settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Metered node base url
    pub node_url: String,
    /// Mint url
    pub mint_url: String,
    /// Token unit
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Reclaim the node remainder after every paid request
    #[serde(default = "default_refund_after_request")]
    pub refund_after_request: bool,
    /// Storage
    #[serde(default)]
    pub storage: Storage,
}

fn default_unit() -> String {
    "sat".to_string()
}

fn default_refund_after_request() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_url: String::new(),
            mint_url: String::new(),
            unit: default_unit(),
            refund_after_request: default_refund_after_request(),
            storage: Storage::default(),
        }
    }
}

impl Settings {
    /// Load settings
    ///
    /// Without `config_file_name` the file `~/.cdk-metered/config.toml` is
    /// read if it exists. Environment overrides are applied last and the
    /// result is validated.
    pub fn load<P>(config_file_name: Option<P>) -> Result<Self, Error>
    where
        P: Into<PathBuf>,
    {
        let settings = Self::new_from_default(&Self::default(), config_file_name)
            .map_err(|e| Error::Validation(format!("Could not read config: {e}")))?
            .from_env()?;
        settings.validate()?;
        Ok(settings)
    }

    fn new_from_default<P>(
        default: &Settings,
        config_file_name: Option<P>,
    ) -> Result<Self, ConfigError>
    where
        P: Into<PathBuf>,
    {
        let (config_file, required) = match config_file_name {
            Some(path) => (path.into(), true),
            None => match default_work_dir() {
                Some(dir) => (dir.join(CONFIG_FILE_NAME), false),
                None => return Ok(default.clone()),
            },
        };

        let config: Config = Config::builder()
            // use defaults
            .add_source(Config::try_from(default)?)
            // override with file contents
            .add_source(File::from(config_file).required(required))
            .build()?;

        config.try_deserialize()
    }

    /// Apply `CDK_METERED_*` environment overrides
    pub fn from_env(mut self) -> Result<Self, Error> {
        if let Ok(node_url) = env::var(ENV_NODE_URL) {
            self.node_url = node_url;
        }

        if let Ok(mint_url) = env::var(ENV_MINT_URL) {
            self.mint_url = mint_url;
        }

        if let Ok(unit) = env::var(ENV_UNIT) {
            self.unit = unit;
        }

        if let Ok(refund_str) = env::var(ENV_REFUND_AFTER_REQUEST) {
            self.refund_after_request = refund_str.parse().map_err(|_| {
                Error::Validation(format!("{ENV_REFUND_AFTER_REQUEST} must be true or false"))
            })?;
        }

        if let Ok(backend) = env::var(ENV_STORAGE_BACKEND) {
            self.storage.backend = backend.parse()?;
        }

        if let Ok(path) = env::var(ENV_STORAGE_PATH) {
            self.storage.path = Some(PathBuf::from(path));
        }

        Ok(self)
    }

    /// Check urls, unit and storage
    pub fn validate(&self) -> Result<(), Error> {
        normalize_base_url(&self.node_url)
            .map_err(|e| Error::Validation(format!("Invalid node url: {e}")))?;

        let mint_url = Url::parse(self.mint_url.trim())
            .map_err(|e| Error::Validation(format!("Invalid mint url: {e}")))?;
        if !matches!(mint_url.scheme(), "http" | "https") {
            return Err(Error::Validation(format!(
                "Unsupported mint url scheme: {}",
                mint_url.scheme()
            )));
        }

        if self.unit.trim().is_empty() {
            return Err(Error::Validation("Unit is empty".to_string()));
        }

        if self.storage.backend == StorageBackend::File && self.storage_path().is_none() {
            return Err(Error::Validation(
                "File storage needs a path or a home directory".to_string(),
            ));
        }

        Ok(())
    }

    /// Directory used by the file backend
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage
            .path
            .clone()
            .or_else(|| default_work_dir().map(|dir| dir.join("data")))
    }
}

fn default_work_dir() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(DEFAULT_DIR_NAME))
}
