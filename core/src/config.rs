//! Configuration for opening a token store.
//!
//! Loaded from TOML, then optionally overridden by environment variables:
//!
//! - `AUTHNET_STORAGE_BACKEND`: `memory`, `file` or `keychain`
//! - `AUTHNET_STORAGE_PATH`: directory for the file backend
//! - `AUTHNET_KEYCHAIN_SERVICE`: service name for the keychain backend
//! - `AUTHNET_DEFAULT_EXPIRES_IN`: default token lifetime in seconds
//!
//! ```toml
//! default_expires_in = 3600
//!
//! [storage]
//! backend = "file"
//! path = "/var/lib/app/auth"
//!
//! [keys]
//! session = "AuthSession"
//! custom_header = "auth_custom_header"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::record::DEFAULT_EXPIRES_IN;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::token_store::{StoreKeys, TokenStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Keychain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for `StorageBackend::File`.
    pub path: Option<PathBuf>,
    /// Service name for `StorageBackend::Keychain`.
    pub service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthnetConfig {
    pub default_expires_in: f64,
    pub storage: StorageConfig,
    pub keys: StoreKeys,
}

impl Default for AuthnetConfig {
    fn default() -> Self {
        Self {
            default_expires_in: DEFAULT_EXPIRES_IN,
            storage: StorageConfig::default(),
            keys: StoreKeys::default(),
        }
    }
}

impl AuthnetConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded authnet config");
        Self::from_toml_str(&raw)
    }

    /// Apply `AUTHNET_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `AUTHNET_*` overrides from an arbitrary lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(backend) = lookup("AUTHNET_STORAGE_BACKEND") {
            self.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "file" => StorageBackend::File,
                "keychain" => StorageBackend::Keychain,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "unknown storage backend {other:?}"
                    )))
                }
            };
        }
        if let Some(path) = lookup("AUTHNET_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(service) = lookup("AUTHNET_KEYCHAIN_SERVICE") {
            self.storage.service = Some(service);
        }
        if let Some(raw) = lookup("AUTHNET_DEFAULT_EXPIRES_IN") {
            self.default_expires_in = raw.parse().map_err(|e| {
                ConfigError::Invalid(format!("AUTHNET_DEFAULT_EXPIRES_IN={raw:?}: {e}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_expires_in.is_finite() || self.default_expires_in < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_expires_in must be a non-negative number, got {}",
                self.default_expires_in
            )));
        }
        if self.keys.session.is_empty() || self.keys.custom_header.is_empty() {
            return Err(ConfigError::Invalid("storage keys must not be empty".to_string()));
        }
        if self.keys.session == self.keys.custom_header {
            return Err(ConfigError::Invalid(
                "session and custom header keys must differ".to_string(),
            ));
        }
        match self.storage.backend {
            StorageBackend::File if self.storage.path.is_none() => Err(ConfigError::Invalid(
                "file storage needs storage.path".to_string(),
            )),
            StorageBackend::Keychain if self.storage.service.is_none() => Err(
                ConfigError::Invalid("keychain storage needs storage.service".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Build the configured backend.
    pub fn open_backend(&self) -> Result<Box<dyn KeyValueStore>, ConfigError> {
        self.validate()?;
        match self.storage.backend {
            StorageBackend::Memory => Ok(Box::new(MemoryStore::new())),
            StorageBackend::File => {
                let path = self.storage.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("file storage needs storage.path".to_string())
                })?;
                Ok(Box::new(FileStore::open(path)?))
            }
            StorageBackend::Keychain => self.open_keychain(),
        }
    }

    #[cfg(feature = "keychain")]
    fn open_keychain(&self) -> Result<Box<dyn KeyValueStore>, ConfigError> {
        let service = self.storage.service.clone().ok_or_else(|| {
            ConfigError::Invalid("keychain storage needs storage.service".to_string())
        })?;
        Ok(Box::new(crate::storage::KeychainStore::new(service)))
    }

    #[cfg(not(feature = "keychain"))]
    fn open_keychain(&self) -> Result<Box<dyn KeyValueStore>, ConfigError> {
        Err(ConfigError::Invalid(
            "keychain storage requires the `keychain` feature".to_string(),
        ))
    }

    /// Open a token store with the configured backend, keys and default
    /// lifetime.
    pub fn open_store(&self) -> Result<TokenStore<Box<dyn KeyValueStore>>, ConfigError> {
        Ok(TokenStore::new(self.open_backend()?)
            .with_keys(self.keys.clone())
            .with_default_expiry(self.default_expires_in))
    }
}
