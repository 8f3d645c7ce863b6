//! Configuration file handling
//!
//! One TOML file describes the gateways (`[environments.<name>]`), client and
//! resolver tunables, where sessions are persisted, and the legacy field
//! names. Every section is optional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::constants::{DEFAULT_DATE_FIELDS, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};
use crate::api::{ApiError, ClientOptions, Credentials, FileSessionStore, LegacyClient, SessionStore};
use crate::sync::{FieldMap, SyncOptions};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV_VAR: &str = "ERP_SYNC_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_environment: Option<String>,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    pub client: ClientConfig,
    pub resolver: ResolverConfig,
    pub session: SessionConfig,
    pub mapping: FieldMap,
}

/// One legacy gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub timeout_secs: u64,
    pub page_size: usize,
    pub fail_on_filter_error: bool,
    pub date_fields: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            fail_on_filter_error: true,
            date_fields: DEFAULT_DATE_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file; defaults to `<config dir>/erp-sync/sessions.json`
    pub store_path: Option<PathBuf>,
}

impl Config {
    /// `<config dir>/erp-sync/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("erp-sync").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load from `explicit`, `$ERP_SYNC_CONFIG`, or the default location
    ///
    /// An explicitly named file must exist. A missing default file yields the
    /// default configuration.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = named {
            log::debug!("Loading config from {}", path.display());
            return Self::load(&path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                log::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Pick an environment by name, falling back to the default one
    ///
    /// With no name and no default, a single configured environment is used.
    pub fn environment(&self, name: Option<&str>) -> Result<(&str, &EnvironmentConfig), ApiError> {
        let name = match name.or(self.default_environment.as_deref()) {
            Some(name) => name,
            None if self.environments.len() == 1 => {
                return self
                    .environments
                    .iter()
                    .next()
                    .map(|(name, env)| (name.as_str(), env))
                    .ok_or_else(|| ApiError::Configuration("no environments configured".to_string()));
            }
            None => {
                return Err(ApiError::Configuration(
                    "no environment selected; pass --env or set default_environment".to_string(),
                ));
            }
        };

        self.environments
            .get_key_value(name)
            .map(|(name, env)| (name.as_str(), env))
            .ok_or_else(|| {
                let known = self.environments.keys().cloned().collect::<Vec<_>>().join(", ");
                ApiError::Configuration(format!(
                    "unknown environment '{}' (configured: {})",
                    name,
                    if known.is_empty() { "none".to_string() } else { known }
                ))
            })
    }

    /// Credentials for an environment, after environment variable overrides
    ///
    /// `prompt` is asked for the password when none is configured.
    pub fn credentials(
        &self,
        name: &str,
        env: &EnvironmentConfig,
        prompt: impl FnOnce(&str) -> Option<String>,
    ) -> Option<Credentials> {
        resolve_credentials(name, env, |key| std::env::var(key).ok(), prompt)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.client.timeout_secs),
            page_size: self.client.page_size,
            fail_on_filter_error: self.client.fail_on_filter_error,
            date_fields: self.client.date_fields.clone(),
        }
    }

    /// Resolver settings; fetch options are left to the caller
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            max_attempts: self.resolver.max_attempts,
            backoff: Duration::from_secs(self.resolver.backoff_secs),
            ..SyncOptions::default()
        }
    }

    pub fn session_store(&self) -> Result<Arc<dyn SessionStore>> {
        let store = match &self.session.store_path {
            Some(path) => FileSessionStore::new(path),
            None => FileSessionStore::default_location()?,
        };
        log::debug!("Session store at {}", store.path().display());
        Ok(Arc::new(store))
    }

    /// Client for a configured environment
    pub fn client(
        &self,
        name: Option<&str>,
        prompt: impl FnOnce(&str) -> Option<String>,
    ) -> Result<LegacyClient> {
        let (name, env) = self.environment(name)?;
        let credentials = self.credentials(name, env, prompt);
        if credentials.is_none() {
            log::warn!("No credentials for environment '{}', relying on a stored session", name);
        }

        let client = LegacyClient::new(&env.base_url, credentials, self.session_store()?, self.client_options())
            .with_context(|| format!("Failed to set up client for environment '{}'", name))?;
        Ok(client)
    }
}

/// `ERP_SYNC_<NAME>_<SUFFIX>`, with the name upper-cased and dashes replaced
pub fn env_var_name(environment: &str, suffix: &str) -> String {
    let name: String = environment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("ERP_SYNC_{}_{}", name, suffix)
}

fn resolve_credentials(
    name: &str,
    env: &EnvironmentConfig,
    lookup: impl Fn(&str) -> Option<String>,
    prompt: impl FnOnce(&str) -> Option<String>,
) -> Option<Credentials> {
    let username = lookup(&env_var_name(name, "USERNAME"))
        .or_else(|| env.username.clone())
        .filter(|u| !u.is_empty())?;
    let password = lookup(&env_var_name(name, "PASSWORD"))
        .or_else(|| env.password.clone())
        .or_else(|| prompt(&username))?;
    Some(Credentials::new(username, password))
}
