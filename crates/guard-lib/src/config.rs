//! Connection configuration for the Proxmox API
//!
//! Values are layered from lowest to highest precedence:
//! - `PROXMOX_*` variables in the process environment
//! - the default env file (skipped when absent)
//! - a user supplied env file (must be readable)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ConfigError;

/// Prefix shared by every recognised key
const KEY_PREFIX: &str = "PROXMOX";

pub const HOST_KEY: &str = "PROXMOX_HOST";
pub const NODE_KEY: &str = "PROXMOX_NODE";
pub const TOKEN_ID_KEY: &str = "PROXMOX_TOKEN_ID";
pub const TOKEN_SECRET_KEY: &str = "PROXMOX_TOKEN_SECRET";
pub const VERIFY_TLS_KEY: &str = "PROXMOX_VERIFY_TLS";
pub const TIMEOUT_KEY: &str = "PROXMOX_TIMEOUT_SECS";

fn default_timeout_secs() -> u64 {
    30
}

/// Validated connection settings
#[derive(Clone)]
pub struct ProxmoxConfig {
    /// Base URL without trailing slash, e.g. `https://pve.local:8006`
    pub host: String,
    pub node: String,
    pub token_id: String,
    pub token_secret: String,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl fmt::Debug for ProxmoxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxmoxConfig")
            .field("host", &self.host)
            .field("node", &self.node)
            .field("token_id", &self.token_id)
            .field("token_secret", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProxmoxConfig {
    /// Value for the `Authorization` header
    pub fn auth_header(&self) -> String {
        format!("PVEAPIToken={}={}", self.token_id, self.token_secret)
    }
}

/// Keys as they come out of the layered sources, before validation
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    host: Option<String>,
    node: Option<String>,
    token_id: Option<String>,
    token_secret: Option<String>,
    verify_tls: Option<String>,
    timeout_secs: Option<String>,
}

/// Builder for [`ProxmoxConfig`]
#[derive(Debug, Default)]
pub struct ConfigLoader {
    default_file: Option<PathBuf>,
    override_file: Option<PathBuf>,
    environment: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Env file applied if it exists
    pub fn default_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_file = Some(path.into());
        self
    }

    /// Env file that must exist and overrides the default file
    pub fn override_file(mut self, path: Option<PathBuf>) -> Self {
        self.override_file = path;
        self
    }

    /// Replace the process environment, used by tests
    pub fn environment(mut self, vars: config::Map<String, String>) -> Self {
        self.environment = Some(vars);
        self
    }

    pub fn load(self) -> Result<ProxmoxConfig, ConfigError> {
        let mut builder = config::Config::builder().add_source(
            config::Environment::with_prefix(KEY_PREFIX)
                .try_parsing(false)
                .source(self.environment),
        );

        if let Some(path) = self.default_file.as_deref() {
            if path.exists() {
                builder = apply_env_file(builder, path)?;
            } else {
                debug!(path = %path.display(), "Default env file not found, skipping");
            }
        }

        if let Some(path) = self.override_file.as_deref() {
            builder = apply_env_file(builder, path)?;
        }

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        validate(raw)
    }
}

fn apply_env_file(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
    path: &Path,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    let env_file_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let entries = dotenv::from_path_iter(path).map_err(env_file_error)?;
    let mut applied = 0usize;
    for entry in entries {
        let (key, value) = entry.map_err(env_file_error)?;
        if let Some(name) = config_key(&key) {
            builder = builder.set_override(name, value)?;
            applied += 1;
        }
    }

    debug!(path = %path.display(), keys = applied, "Loaded env file");
    Ok(builder)
}

/// Map `PROXMOX_TOKEN_ID` to `token_id`; other keys are ignored
fn config_key(key: &str) -> Option<String> {
    let upper = key.trim().to_ascii_uppercase();
    upper
        .strip_prefix(KEY_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_ascii_lowercase)
}

fn validate(raw: RawConfig) -> Result<ProxmoxConfig, ConfigError> {
    let host = required(raw.host, HOST_KEY)?;
    let node = required(raw.node, NODE_KEY)?;
    let token_id = required(raw.token_id, TOKEN_ID_KEY)?;
    let token_secret = required(raw.token_secret, TOKEN_SECRET_KEY)?;

    let host = host.trim_end_matches('/').to_string();
    Url::parse(&host).map_err(|e| ConfigError::Invalid {
        key: HOST_KEY,
        reason: e.to_string(),
    })?;

    let verify_tls = match optional(raw.verify_tls) {
        Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
            key: VERIFY_TLS_KEY,
            reason: format!("expected true or false, got '{}'", value),
        })?,
        None => true,
    };

    let timeout_secs = match optional(raw.timeout_secs) {
        Some(value) => value.parse::<u64>().map_err(|e| ConfigError::Invalid {
            key: TIMEOUT_KEY,
            reason: e.to_string(),
        })?,
        None => default_timeout_secs(),
    };

    Ok(ProxmoxConfig {
        host,
        node,
        token_id,
        token_secret,
        verify_tls,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(key))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
