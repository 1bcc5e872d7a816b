use auditmark_core::Account;
use auditmark_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RootError, RootResult};

/// Accounts bootstrapped into the role registry at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolesConfig {
    /// Accounts holding the administrator role. At least one is required.
    #[serde(default)]
    pub administrators: Vec<Account>,

    /// Accounts holding the issuer role.
    #[serde(default)]
    pub issuers: Vec<Account>,
}

/// Server identity advertised on `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default = "default_server_version")]
    pub server_version: String,
}

fn default_server_name() -> String {
    "auditmark".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            server_version: default_server_version(),
        }
    }
}

/// Top-level configuration for the auditmark binary.
///
/// Loaded from a TOML file (typically `~/.auditmark/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Lifecycle engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Role bootstrap.
    #[serde(default)]
    pub roles: RolesConfig,
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl RootConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> RootResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(RootError::Io)?;
        let config: RootConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RootError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(RootError::Io)?;
        }
        std::fs::write(path, contents).map_err(RootError::Io)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> RootResult<()> {
        if self.roles.administrators.is_empty() {
            return Err(RootError::Config(
                "at least one administrator is required in [roles]".into(),
            ));
        }
        let mut all = self
            .roles
            .administrators
            .iter()
            .chain(self.roles.issuers.iter());
        if all.any(Account::is_null) {
            return Err(RootError::Config(
                "the null account cannot hold a role".into(),
            ));
        }
        if self.engine.max_reason_len == 0 {
            return Err(RootError::Config("max_reason_len must be > 0".into()));
        }
        Ok(())
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".auditmark/config.toml")
    }
}
