//! Daemon configuration.
//!
//! Read from an optional TOML file; every key has a default so an empty or
//! missing file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub groups: GroupsConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// Capacity used when `groups.create` does not pass one.
    #[serde(default = "default_max_members")]
    pub default_max_members: u32,
    #[serde(default = "default_max_members_limit")]
    pub max_members_limit: u32,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            default_max_members: default_max_members(),
            max_members_limit: default_max_members_limit(),
        }
    }
}

fn default_max_members() -> u32 {
    4
}

fn default_max_members_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            max_tags: default_max_tags(),
        }
    }
}

fn default_max_tags() -> usize {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Emails created as admins on their first local login.
    #[serde(default)]
    pub bootstrap_admins: Vec<String>,
}

impl AuthConfig {
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.bootstrap_admins
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Unset keeps the HTTP client's own defaults.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Used when PORTALD_LOG is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl PortalConfig {
    /// Load config from disk, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: PortalConfig = toml::from_str(content)?;
        if config.groups.max_members_limit == 0 {
            anyhow::bail!("groups.max_members_limit must be at least 1");
        }
        if config.groups.default_max_members == 0
            || config.groups.default_max_members > config.groups.max_members_limit
        {
            anyhow::bail!(
                "groups.default_max_members must be in 1..={}",
                config.groups.max_members_limit
            );
        }
        Ok(config)
    }
}
