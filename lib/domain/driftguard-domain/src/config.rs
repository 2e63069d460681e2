//! Controller configuration, loaded from YAML.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::handoff::HandoffDocument;
use crate::severity::SeverityLevel;

pub const DEFAULT_APPLICATION_NAMESPACE: &str = "argocd";
/// The API server rejects watch timeouts of 295s and above.
pub const MAX_IDLE_TIMEOUT_SECS: u32 = 294;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub cluster: ClusterConfig,
    pub watch: WatchConfig,
    pub health: HealthConfig,
    pub notifications: NotificationsConfig,
    pub audit: AuditConfig,
    pub handoff: HandoffConfig,
}

impl ControllerConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Self::load_from_path`], but an absent file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from_path(path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let WatchScope::Namespaced { namespace } = &self.watch.scope {
            if namespace.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    reason: "watch.scope.namespace must not be empty".to_string(),
                });
            }
        }
        if self.watch.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "watch.idle_timeout_secs must be positive".to_string(),
            });
        }
        if self.watch.backoff_cap_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "watch.backoff_cap_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    #[default]
    Live,
    /// No cluster connection: mutations are recorded, never sent.
    Offline,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub mode: ClusterMode,
    /// Application objects replayed once in offline mode.
    pub fixtures: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchScope {
    Namespaced { namespace: String },
    Cluster,
}

impl Default for WatchScope {
    fn default() -> Self {
        WatchScope::Namespaced {
            namespace: DEFAULT_APPLICATION_NAMESPACE.to_string(),
        }
    }
}

impl fmt::Display for WatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchScope::Namespaced { namespace } => write!(f, "namespace {namespace}"),
            WatchScope::Cluster => f.write_str("all namespaces"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub scope: WatchScope,
    pub idle_timeout_secs: u32,
    pub max_retries: u32,
    pub backoff_cap_secs: u64,
}

impl WatchConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(
            self.idle_timeout_secs.min(MAX_IDLE_TIMEOUT_SECS),
        ))
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            scope: WatchScope::default(),
            idle_timeout_secs: 290,
            max_retries: 5,
            backoff_cap_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub bind: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub ntfy: Option<NtfyConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtfyConfig {
    pub url: String,
    pub topic: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: SeverityLevel,
}

fn default_min_severity() -> SeverityLevel {
    SeverityLevel::Medium
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Namespace for audit ConfigMaps; unset disables them.
    pub configmap_namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// An explicit `null` disables the analysis document.
    pub path: Option<PathBuf>,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            path: Some(HandoffDocument::default_path()),
        }
    }
}
