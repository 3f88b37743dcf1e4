// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Node Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing where
// the entity store lives and how executions are supervised. Configuration is
// handed to constructors explicitly; nothing here is process-global.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "AgentryConfig";

pub const ENV_CONFIG_PATH: &str = "AGENTRY_CONFIG_PATH";
pub const ENV_STORAGE_ROOT: &str = "AGENTRY_STORAGE_ROOT";
pub const ENV_EXECUTION_TIMEOUT: &str = "AGENTRY_EXECUTION_TIMEOUT_SECS";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentryConfig {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AgentryConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: ConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSpec {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Directory holding one subdirectory per collection
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// "local" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Upper bound on a single run; 0 disables the limit
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts made to persist a terminal state before giving up
    #[serde(default = "default_persist_attempts")]
    pub persist_attempts: u32,

    #[serde(default = "default_persist_backoff_ms")]
    pub persist_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_storage_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".agentry").join("data"))
        .unwrap_or_else(|| PathBuf::from(".agentry/data"))
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_persist_attempts() -> u32 {
    3
}

fn default_persist_backoff_ms() -> u64 {
    100
}

fn default_event_capacity() -> usize {
    1000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            backend: default_storage_backend(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            persist_attempts: default_persist_attempts(),
            persist_backoff_ms: default_persist_backoff_ms(),
        }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn persist_backoff(&self) -> Duration {
        Duration::from_millis(self.persist_backoff_ms)
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl Default for AgentryConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ConfigMetadata {
                name: "agentry".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: ConfigSpec::default(),
        }
    }
}

impl AgentryConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. AGENTRY_CONFIG_PATH environment variable
    /// 2. ./agentry-config.yaml (working directory)
    /// 3. ~/.agentry/config.yaml (user home)
    /// 4. /etc/agentry/config.yaml (system, Unix) or C:\ProgramData\Agentry\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./agentry-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".agentry").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/agentry/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Agentry\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::debug!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injectable variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_STORAGE_ROOT).filter(|v| !v.trim().is_empty()) {
            tracing::info!("Environment override: {}={}", ENV_STORAGE_ROOT, root);
            self.spec.storage.root = PathBuf::from(root);
        }

        if let Some(val) = lookup(ENV_EXECUTION_TIMEOUT) {
            match val.trim().parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: {}={}", ENV_EXECUTION_TIMEOUT, secs);
                    self.spec.execution.timeout_secs = secs;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected whole seconds. Ignoring.",
                        ENV_EXECUTION_TIMEOUT,
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.trim().is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.storage.root.as_os_str().is_empty() {
            anyhow::bail!("spec.storage.root cannot be empty");
        }

        if !matches!(self.spec.storage.backend.as_str(), "local" | "memory") {
            anyhow::bail!(
                "Invalid spec.storage.backend: '{}'. Must be 'local' or 'memory'",
                self.spec.storage.backend
            );
        }

        if self.spec.execution.persist_attempts == 0 {
            anyhow::bail!("spec.execution.persistAttempts must be at least 1");
        }

        if self.spec.events.capacity == 0 {
            anyhow::bail!("spec.events.capacity must be positive");
        }

        Ok(())
    }
}
