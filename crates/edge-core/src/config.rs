//! Route and runtime configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mode::{HostModel, RouteRenderMode, RuntimeMode};

/// Environment variable selecting the runtime mode.
pub const ENV_RUNTIME_MODE: &str = "EDGE_RUNTIME_MODE";
/// Environment variable selecting the host model.
pub const ENV_HOST_MODEL: &str = "EDGE_HOST_MODEL";
/// Environment variable overriding the deferred task timeout (milliseconds).
pub const ENV_DEFERRED_TIMEOUT_MS: &str = "EDGE_DEFERRED_TIMEOUT_MS";

/// Configuration for a single route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route pattern (e.g., "/products/:id").
    pub pattern: String,
    /// Handler function name.
    pub handler: String,
    /// HTTP methods this route accepts.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    /// Rendering mode declared by the route.
    #[serde(default)]
    pub render_mode: RouteRenderMode,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

impl RouteConfig {
    /// Create a new route configuration.
    pub fn new(pattern: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            handler: handler.into(),
            methods: default_methods(),
            render_mode: RouteRenderMode::default(),
        }
    }

    /// Set allowed HTTP methods.
    pub fn with_methods(mut self, methods: Vec<&str>) -> Self {
        self.methods = methods.into_iter().map(String::from).collect();
        self
    }

    /// Declare the route's rendering mode.
    pub fn with_render_mode(mut self, mode: RouteRenderMode) -> Self {
        self.render_mode = mode;
        self
    }
}

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// Process-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime mode gating diagnostics.
    #[serde(default)]
    pub mode: RuntimeMode,
    /// Hosting process model.
    #[serde(default)]
    pub host: HostModel,
    /// Upper bound on a single deferred task's execution.
    #[serde(default = "default_deferred_timeout_ms")]
    pub deferred_task_timeout_ms: u64,
    /// Format used by the structured logger.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_deferred_timeout_ms() -> u64 {
    30_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::default(),
            host: HostModel::default(),
            deferred_task_timeout_ms: default_deferred_timeout_ms(),
            log_format: LogFormat::default(),
        }
    }
}

impl RuntimeConfig {
    /// Create a development configuration.
    pub fn development() -> Self {
        Self {
            mode: RuntimeMode::Development,
            log_format: LogFormat::Human,
            ..Default::default()
        }
    }

    /// Create a production configuration.
    pub fn production() -> Self {
        Self::default()
    }

    /// Load config from a file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: display,
                source,
            })
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_RUNTIME_MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(host) = lookup(ENV_HOST_MODEL) {
            self.host = host.parse()?;
        }
        if let Some(ms) = lookup(ENV_DEFERRED_TIMEOUT_MS) {
            self.deferred_task_timeout_ms =
                ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "deferred_task_timeout_ms",
                    value: ms.clone(),
                })?;
        }
        Ok(self)
    }

    /// Set the runtime mode.
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the host model.
    pub fn with_host(mut self, host: HostModel) -> Self {
        self.host = host;
        self
    }

    /// Set the deferred task timeout.
    pub fn with_deferred_task_timeout(mut self, timeout: Duration) -> Self {
        self.deferred_task_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Get the deferred task timeout.
    pub fn deferred_task_timeout(&self) -> Duration {
        Duration::from_millis(self.deferred_task_timeout_ms)
    }
}
