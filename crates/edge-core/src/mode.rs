//! Process, host and route modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime mode of the process.
///
/// Gates all diagnostic emission. Read once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Development-like mode: diagnostics are emitted.
    Development,
    /// Production mode: diagnostics are inert.
    #[default]
    Production,
}

impl RuntimeMode {
    /// Check if diagnostics should be emitted in this mode.
    pub fn emits_diagnostics(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Get the canonical name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for RuntimeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue {
                key: "mode",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering mode declared by a route before any fetch call executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteRenderMode {
    /// Route may be precomputed.
    #[default]
    Static,
    /// Route renders per request.
    Dynamic,
    /// Route must render per request; fetches are uncached unless explicitly cached.
    ForceDynamic,
}

impl RouteRenderMode {
    /// Get the declaration string for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::ForceDynamic => "force-dynamic",
        }
    }

    /// Check if this route renders on every request.
    pub fn is_per_request(&self) -> bool {
        !matches!(self, Self::Static)
    }
}

impl FromStr for RouteRenderMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "static" | "auto" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            "force-dynamic" => Ok(Self::ForceDynamic),
            other => Err(ConfigError::InvalidValue {
                key: "render_mode",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RouteRenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the hosting process lives relative to the responses it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostModel {
    /// The process keeps serving requests after a response is sent.
    #[default]
    LongRunning,
    /// The process may terminate as soon as the response is sent.
    Ephemeral,
}

impl HostModel {
    /// Check if the host must wait on pending work before terminating.
    pub fn requires_pending_signal(&self) -> bool {
        matches!(self, Self::Ephemeral)
    }

    /// Get the canonical name of this host model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongRunning => "long-running",
            Self::Ephemeral => "ephemeral",
        }
    }
}

impl FromStr for HostModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long-running" | "server" => Ok(Self::LongRunning),
            "ephemeral" | "serverless" => Ok(Self::Ephemeral),
            other => Err(ConfigError::InvalidValue {
                key: "host",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for HostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
