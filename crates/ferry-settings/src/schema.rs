//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON file
//! format. Each type implements [`Default`] with production default values
//! and is marked `#[serde(default)]` so partial JSON is allowed; missing
//! fields get their default value during deserialization.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolve the user's home directory, falling back to `/tmp`.
fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
}

/// Root settings type for the Ferry relay.
///
/// Loaded from `~/.ferry/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "version": "0.1.0",
///   "agent": { "baseUrl": "http://127.0.0.1:8080" },
///   "stream": { "throttleMs": 2000 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FerrySettings {
    /// Settings schema version.
    pub version: String,
    /// How to reach the agent (daemon URL, CLI command, working dir).
    pub agent: AgentSettings,
    /// Daemon availability probe tuning.
    pub probe: ProbeSettings,
    /// Progress streaming tuning.
    pub stream: StreamSettings,
    /// Subprocess lifecycle tuning.
    pub process: ProcessSettings,
    /// Session registry location.
    pub registry: RegistrySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for FerrySettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            agent: AgentSettings::default(),
            probe: ProbeSettings::default(),
            stream: StreamSettings::default(),
            process: ProcessSettings::default(),
            registry: RegistrySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// How to reach the agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Base URL of the resident agent daemon.
    pub base_url: String,
    /// Agent CLI executable for the subprocess path.
    pub command: String,
    /// Working directory for new conversations. `None` means the user's
    /// home directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_working_dir: Option<String>,
}

impl AgentSettings {
    /// Resolve the default working directory for new conversations.
    #[must_use]
    pub fn resolve_default_working_dir(&self) -> PathBuf {
        self.default_working_dir
            .as_ref()
            .map_or_else(home_dir, PathBuf::from)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            command: "opencode".to_string(),
            default_working_dir: None,
        }
    }
}

/// Daemon availability probe tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeSettings {
    /// How long a probe result (positive or negative) stays cached, in
    /// milliseconds.
    pub ttl_ms: u64,
    /// Probe request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            ttl_ms: 30_000,
            timeout_ms: 2_000,
        }
    }
}

/// Progress streaming tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Minimum interval between progress updates, in milliseconds.
    pub throttle_ms: u64,
    /// Maximum final-answer length in characters; longer answers are
    /// truncated with a marker.
    pub response_limit_chars: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            throttle_ms: 1_500,
            response_limit_chars: 4_000,
        }
    }
}

/// Subprocess lifecycle tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessSettings {
    /// Grace period between SIGTERM and SIGKILL when cancelling a turn, in
    /// milliseconds.
    pub grace_ms: u64,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self { grace_ms: 2_000 }
    }
}

/// Session registry location.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Path to the registry file. `None` means `~/.ferry/sessions.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RegistrySettings {
    /// Resolve the registry file path.
    #[must_use]
    pub fn resolve_path(&self) -> PathBuf {
        self.path.as_ref().map_or_else(
            || home_dir().join(".ferry").join("sessions.json"),
            PathBuf::from,
        )
    }
}

/// Log verbosity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level (most verbose).
    Trace,
    /// Debug-level.
    Debug,
    /// Info-level (default).
    #[default]
    Info,
    /// Warning-level.
    Warn,
    /// Error-level (least verbose).
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum log level emitted to stderr.
    pub level: LogLevel,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
