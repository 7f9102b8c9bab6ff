//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FerrySettings::default()`]
//! 2. If `~/.ferry/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::schema::FerrySettings;

/// Resolve the path to the settings file (`~/.ferry/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ferry").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FerrySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<FerrySettings> {
    let defaults = serde_json::to_value(FerrySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: FerrySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each env var has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_env_overrides(settings: &mut FerrySettings) {
    // ── Agent ───────────────────────────────────────────────────────
    if let Some(v) = read_env_string("FERRY_AGENT_URL") {
        settings.agent.base_url = v;
    }
    if let Some(v) = read_env_string("FERRY_AGENT_COMMAND") {
        settings.agent.command = v;
    }
    if let Some(v) = read_env_string("FERRY_DEFAULT_CWD") {
        settings.agent.default_working_dir = Some(v);
    }

    // ── Probe ───────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("FERRY_PROBE_TTL_MS", 1000, 600_000) {
        settings.probe.ttl_ms = v;
    }
    if let Some(v) = read_env_u64("FERRY_PROBE_TIMEOUT_MS", 100, 60_000) {
        settings.probe.timeout_ms = v;
    }

    // ── Stream ──────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("FERRY_THROTTLE_MS", 100, 60_000) {
        settings.stream.throttle_ms = v;
    }
    if let Some(v) = read_env_usize("FERRY_RESPONSE_LIMIT", 256, 65_536) {
        settings.stream.response_limit_chars = v;
    }

    // ── Process ─────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("FERRY_PROCESS_GRACE_MS", 100, 60_000) {
        settings.process.grace_ms = v;
    }

    // ── Registry / logging ──────────────────────────────────────────
    if let Some(v) = read_env_string("FERRY_REGISTRY_PATH") {
        settings.registry.path = Some(v);
    }
    if let Some(v) = read_env_string("FERRY_LOG_LEVEL") {
        if let Ok(level) = serde_json::from_value(Value::String(v.to_lowercase())) {
            settings.logging.level = level;
        } else {
            tracing::warn!(value = %v, "invalid FERRY_LOG_LEVEL, ignoring");
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
