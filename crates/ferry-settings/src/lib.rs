//! # ferry-settings
//!
//! Configuration management with layered sources for the Ferry relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`FerrySettings::default()`]
//! 2. **User file**: `~/.ferry/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `FERRY_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod schema;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use schema::{
    AgentSettings, FerrySettings, LogLevel, LoggingSettings, ProbeSettings, ProcessSettings,
    RegistrySettings, StreamSettings,
};
