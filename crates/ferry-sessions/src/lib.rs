//! # ferry-sessions
//!
//! Durable per-conversation session registry for the Ferry relay.
//!
//! The registry is a flat keyed collection: one [`SessionRecord`] per
//! conversation plus a capped recent-session history, mirrored to a single
//! JSON file (`~/.ferry/sessions.json` by default). Every mutation persists
//! before it returns; a corrupt or missing file opens as an empty registry.
//!
//! [`SessionRecord`]: ferry_core::SessionRecord

#![deny(unsafe_code)]

pub mod errors;
pub mod file;
pub mod registry;

pub use errors::{RegistryError, Result};
pub use file::{RegistryFile, load_registry_file, save_registry_file};
pub use registry::SessionRegistry;
