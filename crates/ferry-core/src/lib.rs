//! # ferry-core
//!
//! Foundation types and shared vocabulary for the Ferry agent relay.
//!
//! - **[`ConversationId`]**: branded key for one chat thread
//! - **[`SessionRecord`] / [`AutonomyLevel`]**: durable per-conversation state
//! - **[`AgentEvent`]**: the streamed event vocabulary both transports emit
//! - **[`TurnRequest`] / [`PermissionDecision`]**: turn dispatch and
//!   permission types
//!
//! Everything here is plain data: no IO, no async, no transport details.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod session;
pub mod text;
pub mod turn;

pub use events::AgentEvent;
pub use ids::ConversationId;
pub use session::{AutonomyLevel, ParseAutonomyLevelError, SessionHistoryEntry, SessionRecord};
pub use text::truncate_chars;
pub use turn::{
    ParsePermissionDecisionError, PermissionDecision, PermissionRequest, TurnRequest,
};
