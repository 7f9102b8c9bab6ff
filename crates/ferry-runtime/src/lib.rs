//! # ferry-runtime
//!
//! Turn orchestration on top of the agent transports.
//!
//! - **[`TurnOrchestrator`]**: drives one turn end to end and owns the
//!   per-conversation in-flight state
//! - **[`ActiveTurns`]**: at most one live turn per conversation, with
//!   cooperative cancellation
//! - **[`UpdateThrottle`]** and **[`ProgressView`]**: rolling tool activity
//!   rendered into rate-limited status updates
//! - **[`PermissionPolicy`]** and **[`ConversationSink`]**: the seams where
//!   permission gating and the front end plug in
//!
//! The orchestrator is front-end agnostic. A caller hands it a conversation
//! id and a message; everything user-visible flows out through the
//! [`ConversationSink`] or the returned [`TurnOutcome`].

#![deny(unsafe_code)]

pub mod active;
pub mod errors;
pub mod orchestrator;
pub mod policy;
pub mod render;
pub mod sink;
pub mod throttle;

pub use active::{ActiveTurns, TurnPhase};
pub use errors::{TurnError, TurnResult};
pub use orchestrator::{RuntimeConfig, TurnOrchestrator, TurnOutcome};
pub use policy::{AutonomyPolicy, PermissionPolicy};
pub use render::{ProgressView, THINKING_STATUS, final_answer};
pub use sink::ConversationSink;
pub use throttle::UpdateThrottle;
