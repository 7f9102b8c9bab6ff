//! # ferry-agent
//!
//! Everything that talks to the coding agent.
//!
//! - **[`TurnTransport`]**: the seam the orchestrator dispatches turns through
//! - **[`DaemonClient`]**: HTTP client for the long-running daemon
//! - **[`CliRunner`]**: one-shot subprocess fallback
//! - **[`AvailabilityProbe`]**: cached health check that picks between them
//! - **[`jsonl`]**: the shared ND-JSON event decoder
//!
//! Both transports produce the same guarded [`AgentEventStream`]: events in
//! arrival order, ending at the first terminal event, with stream truncation
//! surfaced as [`TransportError::Interrupted`].

#![deny(unsafe_code)]

pub mod daemon;
pub mod errors;
pub mod jsonl;
pub mod probe;
pub mod process;
pub mod transport;

pub use daemon::{DaemonClient, DaemonConfig};
pub use errors::{TransportError, TransportResult};
pub use probe::{AvailabilityProbe, DaemonAvailability, ProbeConfig};
pub use process::{CliRunner, ProcessConfig};
pub use transport::{AgentEventStream, TurnHandle, TurnTransport};
