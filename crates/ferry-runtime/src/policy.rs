//! Permission auto-resolution.

use ferry_core::{AutonomyLevel, PermissionDecision, PermissionRequest};

/// Decides permission requests without user involvement, when possible.
///
/// `None` defers the request to the front-end prompt.
pub trait PermissionPolicy: Send + Sync {
    /// Resolve `request` under the conversation's current autonomy level.
    fn resolve(
        &self,
        request: &PermissionRequest,
        autonomy: AutonomyLevel,
    ) -> Option<PermissionDecision>;
}

/// The shipped policy: auto-allow everything at [`AutonomyLevel::Unsafe`],
/// defer everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutonomyPolicy;

impl PermissionPolicy for AutonomyPolicy {
    fn resolve(
        &self,
        _request: &PermissionRequest,
        autonomy: AutonomyLevel,
    ) -> Option<PermissionDecision> {
        autonomy
            .skips_permission_checks()
            .then_some(PermissionDecision::AllowOnce)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
