//! Time-based progress throttling.

use tokio::time::{Duration, Instant};

/// Rate-limits progress renders to one per interval.
///
/// `offer` decides whether a render goes out now. A render arriving inside
/// the interval is held instead (latest wins) until the next `offer` that
/// lands outside it, or an explicit `flush`. A render identical to the last
/// one sent is dropped outright, and drops any held render with it since
/// the display is already current.
///
/// Uses [`tokio::time::Instant`] so paused-clock tests control the interval.
#[derive(Debug)]
pub struct UpdateThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
    last_sent: Option<String>,
    pending: Option<String>,
}

impl UpdateThrottle {
    /// Create a throttle emitting at most once per `min_interval`.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: None,
            last_sent: None,
            pending: None,
        }
    }

    /// Offer the current render; returns the text to send now, if any.
    pub fn offer(&mut self, content: &str) -> Option<String> {
        if self.last_sent.as_deref() == Some(content) {
            self.pending = None;
            return None;
        }
        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.min_interval {
                self.pending = Some(content.to_owned());
                return None;
            }
        }
        self.emit(content.to_owned(), now)
    }

    /// Send the held render immediately, if one exists.
    pub fn flush(&mut self) -> Option<String> {
        let pending = self.pending.take()?;
        self.emit(pending, Instant::now())
    }

    fn emit(&mut self, content: String, now: Instant) -> Option<String> {
        self.last_emit = Some(now);
        self.last_sent = Some(content.clone());
        self.pending = None;
        Some(content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
