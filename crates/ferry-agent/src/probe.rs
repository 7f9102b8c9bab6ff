//! Daemon availability probe.
//!
//! One cheap `GET /health` decides which transport a turn uses. The verdict
//! (positive or negative) is cached for a short TTL so bursts of messages
//! don't hammer a daemon that is down; `force_check` bypasses the cache for
//! status surfaces that want a live answer.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// Default cache TTL for probe verdicts.
const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Default health request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Probe configuration.
#[derive(Clone, Debug)]
pub struct ProbeConfig {
    /// How long one verdict stays valid.
    pub ttl: Duration,
    /// Per-request timeout for the health check.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One cached probe result.
#[derive(Clone, Copy, Debug)]
struct CachedVerdict {
    available: bool,
    checked_at: Instant,
}

/// Cached daemon availability checker.
#[derive(Debug)]
pub struct AvailabilityProbe {
    /// Daemon base URL, without a trailing slash.
    base_url: String,
    /// Configuration.
    config: ProbeConfig,
    /// HTTP client.
    client: reqwest::Client,
    /// Last verdict, if still fresh.
    cache: Mutex<Option<CachedVerdict>>,
}

impl AvailabilityProbe {
    /// Create a new probe.
    #[must_use]
    pub fn new(base_url: String, config: ProbeConfig) -> Self {
        Self::with_client(base_url, config, reqwest::Client::new())
    }

    /// Create a new probe with a shared HTTP client.
    #[must_use]
    pub fn with_client(base_url: String, config: ProbeConfig, client: reqwest::Client) -> Self {
        Self {
            base_url,
            config,
            client,
            cache: Mutex::new(None),
        }
    }

    /// Whether the daemon answered its health endpoint recently.
    ///
    /// Serves the cached verdict while it is fresh; otherwise probes and
    /// caches the outcome. Never returns an error: any failure to reach the
    /// daemon simply reads as unavailable.
    pub async fn is_daemon_available(&self) -> bool {
        if let Some(available) = self.cached_verdict() {
            return available;
        }
        self.force_check().await
    }

    /// Probe the daemon now, bypassing and refreshing the cache.
    pub async fn force_check(&self) -> bool {
        let available = self.check_health().await;
        *self.cache.lock() = Some(CachedVerdict {
            available,
            checked_at: Instant::now(),
        });
        metrics::gauge!("ferry_daemon_available").set(if available { 1.0 } else { 0.0 });
        debug!(available, "daemon availability probed");
        available
    }

    fn cached_verdict(&self) -> Option<bool> {
        let cache = self.cache.lock();
        cache
            .as_ref()
            .and_then(|v| (v.checked_at.elapsed() < self.config.ttl).then_some(v.available))
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "daemon health check failed");
                false
            }
        }
    }
}

/// Transport selection asks one yes/no question per turn.
///
/// The orchestrator consults this before dispatching; tests substitute a
/// fixed answer.
#[async_trait]
pub trait DaemonAvailability: Send + Sync {
    /// Whether the daemon should be tried first.
    async fn is_daemon_available(&self) -> bool;
}

#[async_trait]
impl DaemonAvailability for AvailabilityProbe {
    async fn is_daemon_available(&self) -> bool {
        AvailabilityProbe::is_daemon_available(self).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
