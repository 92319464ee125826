//! Provider circuit breakers
//!
//! Tracks consecutive failures per provider. Three failures open the
//! breaker; it closes again once fifteen minutes have passed since the
//! last failure. Any success closes it immediately.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Failures needed to open a breaker
pub const FAILURE_THRESHOLD: u32 = 3;

/// How long an open breaker stays open after its last failure
pub const COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Breaker position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BreakerState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, Default)]
struct Breaker {
    failure_count: u32,
    state: BreakerState,
    last_failure_at: Option<Instant>,
}

/// Read-only view of one breaker for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    /// Seconds since the most recent failure
    pub last_failure_secs_ago: Option<u64>,
}

/// Per-provider failure counters and breaker state
#[derive(Debug)]
pub struct ProviderHealthTracker {
    breakers: Mutex<HashMap<String, Breaker>>,
    threshold: u32,
    cooldown: Duration,
}

impl Default for ProviderHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderHealthTracker {
    pub fn new() -> Self {
        Self::with_limits(FAILURE_THRESHOLD, COOLDOWN)
    }

    pub fn with_limits(threshold: u32, cooldown: Duration) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            threshold: threshold.max(1),
            cooldown,
        }
    }

    /// Whether calls to `provider` should be skipped right now.
    ///
    /// An open breaker whose cooldown has elapsed is closed and its
    /// failure count reset as a side effect.
    pub fn is_open(&self, provider: &str) -> bool {
        let mut breakers = self.lock();
        let Some(breaker) = breakers.get_mut(provider) else {
            return false;
        };

        if breaker.state != BreakerState::Open {
            return false;
        }

        let cooled = breaker
            .last_failure_at
            .map(|at| at.elapsed() >= self.cooldown)
            .unwrap_or(true);

        if cooled {
            tracing::info!(provider, "circuit breaker cooled down, closing");
            breaker.state = BreakerState::Closed;
            breaker.failure_count = 0;
            return false;
        }

        true
    }

    /// Count one failed attempt; returns true if this opened the breaker
    pub fn record_failure(&self, provider: &str) -> bool {
        let mut breakers = self.lock();
        let breaker = breakers.entry(provider.to_string()).or_default();

        breaker.failure_count += 1;
        breaker.last_failure_at = Some(Instant::now());

        if breaker.failure_count >= self.threshold && breaker.state != BreakerState::Open {
            breaker.state = BreakerState::Open;
            tracing::warn!(
                provider,
                failures = breaker.failure_count,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker opened"
            );
            return true;
        }

        false
    }

    /// Reset the breaker after a successful resolution
    pub fn record_success(&self, provider: &str) {
        if let Some(breaker) = self.lock().get_mut(provider) {
            breaker.failure_count = 0;
            breaker.state = BreakerState::Closed;
        }
    }

    /// Current breaker view; unknown providers read as closed with no failures
    pub fn snapshot(&self, provider: &str) -> BreakerSnapshot {
        let breakers = self.lock();
        match breakers.get(provider) {
            Some(b) => BreakerSnapshot {
                state: b.state,
                failure_count: b.failure_count,
                last_failure_secs_ago: b.last_failure_at.map(|at| at.elapsed().as_secs()),
            },
            None => BreakerSnapshot {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure_secs_ago: None,
            },
        }
    }

    /// Drop all state for a provider (used when it is unregistered)
    pub fn forget(&self, provider: &str) {
        self.lock().remove(provider);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Breaker>> {
        self.breakers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
