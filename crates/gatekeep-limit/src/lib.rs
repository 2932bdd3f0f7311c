//! Admission control for Gatekeep.
//!
//! A connection storm must not turn into a storm of profile lookups and
//! RSA operations. Every login start asks the global [`RateLimiter`]
//! first; a `false` answer means "drop this attempt", never "wait".
//!
//! # Policy
//!
//! [`SlidingWindowLimiter`] admits at most `max_attempts` login starts in
//! any window of length `window`. It remembers the instants of the last
//! `max_attempts` admitted attempts in a ring; a new attempt is admitted
//! when the oldest of them has left the window. Rejected attempts are not
//! recorded, so a flood cannot push the window forward.
//!
//! Time comes from `tokio::time::Instant`, which lets tests drive the
//! window with paused tokio time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How many login starts are admitted per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Attempts admitted per window. 0 disables the limit.
    pub max_attempts: u32,
    /// Window length. Zero disables the limit.
    pub window: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 600,
            window: Duration::from_secs(600),
        }
    }
}

impl AdmissionConfig {
    /// Largest ring we are willing to allocate.
    pub const MAX_ATTEMPTS_CAP: u32 = 1_000_000;

    /// `max_attempts` per `window`.
    pub fn per_window(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }

    /// A config that admits everything.
    pub fn unlimited() -> Self {
        Self {
            max_attempts: 0,
            window: Duration::ZERO,
        }
    }

    /// Whether this config disables admission control.
    pub fn is_unlimited(&self) -> bool {
        self.max_attempts == 0 || self.window.is_zero()
    }

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.max_attempts > Self::MAX_ATTEMPTS_CAP {
            warn!(
                max_attempts = self.max_attempts,
                cap = Self::MAX_ATTEMPTS_CAP,
                "max_attempts exceeds cap, clamping"
            );
            self.max_attempts = Self::MAX_ATTEMPTS_CAP;
        }
        self
    }

    /// Builds the limiter this config describes.
    pub fn build(self) -> Arc<dyn RateLimiter> {
        let config = self.validated();
        if config.is_unlimited() {
            debug!("admission control disabled");
            Arc::new(UnlimitedLimiter::default())
        } else {
            Arc::new(SlidingWindowLimiter::new(config.max_attempts, config.window))
        }
    }
}

// ---------------------------------------------------------------------------
// Limiter trait and stats
// ---------------------------------------------------------------------------

/// A global, non-blocking admission gate.
pub trait RateLimiter: Send + Sync + 'static {
    /// Claims one unit of budget. Returns `false` when the budget is
    /// exhausted; never waits.
    fn try_acquire(&self) -> bool;

    /// Counters since creation.
    fn stats(&self) -> AdmissionStats;
}

/// Admission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    /// Attempts that were let through.
    pub admitted: u64,
    /// Attempts that were dropped.
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn record(&self, admitted: bool) -> bool {
        let counter = if admitted {
            &self.admitted
        } else {
            &self.rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
        admitted
    }

    fn snapshot(&self) -> AdmissionStats {
        AdmissionStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Sliding window
// ---------------------------------------------------------------------------

/// Admits at most `capacity` attempts in any `window`.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window: Duration,
    ring: Mutex<Ring>,
    counters: Counters,
}

/// Instants of the last admitted attempts. `next` always points at the
/// oldest one (or at a never-used slot).
#[derive(Debug)]
struct Ring {
    stamps: Vec<Option<Instant>>,
    next: usize,
}

impl Ring {
    fn try_record(&mut self, now: Instant, window: Duration) -> bool {
        let slot = &mut self.stamps[self.next];
        if let Some(oldest) = *slot {
            if now.duration_since(oldest) < window {
                return false;
            }
        }
        *slot = Some(now);
        self.next = (self.next + 1) % self.stamps.len();
        true
    }
}

impl SlidingWindowLimiter {
    /// Creates a limiter admitting `max_attempts` (at least 1) per `window`.
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        let capacity = max_attempts.max(1) as usize;
        debug!(capacity, window_ms = window.as_millis() as u64, "admission limiter created");
        Self {
            window,
            ring: Mutex::new(Ring {
                stamps: vec![None; capacity],
                next: 0,
            }),
            counters: Counters::default(),
        }
    }

    /// Attempts admitted per window.
    pub fn capacity(&self) -> usize {
        self.ring.lock().map(|ring| ring.stamps.len()).unwrap_or(0)
    }

    /// The window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn try_acquire(&self) -> bool {
        let admitted = match self.ring.lock() {
            Ok(mut ring) => ring.try_record(Instant::now(), self.window),
            Err(_) => {
                // Fail closed.
                warn!("admission ring lock poisoned, rejecting attempt");
                false
            }
        };
        self.counters.record(admitted)
    }

    fn stats(&self) -> AdmissionStats {
        self.counters.snapshot()
    }
}

// ---------------------------------------------------------------------------
// Unlimited
// ---------------------------------------------------------------------------

/// Admits every attempt. Used when admission control is switched off.
#[derive(Debug, Default)]
pub struct UnlimitedLimiter {
    counters: Counters,
}

impl RateLimiter for UnlimitedLimiter {
    fn try_acquire(&self) -> bool {
        self.counters.record(true)
    }

    fn stats(&self) -> AdmissionStats {
        self.counters.snapshot()
    }
}
