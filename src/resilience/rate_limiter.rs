use crate::{Error, ErrorContext, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    pub burst: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Tokens per second.
    pub rps: f64,
    /// Maximum burst size (tokens).
    pub burst: f64,
}

impl RateLimiterConfig {
    /// `rps` tokens per second with a burst of one; `0` disables limiting.
    pub fn from_rps(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps < 0.0 {
            return None;
        }
        Some(Self { rps, burst: 1.0 })
    }

    /// Set the maximum tokens (burst size), at least one.
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst.max(1) as f64;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { rps: 1.0, burst: 1.0 }
    }
}

#[derive(Debug)]
struct State {
    /// May go negative: each pending reservation borrows one future token.
    tokens: f64,
    last: Instant,
    /// Set by an external back-off signal (e.g. HTTP 429 Retry-After).
    blocked_until: Option<Instant>,
}

/// Token-bucket admission gate with continuous refill.
///
/// - Tokens refill at `rps` per second up to `burst`
/// - Waiters reserve tokens in arrival order, so sustained throughput converges to `rps`
/// - State lives behind its own mutex, never shared with a cache lock
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let burst = cfg.burst;
        let state = Mutex::new(State {
            tokens: burst,
            last: Instant::now(),
            blocked_until: None,
        });
        Self { cfg, state }
    }

    /// Limiter allowing `rps` requests per second with a burst of one.
    pub fn per_second(rps: f64) -> Result<Self> {
        let cfg = RateLimiterConfig::from_rps(rps).ok_or_else(|| {
            Error::configuration_with_context(
                format!("invalid requests per second: {}", rps),
                ErrorContext::new()
                    .with_details("expected a finite, non-negative number")
                    .with_source("rate_limiter"),
            )
        })?;
        Ok(Self::new(cfg))
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| {
            Error::runtime_with_context(
                "RateLimiter poisoned",
                ErrorContext::new().with_source("rate_limiter"),
            )
        })
    }

    fn refill_locked(cfg: &RateLimiterConfig, st: &mut State, now: Instant) {
        let elapsed = now.saturating_duration_since(st.last).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * cfg.rps).min(cfg.burst);
            st.last = now;
        }
    }

    /// Reserve one token. `Ok(ready_at)` is the instant it may be used; `Err(wait)`
    /// means `ready_at` lies beyond `deadline`, in which case the reservation is undone
    /// and `wait` is how long admission would have taken.
    fn reserve(&self, deadline: Option<Instant>) -> Result<std::result::Result<Instant, Duration>> {
        let mut st = self.lock()?;
        let now = Instant::now();
        if let Some(until) = st.blocked_until {
            if until <= now {
                st.blocked_until = None;
            }
        }
        let blocked = st.blocked_until.unwrap_or(now);

        if self.cfg.rps <= 0.0 {
            return Ok(match deadline {
                Some(d) if blocked > d => Err(blocked - now),
                _ => Ok(blocked),
            });
        }

        Self::refill_locked(&self.cfg, &mut st, now);
        st.tokens -= 1.0;
        let token_wait = if st.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-st.tokens / self.cfg.rps)
        };
        let ready_at = (now + token_wait).max(blocked);

        match deadline {
            Some(d) if ready_at > d => {
                st.tokens += 1.0;
                Ok(Err(ready_at - now))
            }
            _ => Ok(Ok(ready_at)),
        }
    }

    /// Wait for a token, consuming it, unless `deadline` passes first.
    ///
    /// Fails immediately with [`Error::AdmissionTimeout`] when the wait is already
    /// known to exceed the deadline; no token is consumed in that case.
    pub async fn admit(&self, deadline: Instant) -> Result<()> {
        match self.reserve(Some(deadline))? {
            Ok(ready_at) => {
                let now = Instant::now();
                if ready_at > now {
                    trace!(wait_ms = (ready_at - now).as_millis() as u64, "rate limiter wait");
                    self.wait_reserved(ready_at).await;
                }
                Ok(())
            }
            Err(needed) => {
                debug!(
                    needed_ms = needed.as_millis() as u64,
                    "rate limiter admission would exceed deadline"
                );
                let budget = deadline.saturating_duration_since(Instant::now());
                Err(Error::admission_timeout(budget, "rate_limiter"))
            }
        }
    }

    /// [`RateLimiter::admit`] with a deadline of `timeout` from now.
    pub async fn admit_within(&self, timeout: Duration) -> Result<()> {
        self.admit(Instant::now() + timeout).await
    }

    /// Acquire one token (may sleep, no deadline).
    pub async fn acquire(&self) -> Result<()> {
        if let Ok(ready_at) = self.reserve(None)? {
            if ready_at > Instant::now() {
                self.wait_reserved(ready_at).await;
            }
        }
        Ok(())
    }

    /// Sleep until a reserved token becomes usable. If the caller gives up first
    /// the token goes back to the bucket.
    async fn wait_reserved(&self, ready_at: Instant) {
        let mut reservation = Reservation {
            limiter: self,
            held: true,
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(ready_at)).await;
        reservation.held = false;
    }

    fn release(&self) {
        if self.cfg.rps <= 0.0 {
            return;
        }
        if let Ok(mut st) = self.lock() {
            Self::refill_locked(&self.cfg, &mut st, Instant::now());
            st.tokens = (st.tokens + 1.0).min(self.cfg.burst);
            trace!(tokens = st.tokens, "abandoned reservation returned");
        }
    }

    /// Try to acquire a token without waiting, returns true if successful
    pub fn try_acquire(&self) -> bool {
        let Ok(mut st) = self.lock() else {
            return false;
        };
        let now = Instant::now();
        if matches!(st.blocked_until, Some(until) if until > now) {
            return false;
        }
        if self.cfg.rps <= 0.0 {
            return true;
        }
        Self::refill_locked(&self.cfg, &mut st, now);
        if st.tokens >= 1.0 {
            st.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Hold all admissions for `duration` (provider back-off, e.g. HTTP 429).
    pub fn pause_for(&self, duration: Duration) {
        if let Ok(mut st) = self.lock() {
            let until = Instant::now() + duration;
            st.blocked_until = Some(st.blocked_until.map_or(until, |u| u.max(until)));
            debug!(pause_ms = duration.as_millis() as u64, "rate limiter paused");
        }
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let Ok(mut st) = self.lock() else {
            return RateLimiterSnapshot {
                rps: cfg.rps,
                burst: cfg.burst,
                tokens: 0.0,
                estimated_wait_ms: None,
            };
        };
        let now = Instant::now();

        // 1. Check external block first
        let mut wait_ms = None;
        if let Some(until) = st.blocked_until {
            if until > now {
                wait_ms = Some(until.duration_since(now).as_millis() as u64);
            }
        }

        // 2. Then check local token bucket if no external block or if longer
        if cfg.rps > 0.0 {
            Self::refill_locked(cfg, &mut st, now);
            if st.tokens < 1.0 {
                let missing = 1.0 - st.tokens;
                let local_wait_ms = (missing / cfg.rps * 1000.0) as u64;
                wait_ms = Some(wait_ms.unwrap_or(0).max(local_wait_ms));
            }
        }

        RateLimiterSnapshot {
            rps: cfg.rps,
            burst: cfg.burst,
            tokens: st.tokens,
            estimated_wait_ms: wait_ms,
        }
    }
}

struct Reservation<'a> {
    limiter: &'a RateLimiter,
    held: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.held {
            self.limiter.release();
        }
    }
}
