//! Per-listener rate limiting for the generation pipeline.
//!
//! The window is derived from the newest persisted session timestamp. On top
//! of that read-then-decide check, an in-process claim map guarantees that
//! two concurrent requests from the same listener cannot both start a run:
//! the claim is taken before the pipeline begins and released when the run
//! ends (the saved session row then carries the window forward).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    window: Duration,
    in_flight: Mutex<HashMap<i64, Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Seconds the listener still has to wait given the newest session
    /// timestamp, at the provided instant. Zero means proceed; nonzero is in
    /// `1..=window` seconds.
    pub fn seconds_remaining(
        &self,
        newest_session_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> u32 {
        let Some(session_at) = newest_session_at else {
            return 0;
        };
        let window_secs = self.window.as_secs() as i64;
        let elapsed_ms = (now - session_at).num_milliseconds();
        if elapsed_ms >= window_secs * 1000 {
            return 0;
        }
        let remaining_ms = window_secs * 1000 - elapsed_ms;
        let remaining_secs = (remaining_ms + 999) / 1000;
        remaining_secs.clamp(1, window_secs) as u32
    }

    /// Claims the window for a pipeline run. Returns the retry-after in
    /// seconds when the listener is inside the window or already has a run
    /// in flight.
    pub fn try_claim(
        &self,
        user_id: i64,
        newest_session_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<RateLimitClaim<'_>, u32> {
        let remaining = self.seconds_remaining(newest_session_at, now);
        if remaining > 0 {
            return Err(remaining);
        }

        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(started) = in_flight.get(&user_id) {
            let elapsed = started.elapsed();
            if elapsed < self.window {
                let retry_after = (self.window - elapsed).as_secs_f64().ceil() as u32;
                return Err(retry_after.max(1));
            }
            // A claim this old means the owning run leaked; take it over.
        }
        in_flight.insert(user_id, Instant::now());
        Ok(RateLimitClaim {
            limiter: self,
            user_id,
        })
    }
}

/// An in-flight pipeline run's hold on the per-listener window. Dropping it
/// releases the hold.
pub struct RateLimitClaim<'a> {
    limiter: &'a RateLimiter,
    user_id: i64,
}

impl Drop for RateLimitClaim<'_> {
    fn drop(&mut self) {
        self.limiter
            .in_flight
            .lock()
            .unwrap()
            .remove(&self.user_id);
    }
}
