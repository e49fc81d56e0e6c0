use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Per-IP fixed window counter for `/submit`.
pub struct SubmissionRateLimiter {
    limit: u32,
    window: Duration,
    /// ip -> (count, window_start)
    entries: DashMap<IpAddr, (u32, Instant)>,
}

impl SubmissionRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limit: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            entries: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request from `ip`. Returns Ok(()) or Err with retry-after
    /// seconds. The entry stays locked for the whole check, so concurrent
    /// requests from one address cannot both take the last slot.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut entry = self.entries.entry(ip).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) >= self.window {
            *count = 0;
            *start = now;
        }

        if *count >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(*start));
            // round up so clients never retry a moment too early
            return Err(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0));
        }

        *count += 1;
        Ok(())
    }

    /// Remove entries whose window started more than `max_age` ago.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }

    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}
