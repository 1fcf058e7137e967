//! Per-IP limiting of failed login attempts.
//!
//! The callback endpoint is a natural brute-force target: an attacker can
//! replay guessed hashes cheaply. The gateway checks the limiter before
//! verifying, records a failure only for security-event rejections, and
//! clears the record on success.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{AuthError, AuthResult};

/// Limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Failed attempts tolerated within the window before lockout
    pub max_failures: u32,

    /// Window over which failures are counted
    pub window: Duration,

    /// Lockout applied once `max_failures` is reached
    pub lockout: Duration,

    /// Upper bound on tracked addresses (memory cap)
    pub max_tracked: usize,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window: Duration::from_secs(60),
            lockout: Duration::from_secs(300),
            max_tracked: 10_000,
        }
    }
}

#[derive(Debug)]
struct AttemptRecord {
    failures: u32,
    window_start: Instant,
    locked_at: Option<Instant>,
}

/// Thread-safe per-IP failure tracker.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    records: Arc<RwLock<HashMap<IpAddr, AttemptRecord>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether `ip` may attempt a login right now.
    pub fn check(&self, ip: &IpAddr) -> AuthResult<()> {
        let records = self.records.read().unwrap();
        if let Some(locked_at) = records.get(ip).and_then(|r| r.locked_at) {
            let elapsed = locked_at.elapsed();
            if elapsed < self.config.lockout {
                let retry_after = (self.config.lockout - elapsed).as_secs();
                return Err(AuthError::RateLimited(retry_after));
            }
        }
        Ok(())
    }

    /// Record a failed verification for `ip`.
    pub fn record_failure(&self, ip: &IpAddr) {
        let mut records = self.records.write().unwrap();

        if records.len() >= self.config.max_tracked && !records.contains_key(ip) {
            let window = self.config.window;
            let lockout = self.config.lockout;
            records.retain(|_, r| {
                r.window_start.elapsed() < window
                    || r.locked_at.is_some_and(|at| at.elapsed() < lockout)
            });
        }

        let record = records.entry(*ip).or_insert_with(|| AttemptRecord {
            failures: 0,
            window_start: Instant::now(),
            locked_at: None,
        });

        if record.window_start.elapsed() >= self.config.window {
            record.failures = 0;
            record.window_start = Instant::now();
            record.locked_at = None;
        }

        // A lockout that has already elapsed no longer counts as active
        if record
            .locked_at
            .is_some_and(|at| at.elapsed() >= self.config.lockout)
        {
            record.locked_at = None;
        }

        record.failures += 1;
        if record.failures >= self.config.max_failures && record.locked_at.is_none() {
            record.locked_at = Some(Instant::now());
            tracing::warn!(ip = %ip, failures = record.failures, "login attempts locked out");
        }
    }

    /// A successful login clears the failure history for `ip`.
    pub fn record_success(&self, ip: &IpAddr) {
        self.records.write().unwrap().remove(ip);
    }

    /// Number of addresses currently tracked.
    pub fn tracked(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn lockout_after_max_failures() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_failures: 3,
            ..Default::default()
        });
        let addr = ip("203.0.113.9");

        limiter.record_failure(&addr);
        limiter.record_failure(&addr);
        assert!(limiter.check(&addr).is_ok());

        limiter.record_failure(&addr);
        assert!(matches!(
            limiter.check(&addr),
            Err(AuthError::RateLimited(_))
        ));
    }

    #[test]
    fn lockout_expires() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_failures: 1,
            lockout: Duration::from_millis(50),
            ..Default::default()
        });
        let addr = ip("203.0.113.10");

        limiter.record_failure(&addr);
        assert!(limiter.check(&addr).is_err());

        sleep(Duration::from_millis(80));
        assert!(limiter.check(&addr).is_ok());
    }

    #[test]
    fn failures_after_an_expired_lockout_lock_again() {
        // Lockout shorter than the window: expiry must not leave the
        // address permanently unlockable while the window is still open.
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_failures: 2,
            window: Duration::from_secs(60),
            lockout: Duration::from_millis(40),
            ..Default::default()
        });
        let addr = ip("203.0.113.12");

        limiter.record_failure(&addr);
        limiter.record_failure(&addr);
        assert!(limiter.check(&addr).is_err());

        sleep(Duration::from_millis(60));
        assert!(limiter.check(&addr).is_ok());

        limiter.record_failure(&addr);
        assert!(matches!(
            limiter.check(&addr),
            Err(AuthError::RateLimited(_))
        ));
    }

    #[test]
    fn success_clears_history() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_failures: 2,
            ..Default::default()
        });
        let addr = ip("203.0.113.11");

        limiter.record_failure(&addr);
        limiter.record_success(&addr);
        limiter.record_failure(&addr);
        assert!(limiter.check(&addr).is_ok());
    }

    #[test]
    fn addresses_are_independent() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_failures: 1,
            ..Default::default()
        });

        limiter.record_failure(&ip("198.51.100.1"));
        assert!(limiter.check(&ip("198.51.100.1")).is_err());
        assert!(limiter.check(&ip("198.51.100.2")).is_ok());
    }
}
