//! Timeout + cooldown wrapper for flaky outbound calls (email delivery).
//!
//! # Invariants
//! - A key stays open until `now >= reopen_at`; `allow` never mutates state.
//! - Timeouts and errors trip the key; success resets it.

use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub const DEFAULT_COOLDOWN_MS: i64 = 5 * 60 * 1000;

#[derive(Debug)]
pub enum BreakerError<E> {
    /// Calls are refused until `retry_at` (epoch ms).
    Open { key: String, retry_at: i64 },
    /// The call did not finish within the timeout.
    Timeout { key: String, timeout_ms: u128 },
    /// The worker thread ended without producing a result.
    WorkerLost { key: String },
    Failed(E),
}

impl<E: Display> Display for BreakerError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { key, retry_at } => {
                write!(f, "circuit `{key}` is open until {retry_at}")
            }
            Self::Timeout { key, timeout_ms } => {
                write!(f, "call on `{key}` timed out after {timeout_ms}ms")
            }
            Self::WorkerLost { key } => write!(f, "worker for `{key}` exited without a result"),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-key cooldown map.
#[derive(Debug)]
pub struct CooldownBreaker {
    cooldown_ms: i64,
    reopen_at: Mutex<HashMap<String, i64>>,
}

impl Default for CooldownBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

impl CooldownBreaker {
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            cooldown_ms: cooldown_ms.max(0),
            reopen_at: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    /// Whether calls on `key` may proceed at `now`.
    pub fn allow(&self, key: &str, now: i64) -> bool {
        self.retry_at(key, now).is_none()
    }

    /// Reopen timestamp while the key is still cooling down.
    pub fn retry_at(&self, key: &str, now: i64) -> Option<i64> {
        let map = self.reopen_at.lock().unwrap_or_else(|err| err.into_inner());
        map.get(key).copied().filter(|reopen_at| now < *reopen_at)
    }

    pub fn trip(&self, key: &str, now: i64) {
        let reopen_at = now.saturating_add(self.cooldown_ms);
        let mut map = self.reopen_at.lock().unwrap_or_else(|err| err.into_inner());
        map.insert(key.to_string(), reopen_at);
        warn!("event=breaker_trip module=breaker status=open key={key} reopen_at={reopen_at}");
    }

    pub fn reset(&self, key: &str) {
        let mut map = self.reopen_at.lock().unwrap_or_else(|err| err.into_inner());
        if map.remove(key).is_some() {
            info!("event=breaker_reset module=breaker status=closed key={key}");
        }
    }

    /// Runs `call` on a worker thread and waits at most `timeout`.
    ///
    /// A timed-out worker is detached; its late result is discarded.
    pub fn call_with_timeout<T, E, F>(
        &self,
        key: &str,
        now: i64,
        timeout: Duration,
        call: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if let Some(retry_at) = self.retry_at(key, now) {
            return Err(BreakerError::Open {
                key: key.to_string(),
                retry_at,
            });
        }

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let _ = sender.send(call());
        });

        match receiver.recv_timeout(timeout) {
            Ok(Ok(value)) => {
                self.reset(key);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.trip(key, now);
                Err(BreakerError::Failed(err))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.trip(key, now);
                Err(BreakerError::Timeout {
                    key: key.to_string(),
                    timeout_ms: timeout.as_millis(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.trip(key, now);
                Err(BreakerError::WorkerLost {
                    key: key.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_blocks_until_cooldown_passes() {
        let breaker = CooldownBreaker::new(1_000);
        assert!(breaker.allow("email", 0));
        breaker.trip("email", 100);
        assert!(!breaker.allow("email", 500));
        assert_eq!(breaker.retry_at("email", 500), Some(1_100));
        assert!(breaker.allow("email", 1_100));
        assert!(breaker.allow("other", 500));
    }

    #[test]
    fn huge_cooldown_saturates() {
        let breaker = CooldownBreaker::new(i64::MAX);
        breaker.trip("email", 1_000);
        assert_eq!(breaker.retry_at("email", 2_000), Some(i64::MAX));
        assert!(!breaker.allow("email", i64::MAX - 1));
    }

    #[test]
    fn reset_closes_immediately() {
        let breaker = CooldownBreaker::new(1_000);
        breaker.trip("email", 0);
        breaker.reset("email");
        assert!(breaker.allow("email", 1));
    }

    #[test]
    fn success_passes_value_through() {
        let breaker = CooldownBreaker::default();
        let result: Result<u32, BreakerError<String>> =
            breaker.call_with_timeout("k", 0, Duration::from_secs(5), || Ok(7));
        assert_eq!(result.unwrap(), 7);
        assert!(breaker.allow("k", 0));
    }

    #[test]
    fn failure_trips_and_refuses_next_call() {
        let breaker = CooldownBreaker::new(60_000);
        let result: Result<(), BreakerError<String>> =
            breaker.call_with_timeout("k", 0, Duration::from_secs(5), || Err("down".to_string()));
        assert!(matches!(result, Err(BreakerError::Failed(ref message)) if message == "down"));

        let refused: Result<(), BreakerError<String>> =
            breaker.call_with_timeout("k", 10, Duration::from_secs(5), || Ok(()));
        assert!(matches!(refused, Err(BreakerError::Open { retry_at: 60_000, .. })));
    }

    #[test]
    fn slow_call_times_out_and_trips() {
        let breaker = CooldownBreaker::new(60_000);
        let result: Result<(), BreakerError<String>> =
            breaker.call_with_timeout("slow", 0, Duration::from_millis(20), || {
                thread::sleep(Duration::from_millis(500));
                Ok(())
            });
        assert!(matches!(result, Err(BreakerError::Timeout { .. })));
        assert!(!breaker.allow("slow", 1));
    }
}
