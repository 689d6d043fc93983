//! Clock abstraction for token lifetime arithmetic.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Time source injected into the token services so tests can control it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current unix seconds.
    fn unix_now(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant, so a test can
/// hold one handle while the service under test holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    unix: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            unix: Arc::new(AtomicI64::new(start.timestamp())),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        self.unix.store(to.timestamp(), Ordering::SeqCst);
    }

    /// Move forward by `seconds`.
    pub fn advance_secs(&self, seconds: i64) {
        self.unix.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.unix.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}
