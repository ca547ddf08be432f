//! Clock adapters.

use chrono::Duration;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the services under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Moves the clock forward (or backward for negative durations).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = now.plus(by);
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
