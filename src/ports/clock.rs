//! Clock port.
//!
//! Services sample time through this port on every call so validity checks
//! can be driven by a controllable clock in tests.

use crate::domain::foundation::Timestamp;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
