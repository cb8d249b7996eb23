//! Clock port for time-related operations

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Port for getting the current time.
///
/// The environment store stamps `updatedAt` through this port so tests can
/// pin time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
