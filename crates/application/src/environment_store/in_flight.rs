//! Per-action re-entrancy flags.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::error::{ApplicationError, ApplicationResult};

/// The kinds of store operation that reject a second concurrent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    /// Loading from persistence
    Fetch,
    /// Creating environments
    Add,
    /// Replacing or renaming an environment
    Update,
    /// Deleting environments
    Remove,
    /// Changing the active environment
    Switch,
}

impl StoreAction {
    const COUNT: usize = 5;

    /// Returns the action name used in errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Switch => "switch",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Fetch => 0,
            Self::Add => 1,
            Self::Update => 2,
            Self::Remove => 3,
            Self::Switch => 4,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct InFlight {
    flags: [AtomicBool; StoreAction::COUNT],
}

impl InFlight {
    /// Marks `action` as running until the returned guard drops.
    pub(super) fn begin(&self, action: StoreAction) -> ApplicationResult<InFlightGuard<'_>> {
        let flag = &self.flags[action.index()];
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(action = action.as_str(), "rejecting re-entrant store call");
            return Err(ApplicationError::Busy(action.as_str()));
        }
        Ok(InFlightGuard { flag })
    }

    pub(super) fn is_running(&self, action: StoreAction) -> bool {
        self.flags[action.index()].load(Ordering::Acquire)
    }
}

pub(super) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_rejected_until_guard_drops() {
        let in_flight = InFlight::default();

        let guard = in_flight.begin(StoreAction::Add);
        assert!(guard.is_ok());
        assert!(in_flight.is_running(StoreAction::Add));
        assert!(matches!(
            in_flight.begin(StoreAction::Add),
            Err(ApplicationError::Busy("add"))
        ));

        drop(guard);
        assert!(!in_flight.is_running(StoreAction::Add));
        assert!(in_flight.begin(StoreAction::Add).is_ok());
    }

    #[test]
    fn test_actions_are_independent() {
        let in_flight = InFlight::default();
        let _add = in_flight.begin(StoreAction::Add);
        assert!(in_flight.begin(StoreAction::Switch).is_ok());
    }
}
