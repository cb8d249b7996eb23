//! Change notifications emitted by the store.

/// A change to the environment set, sent to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentEvent {
    /// The store was (re)loaded from persistence.
    Loaded {
        /// Number of environments loaded
        count: usize,
    },
    /// An environment was created.
    Created {
        /// Id of the new environment
        id: String,
    },
    /// An environment or one of its variables changed.
    Updated {
        /// Id of the changed environment
        id: String,
    },
    /// Environments were deleted.
    Removed {
        /// Ids of the deleted environments
        ids: Vec<String>,
    },
    /// The active environment changed. `None` means no environment is active.
    ActiveChanged {
        /// Id of the newly active environment
        id: Option<String>,
    },
}
