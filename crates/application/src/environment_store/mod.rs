//! Environment store service
//!
//! Owns the set of environments, keeps at most one of them active and
//! substitutes `{{placeholders}}` against the active one.

mod events;
mod in_flight;
mod store;

pub use events::EnvironmentEvent;
pub use in_flight::StoreAction;
pub use store::{EnvironmentStore, HANDLER_VARIABLE_DESCRIPTION};
