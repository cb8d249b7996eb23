//! HTTPulse Application - Environment store and request text conversion
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for persistence and time)
//! - The environment store with placeholder substitution
//! - Conversion between structured requests and `.http` text
//! - Application-level error handling

pub mod environment_store;
pub mod error;
pub mod http_text;
pub mod ports;
pub mod response_handler;
pub mod variable_resolver;

pub use environment_store::{EnvironmentEvent, EnvironmentStore, StoreAction};
pub use error::{ApplicationError, ApplicationResult};
pub use http_text::{
    ParsedHttpText, format_http_text, format_http_text_with_content_type, request_to_text,
    text_to_request, text_to_request_with_content_type,
};
pub use ports::{Clock, EnvironmentError, EnvironmentRepository, FileSystem, FileSystemError};
pub use response_handler::{SetDirective, extract_script_blocks, parse_set_directives};
pub use variable_resolver::{ResolutionResult, ValidationReport, VariableResolver};
