//! Shared utilities.
//!
//! - [`log`]: stderr logging with level filtering and color output
//! - [`wrapper_types`]: common type aliases

pub mod log;
pub mod wrapper_types;
