//! Change-Watch Configuration
//!
//! Configuration model for the change-watch controller:
//! - `Config`: the YAML document (resources, sinks, diff settings) plus environment overrides
//! - `IgnoredFields`: attribute paths excluded from update diffing
//! - `registry`: the static table of watchable built-in kinds

pub mod config;
pub mod error;
pub mod ignored_fields;
pub mod registry;

pub use config::*;
pub use error::ConfigError;
pub use ignored_fields::IgnoredFields;
pub use registry::{KindDescriptor, WatchedKind, BUILTIN_KINDS};
