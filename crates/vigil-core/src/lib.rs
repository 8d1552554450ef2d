//! `vigil-core` — configuration model shared by the dispatcher and gateway.
//!
//! Holds the JSON config schema with its overlay merge rules, the duration
//! string grammar, and the content hash used for change detection. No I/O
//! beyond reading config files, no scheduling logic.

pub mod config;
pub mod duration;
pub mod error;

pub use config::{CommandSpec, Config};
pub use duration::parse_duration;
pub use error::{ConfigError, Result};
