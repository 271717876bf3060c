//! # prerun-core
//!
//! Core types for prerun, the remote-run change detector.
//!
//! prerun inspects the version-control state of one or more workspace roots,
//! collects the files that would be part of a pre-tested commit, and formats
//! them the way the CI server expects.
//!
//! ## Building blocks
//!
//! - [`CvsResource`] is one locally changed file
//! - [`ProviderKind`] tags the backend a change set came from
//! - [`Settings`] carries the user-facing configuration
//! - [`PrerunError`] is the single error type shared across crates

mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::Settings;
pub use error::{PrerunError, Result};
pub use types::*;
