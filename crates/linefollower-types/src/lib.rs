//! Shared domain types for the line follower workspace.

pub mod config;
pub mod control;
pub mod telemetry;
pub mod vision;

mod errors;

pub use errors::{LineFollowerError, Result};
