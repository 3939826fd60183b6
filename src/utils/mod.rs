//! Utility functions shared across erx:
//!
//! - [`app_data`] - Persistent application config in the per-user data directory
//! - [`progress`] - Progress bar that becomes a no-op without the `progress` feature

pub mod app_data;
pub mod progress;

pub use app_data::*;
