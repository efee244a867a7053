//! agentmerge core library.
//!
//! This crate tracks file operations proposed by concurrent provider agents
//! and reconciles them: an append-only history log, single-owner and
//! advisory-lock bookkeeping, conflict classification, and merge strategies,
//! all coordinated by a [`Tracker`] that serializes mutation per path.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod history;
pub mod logging;
pub mod models;
pub mod ownership;
pub mod tracker;

// Re-exports for convenience.
pub use config::AppConfig;
pub use conflict::{Conflict, ConflictKind, Resolution, Strategy};
pub use errors::CoreError;
pub use models::{FileOperation, LineRange, TrackOptions};
pub use tracker::Tracker;
