//! Varan Deferred Scheduler
//!
//! Queues member-level attachments until their owner's variant is known,
//! then applies them, rolling back and replaying whatever an earlier
//! provisional resolution already applied.
//!
//! # Core Concepts
//!
//! - [`DeferredScheduler`]: per-owner queues, finalize, read-triggered settling
//! - [`PendingEntry`]: one deferred member attachment
//! - [`ReplayReport`]: what a finalize pass did
//! - [`validate_transition`]: the `Unset -> Pending -> Resolved` state machine

#![warn(missing_docs)]

mod error;
mod pending;
mod report;
mod scheduler;
mod state;

// Re-exports
pub use error::SchedulerError;
pub use pending::{PendingEntry, PendingFn};
pub use report::{ReplayFailure, ReplayReport, Scheduled, SkipReason};
pub use scheduler::DeferredScheduler;
pub use state::{allowed_transitions, validate_transition};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
