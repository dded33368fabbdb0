//! Scheduler error types

use varan_metadata::ResolutionPhase;

/// Scheduler bookkeeping errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Phase change not permitted by the owner state machine
    #[error("illegal resolution phase transition: {from} -> {to}")]
    IllegalTransition {
        /// Current phase
        from: ResolutionPhase,
        /// Requested phase
        to: ResolutionPhase,
    },
}
