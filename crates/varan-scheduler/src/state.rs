//! Owner resolution state
//!
//! Each owner walks `Unset -> Pending -> Resolved`. A late member attachment
//! after a provisional default resolution puts a resolved owner back to
//! `Pending`; nothing ever returns to `Unset`.

use crate::error::SchedulerError;
use crate::pending::PendingEntry;
use varan_metadata::{ResolutionPhase, Target, Variant};

/// Validate a phase change
///
/// # Errors
/// Returns [`SchedulerError::IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: ResolutionPhase, to: ResolutionPhase) -> Result<(), SchedulerError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SchedulerError::IllegalTransition { from, to })
    }
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: ResolutionPhase) -> &'static [ResolutionPhase] {
    use ResolutionPhase::{Pending, Resolved, Unset};
    match from {
        Unset | Pending | Resolved => &[Pending, Resolved],
    }
}

/// Scheduler bookkeeping for one owner
#[derive(Debug)]
pub(crate) struct OwnerState {
    pub(crate) owner: Target,
    /// Every member attachment seen for this owner, in arrival order
    pub(crate) queue: Vec<PendingEntry>,
    pub(crate) settled: Option<Variant>,
    pub(crate) direct_apply: bool,
    pub(crate) applying: bool,
    pub(crate) pass: u64,
}

impl OwnerState {
    pub(crate) fn new(owner: &Target) -> Self {
        Self {
            owner: owner.clone(),
            queue: Vec::new(),
            settled: None,
            direct_apply: false,
            applying: false,
            pass: 0,
        }
    }

    /// Entries not yet applied under any variant
    pub(crate) fn unapplied(&self) -> usize {
        self.queue.iter().filter(|e| e.applied_with().is_none()).count()
    }
}
