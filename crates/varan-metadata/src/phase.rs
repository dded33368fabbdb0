//! Owner resolution phase markers and the read barrier seam

use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an owner stands in variant resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResolutionPhase {
    /// Nothing attached yet
    #[default]
    Unset,
    /// Member attachments are queued waiting for the owner's variant
    Pending,
    /// Queued attachments have been applied for a settled variant
    Resolved,
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "unset",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Hook the store calls before serving a read for a chain containing a
/// [`ResolutionPhase::Pending`] target
///
/// Implementors force the pending target through resolution so readers never
/// observe a half-applied owner.
pub trait ReadBarrier: Send + Sync {
    /// Resolve `target`'s queued attachments
    fn settle(&self, target: &Target);
}
