use thiserror::Error;

use crate::models::{Lead, LeadStatus};

/// Rejected lead status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("lead is closed and cannot change status")]
    Closed,

    #[error("cannot move lead from {from} to {to}")]
    Invalid { from: LeadStatus, to: LeadStatus },
}

impl LeadStatus {
    /// The single forward step out of this status
    pub fn next(&self) -> Option<LeadStatus> {
        match self {
            Self::New => Some(Self::Sent),
            Self::Sent => Some(Self::Responded),
            Self::Responded => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    pub fn can_transition_to(&self, to: LeadStatus) -> bool {
        self.next() == Some(to)
    }
}

impl Lead {
    /// Move the lead to `to`
    ///
    /// Returns `Ok(true)` when the status changed and `Ok(false)` when the lead
    /// already had that status, so repeated dispatches stay idempotent.
    pub fn advance(&mut self, to: LeadStatus) -> Result<bool, TransitionError> {
        if self.status == to {
            return Ok(false);
        }
        if self.status == LeadStatus::Closed {
            return Err(TransitionError::Closed);
        }
        if !self.status.can_transition_to(to) {
            return Err(TransitionError::Invalid {
                from: self.status,
                to,
            });
        }

        tracing::debug!("Lead {} status {} -> {}", self.id, self.status, to);
        self.status = to;
        Ok(true)
    }
}
