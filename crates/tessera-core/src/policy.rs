//! Participant count policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Bounds on the number of participants a session may hold, counting
/// the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPolicy {
    pub min: usize,
    pub max: usize,
}

impl ParticipantPolicy {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Check a proposed participant count against the policy.
    pub fn validate(&self, count: usize) -> Result<(), CoreError> {
        if count < self.min || count > self.max {
            return Err(CoreError::InvalidParticipantsCount {
                count,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for ParticipantPolicy {
    fn default() -> Self {
        Self { min: 2, max: 100 }
    }
}
