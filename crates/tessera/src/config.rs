//! Configuration for the group manager.

use tessera_core::ParticipantPolicy;

/// What happens to a removed participant's access to old epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationPolicy {
    /// Removed participants keep relay access to epochs they already
    /// held; they are only excluded from the new epoch onward.
    NewEpochOnly,
    /// Removed participants lose relay access to every epoch of the
    /// session. Locally cached keys are out of our hands either way.
    #[default]
    AllEpochs,
}

/// Configuration for [`crate::GroupManager`].
#[derive(Debug, Clone, Default)]
pub struct GroupConfig {
    /// Bounds on the participant count, counting the initiator.
    pub policy: ParticipantPolicy,
    /// How removal treats historical epochs on the relay.
    pub revocation: RevocationPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GroupConfig::default();
        assert_eq!(config.policy.min, 2);
        assert_eq!(config.policy.max, 100);
        assert_eq!(config.revocation, RevocationPolicy::AllEpochs);
    }
}
