//! Error types for group operations.

use thiserror::Error;

use tessera_core::{CoreError, Epoch};
use tessera_seal::SealError;
use tessera_store::StoreError;

/// Errors that can occur during group operations.
///
/// Local-rule violations (permissions, participant counts, identifier
/// length) are raised before any relay call is made.
#[derive(Debug, Error)]
pub enum GroupError {
    /// Group identifier is too short to derive a session id from.
    #[error("identifier too short: {len} bytes, need more than {min}")]
    ShortIdentifier { len: usize, min: usize },

    /// Resulting participant count is outside the configured policy.
    #[error("participants count {count} outside valid range {min}..={max}")]
    InvalidParticipantsCount {
        count: usize,
        min: usize,
        max: usize,
    },

    /// The initiator tried to remove themselves.
    #[error("initiator cannot remove themselves from the group")]
    InitiatorRemovalFailed,

    /// A non-initiator attempted a membership change or delete.
    #[error("only the group initiator may perform this operation")]
    PermissionDenied,

    /// The requested membership change is inconsistent with the current
    /// participant set.
    #[error("invalid participant change: {0}")]
    InvalidChangeParticipants(String),

    /// A group with this session id already exists on the relay.
    #[error("group already exists")]
    GroupAlreadyExists,

    /// No group is visible for this session id.
    #[error("group was not found")]
    GroupWasNotFound,

    /// The local chain is behind the relay; pull the latest epochs.
    #[error("group is outdated, update it from the relay")]
    GroupIsOutdated,

    /// A message signature failed to verify.
    #[error("message signature verification failed")]
    VerificationFailed,

    /// An envelope was sealed for a different session.
    #[error("message is not from this group")]
    MessageNotFromThisGroup,

    /// The envelope's epoch is below the held range and was never
    /// granted to this identity.
    #[error("no ticket held for epoch {0}")]
    TicketNotFound(Epoch),

    /// No card could be resolved for an identity.
    #[error("no card found for identity {0}")]
    CardNotFound(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Seal error.
    #[error("seal error: {0}")]
    Seal(#[from] SealError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for group operations.
pub type Result<T> = std::result::Result<T, GroupError>;
