//! Error types for Tessera Core.

use thiserror::Error;

/// Core errors that can occur during ticket and chain operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("identifier too short: {len} bytes, need more than {min}")]
    ShortIdentifier { len: usize, min: usize },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("participants count {count} outside valid range {min}..={max}")]
    InvalidParticipantsCount {
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("ticket belongs to a different session")]
    SessionMismatch,

    #[error("chain already holds epoch {0}")]
    DuplicateEpoch(u32),

    #[error("chain is missing epochs {missing:?}")]
    EpochGap { missing: Vec<u32> },

    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
