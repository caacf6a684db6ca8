//! Error types for the seal layer.

use thiserror::Error;

use tessera_core::CoreError;

pub type Result<T> = std::result::Result<T, SealError>;

/// Errors from sealing and opening tickets and envelopes.
#[derive(Debug, Error)]
pub enum SealError {
    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("no key share for this recipient")]
    NoKeyShare,

    #[error("no agreement key supplied for participant {0}")]
    MissingRecipientKey(String),

    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("envelope does not match the supplied ticket")]
    TicketMismatch,

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
