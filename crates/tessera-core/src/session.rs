//! Session identifiers.
//!
//! A [`SessionId`] is derived from a caller-chosen group identifier by
//! hashing with SHA-512 and truncating to 32 bytes. The derivation is a
//! pure function, so any party holding the identifier computes the same
//! session id without coordination.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::CoreError;

/// Identifiers must be strictly longer than this many bytes.
pub const MIN_IDENTIFIER_LEN: usize = 10;

/// A 32-byte session identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub [u8; 32]);

impl SessionId {
    /// Derive a session id from a group identifier.
    ///
    /// Returns [`CoreError::ShortIdentifier`] when the identifier is 10
    /// bytes or fewer. Short identifiers make the derived id guessable.
    pub fn derive(identifier: &[u8]) -> Result<Self, CoreError> {
        if identifier.len() <= MIN_IDENTIFIER_LEN {
            return Err(CoreError::ShortIdentifier {
                len: identifier.len(),
                min: MIN_IDENTIFIER_LEN,
            });
        }

        let digest = Sha512::digest(identifier);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest[..32]);
        Ok(Self(bytes))
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::DecodingError("session id must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
