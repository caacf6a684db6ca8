//! Per-recipient key shares.
//!
//! A sealed ticket carries one [`KeyShare`] per participant: the epoch
//! key material wrapped for that participant's X25519 agreement key via
//! ephemeral ECDH and ChaCha20-Poly1305. The relay stores the sealed
//! ticket but can open none of its shares.

use serde::{Deserialize, Serialize};

use tessera_core::{Epoch, KeyMaterial, SessionId};

use crate::crypto::{EphemeralKeyPair, SealNonce, X25519PublicKey, X25519StaticSecret};
use crate::error::{Result, SealError};

/// Domain separation context for wrapping an epoch key: the session id
/// followed by the big-endian epoch. Binds the share to its slot so a
/// share lifted from one epoch cannot unwrap another.
fn wrap_context(session_id: &SessionId, epoch: Epoch) -> Vec<u8> {
    let mut context = Vec::with_capacity(36);
    context.extend_from_slice(session_id.as_bytes());
    context.extend_from_slice(&epoch.to_be_bytes());
    context
}

/// One epoch key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    /// Ephemeral X25519 public key (sealer's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// The epoch key material, encrypted with the derived wrap key.
    pub encrypted_key: Vec<u8>,

    /// Nonce used for encryption.
    pub nonce: SealNonce,
}

impl KeyShare {
    /// Wrap epoch key material for a recipient.
    pub fn seal(
        session_id: &SessionId,
        epoch: Epoch,
        key: &KeyMaterial,
        recipient_public: &X25519PublicKey,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient_public);
        let wrap_key = shared.derive_wrap_key(&wrap_context(session_id, epoch));

        let nonce = SealNonce::generate();
        let encrypted_key = wrap_key.encrypt(key.as_bytes(), &nonce)?;

        Ok(Self {
            ephemeral_public,
            encrypted_key,
            nonce,
        })
    }

    /// Unwrap the epoch key material with the recipient's secret key.
    pub fn open(
        &self,
        session_id: &SessionId,
        epoch: Epoch,
        recipient_secret: &X25519StaticSecret,
    ) -> Result<KeyMaterial> {
        let shared = recipient_secret.diffie_hellman(&self.ephemeral_public);
        let wrap_key = shared.derive_wrap_key(&wrap_context(session_id, epoch));

        let key_bytes = wrap_key.decrypt(&self.encrypted_key, &self.nonce)?;

        let arr: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            SealError::DecryptionError(format!(
                "invalid key length: expected 32, got {}",
                key_bytes.len()
            ))
        })?;
        Ok(KeyMaterial::from_bytes(arr))
    }
}
