//! Group message envelopes.
//!
//! A [`GroupEnvelope`] is one encrypted message: ciphertext under the
//! epoch key, tagged with the session id and epoch it was encrypted
//! under, and signed by the sender. Receivers select the matching
//! ticket by epoch, verify the sender's signature against the key that
//! was current at send time, then decrypt.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use tessera_core::{
    canonical, Ed25519PublicKey, Ed25519Signature, Epoch, Identity, Keypair, SessionId, Ticket,
};

use crate::crypto::{SealKey, SealNonce};
use crate::error::{Result, SealError};

/// Current envelope wire version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Signed field keys.
mod keys {
    pub const VERSION: u64 = 0;
    pub const SESSION_ID: u64 = 1;
    pub const EPOCH: u64 = 2;
    pub const SENDER: u64 = 3;
    pub const TIMESTAMP: u64 = 4;
    pub const NONCE: u64 = 5;
    pub const CIPHERTEXT: u64 = 6;
}

/// One encrypted group message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEnvelope {
    pub version: u8,
    pub session_id: SessionId,
    pub epoch: Epoch,
    pub sender: Identity,
    /// Millisecond timestamp at which the message was sealed. Used to
    /// pick the sender's signing key generation on verification.
    pub timestamp: i64,
    pub nonce: SealNonce,
    pub ciphertext: Vec<u8>,
    pub signature: Ed25519Signature,
}

impl GroupEnvelope {
    /// Encrypt and sign a message under the given ticket.
    pub fn seal(
        plaintext: &[u8],
        ticket: &Ticket,
        sender: Identity,
        timestamp: i64,
        signer: &Keypair,
    ) -> Result<Self> {
        let key = SealKey::from(&ticket.key);
        let nonce = SealNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        let mut envelope = Self {
            version: ENVELOPE_VERSION,
            session_id: ticket.session_id,
            epoch: ticket.epoch,
            sender,
            timestamp,
            nonce,
            ciphertext,
            signature: Ed25519Signature::from_bytes([0u8; 64]),
        };
        envelope.signature = signer.sign(&envelope.signed_bytes());
        Ok(envelope)
    }

    /// Verify the sender's signature, then decrypt under the ticket.
    ///
    /// The caller selects the ticket whose epoch matches the envelope
    /// and resolves `sender_key` from the sender's card at
    /// `self.timestamp`.
    pub fn open(&self, ticket: &Ticket, sender_key: &Ed25519PublicKey) -> Result<Vec<u8>> {
        if self.version != ENVELOPE_VERSION {
            return Err(SealError::UnsupportedVersion(self.version));
        }
        if ticket.session_id != self.session_id || ticket.epoch != self.epoch {
            return Err(SealError::TicketMismatch);
        }

        sender_key.verify(&self.signed_bytes(), &self.signature)?;

        let key = SealKey::from(&ticket.key);
        key.decrypt(&self.ciphertext, &self.nonce)
    }

    /// The canonical bytes covered by the signature.
    fn signed_bytes(&self) -> Vec<u8> {
        let entries = vec![
            (
                Value::Integer(keys::VERSION.into()),
                Value::Integer(self.version.into()),
            ),
            (
                Value::Integer(keys::SESSION_ID.into()),
                Value::Bytes(self.session_id.as_bytes().to_vec()),
            ),
            (
                Value::Integer(keys::EPOCH.into()),
                Value::Integer(self.epoch.into()),
            ),
            (
                Value::Integer(keys::SENDER.into()),
                Value::Text(self.sender.as_str().to_string()),
            ),
            (
                Value::Integer(keys::TIMESTAMP.into()),
                Value::Integer(self.timestamp.into()),
            ),
            (
                Value::Integer(keys::NONCE.into()),
                Value::Bytes(self.nonce.as_bytes().to_vec()),
            ),
            (
                Value::Integer(keys::CIPHERTEXT.into()),
                Value::Bytes(self.ciphertext.clone()),
            ),
        ];

        canonical::encode_canonical(&Value::Map(entries))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| SealError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| SealError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tessera_core::KeyMaterial;

    fn ticket(epoch: Epoch) -> Ticket {
        let participants: BTreeSet<Identity> =
            [Identity::from("alice"), Identity::from("bob")].into();
        Ticket {
            session_id: SessionId::derive(b"envelope-test-session").unwrap(),
            epoch,
            key: KeyMaterial::generate(),
            participants,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let signer = Keypair::from_seed(&[0x42; 32]);
        let t = ticket(0);

        let envelope = GroupEnvelope::seal(
            b"hello group",
            &t,
            Identity::from("alice"),
            1_700_000_001_000,
            &signer,
        )
        .unwrap();

        let plaintext = envelope.open(&t, &signer.public_key()).unwrap();
        assert_eq!(plaintext, b"hello group");
    }

    #[test]
    fn test_wrong_sender_key_rejected() {
        let signer = Keypair::from_seed(&[0x42; 32]);
        let impostor = Keypair::from_seed(&[0x43; 32]);
        let t = ticket(0);

        let envelope =
            GroupEnvelope::seal(b"msg", &t, Identity::from("alice"), 1000, &signer).unwrap();

        assert!(envelope.open(&t, &impostor.public_key()).is_err());
    }

    #[test]
    fn test_mismatched_ticket_rejected() {
        let signer = Keypair::from_seed(&[0x42; 32]);
        let t0 = ticket(0);
        let t1 = ticket(1);

        let envelope =
            GroupEnvelope::seal(b"msg", &t0, Identity::from("alice"), 1000, &signer).unwrap();

        let err = envelope.open(&t1, &signer.public_key()).unwrap_err();
        assert!(matches!(err, SealError::TicketMismatch));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let signer = Keypair::from_seed(&[0x42; 32]);
        let t = ticket(0);

        let mut envelope =
            GroupEnvelope::seal(b"msg", &t, Identity::from("alice"), 1000, &signer).unwrap();
        if let Some(byte) = envelope.ciphertext.first_mut() {
            *byte ^= 0xff;
        }

        // Signature covers the ciphertext, so verification fails
        // before decryption is attempted.
        assert!(envelope.open(&t, &signer.public_key()).is_err());
    }

    #[test]
    fn test_wire_roundtrip() {
        let signer = Keypair::from_seed(&[0x42; 32]);
        let t = ticket(3);

        let envelope =
            GroupEnvelope::seal(b"payload", &t, Identity::from("bob"), 2000, &signer).unwrap();
        let bytes = envelope.to_bytes().unwrap();
        let recovered = GroupEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(envelope, recovered);
        assert_eq!(recovered.open(&t, &signer.public_key()).unwrap(), b"payload");
    }
}
