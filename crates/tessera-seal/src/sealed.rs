//! Sealed tickets: the at-rest wire form.
//!
//! A [`SealedTicket`] is what the relay stores for one epoch. It holds
//! a signed canonical header (session id, epoch, timestamp, membership)
//! plus one wrapped key share per participant. The relay can read the
//! header but cannot open any share.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tessera_core::{
    canonical, AgreementPublicKey, Ed25519PublicKey, Ed25519Signature, Epoch, Identity, Keypair,
    SessionId, Ticket,
};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::error::{Result, SealError};
use crate::keyshare::KeyShare;

/// Current sealed ticket wire version.
pub const SEAL_VERSION: u8 = 1;

/// Header field keys (integer keys for compact encoding).
mod keys {
    pub const VERSION: u64 = 0;
    pub const SESSION_ID: u64 = 1;
    pub const EPOCH: u64 = 2;
    pub const CREATED_AT: u64 = 3;
    pub const PARTICIPANTS: u64 = 4;
}

/// The signed, relay-readable part of a sealed ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketHeader {
    pub version: u8,
    pub session_id: SessionId,
    pub epoch: Epoch,
    pub created_at: i64,
    pub participants: BTreeSet<Identity>,
}

impl TicketHeader {
    /// Encode to canonical CBOR bytes. This is the signed message.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let participants: Vec<Value> = self
            .participants
            .iter()
            .map(|p| Value::Text(p.as_str().to_string()))
            .collect();

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
                Value::Integer(keys::CREATED_AT.into()),
                Value::Integer(self.created_at.into()),
            ),
            (
                Value::Integer(keys::PARTICIPANTS.into()),
                Value::Array(participants),
            ),
        ];

        canonical::encode_canonical(&Value::Map(entries))
    }
}

/// A ticket sealed for storage: signed header plus per-recipient key
/// shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedTicket {
    pub header: TicketHeader,
    pub shares: BTreeMap<Identity, KeyShare>,
    pub signature: Ed25519Signature,
}

impl SealedTicket {
    /// Seal a ticket for its participant set.
    ///
    /// `recipients` maps each participant to the agreement key the key
    /// share should be wrapped for. Every participant in the ticket
    /// must have a recipient key.
    pub fn seal(
        ticket: &Ticket,
        signer: &Keypair,
        recipients: &BTreeMap<Identity, AgreementPublicKey>,
    ) -> Result<Self> {
        let header = TicketHeader {
            version: SEAL_VERSION,
            session_id: ticket.session_id,
            epoch: ticket.epoch,
            created_at: ticket.created_at,
            participants: ticket.participants.clone(),
        };

        let mut shares = BTreeMap::new();
        for participant in &ticket.participants {
            let agreement_key = recipients
                .get(participant)
                .ok_or_else(|| SealError::MissingRecipientKey(participant.to_string()))?;

            let share = KeyShare::seal(
                &ticket.session_id,
                ticket.epoch,
                &ticket.key,
                &X25519PublicKey::from(*agreement_key),
            )?;
            shares.insert(participant.clone(), share);
        }

        let signature = signer.sign(&header.canonical_bytes());

        Ok(Self {
            header,
            shares,
            signature,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.header.session_id
    }

    pub fn epoch(&self) -> Epoch {
        self.header.epoch
    }

    pub fn participants(&self) -> &BTreeSet<Identity> {
        &self.header.participants
    }

    /// Verify the header signature against the sealer's signing key.
    pub fn verify(&self, signer_key: &Ed25519PublicKey) -> Result<()> {
        if self.header.version != SEAL_VERSION {
            return Err(SealError::UnsupportedVersion(self.header.version));
        }
        signer_key.verify(&self.header.canonical_bytes(), &self.signature)?;
        Ok(())
    }

    /// Verify and open the ticket as the given participant.
    pub fn open(
        &self,
        identity: &Identity,
        secret: &X25519StaticSecret,
        signer_key: &Ed25519PublicKey,
    ) -> Result<Ticket> {
        self.verify(signer_key)?;

        let share = self.shares.get(identity).ok_or(SealError::NoKeyShare)?;
        let key = share.open(&self.header.session_id, self.header.epoch, secret)?;

        Ok(Ticket {
            session_id: self.header.session_id,
            epoch: self.header.epoch,
            key,
            participants: self.header.participants.clone(),
            created_at: self.header.created_at,
        })
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
        let sealed: Self = ciborium::from_reader(bytes)
            .map_err(|e| SealError::SerializationError(e.to_string()))?;
        if sealed.header.version != SEAL_VERSION {
            return Err(SealError::UnsupportedVersion(sealed.header.version));
        }
        Ok(sealed)
    }
}
