//! # Tessera Seal
//!
//! Sealed tickets and envelope encryption for Tessera group sessions.
//!
//! ## Overview
//!
//! This crate defines the two wire forms that leave a device:
//!
//! - **SealedTicket**: one epoch of key material, wrapped per recipient
//!   and signed by the initiator. This is what the relay stores.
//! - **GroupEnvelope**: one encrypted group message, tagged with the
//!   epoch it was sealed under and signed by the sender.
//!
//! ## Encryption Model
//!
//! Each epoch has fresh 256-bit key material (ChaCha20-Poly1305). The
//! epoch key is never stored in the clear: a sealed ticket carries one
//! key share per participant, produced via ephemeral X25519 ECDH
//! against that participant's agreement key. The relay can read ticket
//! headers (session id, epoch, membership) but can open no share and
//! no envelope.
//!
//! Key wrapping is domain separated by session id and epoch, so a
//! share lifted from one slot cannot unwrap another.

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keyshare;
pub mod sealed;

pub use crypto::{
    EphemeralKeyPair, SealKey, SealNonce, SharedKey, X25519PublicKey, X25519StaticSecret,
};
pub use envelope::{GroupEnvelope, ENVELOPE_VERSION};
pub use error::{Result, SealError};
pub use keyshare::KeyShare;
pub use sealed::{SealedTicket, TicketHeader, SEAL_VERSION};
