//! # Tessera Core
//!
//! Pure primitives for Tessera group sessions: tickets, chains, cards,
//! and canonicalization.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Ticket`] - One epoch of group key material plus the membership valid under it
//! - [`TicketChain`] - The epoch-indexed sequence of tickets for one session
//! - [`SessionId`] - Fixed-length identifier derived from a group identifier
//! - [`Card`] - An identity's public keys with a dated rotation history
//!
//! ## Canonicalization
//!
//! Signed wire forms are encoded using deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod card;
pub mod crypto;
pub mod error;
pub mod policy;
pub mod session;
pub mod ticket;
pub mod types;

pub use canonical::encode_canonical;
pub use card::{Card, CardEntry};
pub use crypto::{AgreementPublicKey, Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::CoreError;
pub use policy::ParticipantPolicy;
pub use session::{SessionId, MIN_IDENTIFIER_LEN};
pub use ticket::{now_millis, KeyMaterial, Ticket, TicketChain};
pub use types::{Epoch, Identity};
