//! # Tessera
//!
//! Epoch-keyed group sessions over an untrusted relay.
//!
//! ## Overview
//!
//! A group session is a chain of tickets, one per epoch. Every
//! membership change mints a successor ticket with fresh key material,
//! so removed participants cannot read new messages and joiners cannot
//! read old ones. The relay stores only sealed tickets; it never sees
//! a key.
//!
//! This crate ties the lower layers together into the client API:
//!
//! - [`GroupManager`] - the sole chain mutator; talks to the relay
//! - [`Group`] - a handle for encrypting, decrypting, and staleness
//! - [`GroupSession`] - a per-login value owning keys and the manager
//! - [`CardResolver`] - resolves identities to their public-key cards
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//! use tessera::{GroupConfig, GroupSession, StaticCardResolver};
//! use tessera_core::{Card, Identity, Keypair};
//! use tessera_seal::X25519StaticSecret;
//! use tessera_store::{MemoryGroupCache, MemoryTicketStore};
//!
//! # async fn example() -> tessera::Result<()> {
//! let keypair = Keypair::generate();
//! let secret = X25519StaticSecret::generate();
//! let card = Card::new(
//!     Identity::from("alice"),
//!     keypair.public_key(),
//!     secret.public_key().into(),
//!     0,
//! );
//!
//! let resolver = Arc::new(StaticCardResolver::new());
//! resolver.put(card.clone());
//!
//! let session = GroupSession::new(
//!     card,
//!     keypair,
//!     secret,
//!     Arc::new(MemoryTicketStore::new()),
//!     Arc::new(MemoryGroupCache::new()),
//!     resolver,
//!     GroupConfig::default(),
//! );
//!
//! let members: BTreeSet<Identity> = [Identity::from("bob")].into();
//! let group = session.create_group(b"my-team-channel", members).await?;
//! let envelope = group.encrypt(b"hello")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod group;
pub mod manager;
pub mod resolver;
pub mod session;

pub use config::{GroupConfig, RevocationPolicy};
pub use error::{GroupError, Result};
pub use group::{Group, GroupState};
pub use manager::{derive_session_id, GroupManager};
pub use resolver::{CardResolver, StaticCardResolver};
pub use session::GroupSession;
