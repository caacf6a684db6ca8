//! # Tessera Store
//!
//! Storage abstractions for Tessera. Provides trait-based interfaces
//! for the sealed-ticket relay and the local group cache, with
//! in-memory and SQLite implementations.
//!
//! ## Overview
//!
//! Group sessions touch two very different stores:
//!
//! - The **relay** ([`TicketStore`]) is shared and untrusted. It holds
//!   sealed ticket bytes in one slot per (session, epoch) and enforces
//!   per-slot read ACLs. [`MemoryTicketStore`] implements it for tests.
//! - The **cache** ([`GroupCache`]) is local and trusted. It holds
//!   opened chains so encryption needs no relay round trip.
//!   [`SqliteGroupCache`] is the persistent implementation,
//!   [`MemoryGroupCache`] the test one.
//!
//! ## Key Types
//!
//! - [`TicketStore`] - The async trait for the sealed-ticket relay
//! - [`GroupCache`] - The async trait for the local chain cache
//! - [`PushResult`] - Outcome of a compare-and-swap push
//! - [`CachedChain`] - An opened chain plus its initiator

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryGroupCache, MemoryTicketStore};
pub use sqlite::SqliteGroupCache;
pub use traits::{CachedChain, GroupCache, PushResult, TicketStore};
