//! Store traits: the abstract interfaces for ticket persistence.
//!
//! Two stores back a group session:
//!
//! - [`TicketStore`]: the shared relay holding sealed tickets. It
//!   enforces per-slot read ACLs but never sees plaintext key material.
//! - [`GroupCache`]: the local, trusted cache of opened chains, so a
//!   device can encrypt and decrypt without a relay round trip.
//!
//! Implementations include in-memory (for tests) and SQLite (for the
//! local cache).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tessera_core::{Epoch, Identity, SessionId, TicketChain};

use crate::error::Result;

/// Result of pushing a sealed ticket to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    /// The ticket was stored.
    Stored,
    /// A ticket already occupied the slot and `expect_absent` was set.
    ///
    /// The caller lost a create race; re-pull the slot to see the
    /// winner's ticket.
    Conflict,
}

/// The relay interface for sealed tickets.
///
/// One slot per (session, epoch). Slots are write-once from the relay's
/// point of view: a compare-and-swap push with `expect_absent` is how
/// the epoch-0 create race is decided.
///
/// # Design Notes
///
/// - **Opaque payloads**: the relay stores sealed ticket bytes; it
///   never parses or decrypts them.
/// - **Read ACLs**: each slot carries the set of identities allowed to
///   pull it. Revoking a reader makes the slot invisible to them, which
///   a staleness check then surfaces as removal.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Store sealed ticket bytes in the (session, epoch) slot, readable
    /// by `readers`.
    ///
    /// With `expect_absent` set, an occupied slot returns
    /// [`PushResult::Conflict`] and leaves the existing ticket in
    /// place. Without it, the slot is overwritten (used when re-sealing
    /// an epoch for re-added participants).
    async fn push(
        &self,
        session_id: &SessionId,
        epoch: Epoch,
        readers: &BTreeSet<Identity>,
        bytes: &[u8],
        expect_absent: bool,
    ) -> Result<PushResult>;

    /// Fetch the sealed ticket in the (session, epoch) slot, as seen by
    /// `reader`.
    ///
    /// Returns `None` when the slot is empty or the reader is not on
    /// its ACL. The two cases are indistinguishable on purpose: a
    /// removed participant learns nothing beyond "not for you".
    async fn pull(
        &self,
        reader: &Identity,
        session_id: &SessionId,
        epoch: Epoch,
    ) -> Result<Option<Vec<u8>>>;

    /// List the epochs of a session readable by `reader`, ascending.
    async fn list_epochs(&self, reader: &Identity, session_id: &SessionId) -> Result<Vec<Epoch>>;

    /// Remove a reader from slot ACLs.
    ///
    /// With `epoch: None`, the reader is removed from every epoch of
    /// the session.
    async fn revoke(
        &self,
        session_id: &SessionId,
        reader: &Identity,
        epoch: Option<Epoch>,
    ) -> Result<()>;

    /// Delete every slot of a session.
    async fn reset(&self, session_id: &SessionId) -> Result<()>;
}

/// A locally cached, fully opened chain for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedChain {
    /// The identity that created the session and signs its tickets.
    pub initiator: Identity,
    /// The opened tickets this device holds.
    pub chain: TicketChain,
}

/// The local cache of opened chains.
///
/// Unlike the relay, the cache holds plaintext key material. It lives
/// on the device and is trusted.
#[async_trait]
pub trait GroupCache: Send + Sync {
    /// Load the cached chain for a session, if present.
    async fn load(&self, session_id: &SessionId) -> Result<Option<CachedChain>>;

    /// Store or replace the cached chain for a session.
    async fn save(&self, session_id: &SessionId, cached: &CachedChain) -> Result<()>;

    /// Remove the cached chain for a session.
    async fn evict(&self, session_id: &SessionId) -> Result<()>;

    /// Remove every cached chain.
    async fn reset(&self) -> Result<()>;
}
