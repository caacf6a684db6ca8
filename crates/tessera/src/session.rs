//! Per-login session owning keys and the group manager.
//!
//! A [`GroupSession`] is constructed at login with the user's identity,
//! signing keypair and agreement secret, and dropped at logout. There
//! is no global state; two sessions in one process are fully
//! independent.

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera_core::{Card, Identity, Keypair};
use tessera_seal::X25519StaticSecret;
use tessera_store::{GroupCache, TicketStore};

use crate::config::GroupConfig;
use crate::error::Result;
use crate::group::Group;
use crate::manager::{derive_session_id, GroupManager};
use crate::resolver::CardResolver;

/// One logged-in identity's view of the group system.
pub struct GroupSession<S, C, R> {
    card: Card,
    manager: GroupManager<S, C, R>,
}

impl<S, C, R> GroupSession<S, C, R>
where
    S: TicketStore,
    C: GroupCache,
    R: CardResolver,
{
    pub fn new(
        card: Card,
        keypair: Keypair,
        agreement_secret: X25519StaticSecret,
        store: Arc<S>,
        cache: Arc<C>,
        resolver: Arc<R>,
        config: GroupConfig,
    ) -> Self {
        let manager = GroupManager::new(
            card.identity().clone(),
            keypair,
            agreement_secret,
            store,
            cache,
            resolver,
            config,
        );
        Self { card, manager }
    }

    pub fn identity(&self) -> &Identity {
        self.card.identity()
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    /// The underlying manager, for membership mutation.
    pub fn manager(&self) -> &GroupManager<S, C, R> {
        &self.manager
    }

    /// Derive a session id and create a group over the identifier.
    pub async fn create_group(
        &self,
        identifier: &[u8],
        participants: BTreeSet<Identity>,
    ) -> Result<Group> {
        let session_id = derive_session_id(identifier)?;
        self.manager.create_group(session_id, participants).await
    }

    /// Load a group by identifier from the relay.
    pub async fn load_group(&self, identifier: &[u8], initiator: &Identity) -> Result<Group> {
        let session_id = derive_session_id(identifier)?;
        self.manager.load_group(session_id, initiator).await
    }

    /// Retrieve a group by identifier, preferring the local cache.
    pub async fn group(&self, identifier: &[u8], initiator: &Identity) -> Result<Group> {
        let session_id = derive_session_id(identifier)?;
        self.manager.retrieve(session_id, initiator).await
    }

    /// Delete a group from the relay. Initiator only.
    pub async fn delete_group(&self, group: &mut Group) -> Result<()> {
        self.manager.delete_group(group).await
    }

    /// Drop the local cache for an identifier without touching the
    /// relay.
    pub async fn forget_group(&self, identifier: &[u8]) -> Result<()> {
        let session_id = derive_session_id(identifier)?;
        self.manager.forget_group(&session_id).await
    }
}
