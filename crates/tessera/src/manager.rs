//! The group manager: the sole mutator of ticket chains.
//!
//! Every chain mutation (create, extend, revoke, delete) and every
//! relay interaction goes through [`GroupManager`]. The [`Group`]
//! handle it returns is a read/encrypt view; the manager updates it in
//! place after the relay accepts a change, and the local cache is
//! written only after remote success.

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera_core::{now_millis, Card, CoreError, Identity, Keypair, SessionId, Ticket, TicketChain};
use tessera_seal::{SealedTicket, X25519StaticSecret};
use tessera_store::{CachedChain, GroupCache, PushResult, StoreError, TicketStore};

use crate::config::{GroupConfig, RevocationPolicy};
use crate::error::{GroupError, Result};
use crate::group::{Group, GroupState};
use crate::resolver::{resolve_agreement_keys, CardResolver};

/// Derive a session id from a group identifier.
///
/// Fails with [`GroupError::ShortIdentifier`] for identifiers of 10
/// bytes or fewer.
pub fn derive_session_id(identifier: &[u8]) -> Result<SessionId> {
    SessionId::derive(identifier).map_err(|e| match e {
        CoreError::ShortIdentifier { len, min } => GroupError::ShortIdentifier { len, min },
        other => GroupError::Core(other),
    })
}

/// Manages group sessions for one identity.
pub struct GroupManager<S, C, R> {
    identity: Identity,
    keypair: Keypair,
    agreement_secret: X25519StaticSecret,
    store: Arc<S>,
    cache: Arc<C>,
    resolver: Arc<R>,
    config: GroupConfig,
}

impl<S, C, R> GroupManager<S, C, R>
where
    S: TicketStore,
    C: GroupCache,
    R: CardResolver,
{
    pub fn new(
        identity: Identity,
        keypair: Keypair,
        agreement_secret: X25519StaticSecret,
        store: Arc<S>,
        cache: Arc<C>,
        resolver: Arc<R>,
        config: GroupConfig,
    ) -> Self {
        Self {
            identity,
            keypair,
            agreement_secret,
            store,
            cache,
            resolver,
            config,
        }
    }

    /// The identity this manager operates as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Create a new group session at epoch 0.
    ///
    /// The caller becomes the initiator and is always counted as a
    /// participant. The epoch-0 push is a compare-and-swap: losing the
    /// create race to another device fails with
    /// [`GroupError::GroupAlreadyExists`] when the winner's ticket is
    /// intact on the relay.
    pub async fn create_group(
        &self,
        session_id: SessionId,
        participants: BTreeSet<Identity>,
    ) -> Result<Group> {
        let mut participants = participants;
        participants.insert(self.identity.clone());
        self.validate_count(participants.len())?;

        let ticket = Ticket::root(session_id, participants.clone(), now_millis());
        let recipients = resolve_agreement_keys(self.resolver.as_ref(), &participants).await?;
        let sealed = SealedTicket::seal(&ticket, &self.keypair, &recipients)?;
        let bytes = sealed.to_bytes()?;

        let result = self
            .store
            .push(&session_id, 0, &participants, &bytes, true)
            .await?;

        if result == PushResult::Conflict {
            // Lost the create race. If the winner's ticket is intact,
            // report the group as existing; a corrupt slot is a relay
            // fault and is reported as such.
            let existing = self.store.pull(&self.identity, &session_id, 0).await?;
            return match existing {
                Some(bytes) if SealedTicket::from_bytes(&bytes).is_ok() => {
                    Err(GroupError::GroupAlreadyExists)
                }
                Some(_) => Err(GroupError::Store(StoreError::InvalidData(
                    "epoch 0 slot holds an undecodable ticket".into(),
                ))),
                None => Err(GroupError::GroupAlreadyExists),
            };
        }

        tracing::debug!(
            session = %session_id,
            participants = participants.len(),
            "created group"
        );

        let chain = TicketChain::from_tickets([ticket]).map_err(GroupError::Core)?;
        let initiator = self.identity.clone();
        self.save_cache(&session_id, &initiator, &chain).await?;

        Ok(self.make_group(session_id, self.identity.clone(), chain))
    }

    /// Pull a group's full visible chain from the relay, replacing any
    /// cached copy.
    ///
    /// Zero visible epochs means the session does not exist for this
    /// identity (never created, deleted, or this identity was removed);
    /// the cache is evicted and [`GroupError::GroupWasNotFound`] is
    /// returned.
    pub async fn load_group(&self, session_id: SessionId, initiator: &Identity) -> Result<Group> {
        let chain = self
            .pull_chain(session_id, initiator, TicketChain::new())
            .await?;

        let cached = CachedChain {
            initiator: initiator.clone(),
            chain: chain.clone(),
        };
        self.cache.save(&session_id, &cached).await?;

        Ok(self.make_group(session_id, initiator.clone(), chain))
    }

    /// Retrieve a group, preferring the local cache.
    pub async fn retrieve(&self, session_id: SessionId, initiator: &Identity) -> Result<Group> {
        if let Some(cached) = self.cache.load(&session_id).await? {
            return Ok(self.make_group(session_id, cached.initiator, cached.chain));
        }
        self.load_group(session_id, initiator).await
    }

    /// Bring a handle up to date with the relay.
    ///
    /// Pulls epochs above the held maximum, merging into the handle's
    /// own chain. A session with no visible epochs has converged to
    /// deleted: the cache is evicted, the handle is marked deleted, and
    /// [`GroupError::GroupWasNotFound`] is returned.
    pub async fn update(&self, group: &mut Group) -> Result<()> {
        if group.state() == GroupState::Deleted {
            return Err(GroupError::GroupWasNotFound);
        }

        let session_id = group.session_id();
        let initiator = group.initiator().clone();
        let base = group.chain().clone();

        let chain = match self.pull_chain(session_id, &initiator, base).await {
            Ok(chain) => chain,
            Err(GroupError::GroupWasNotFound) => {
                group.mark_deleted();
                return Err(GroupError::GroupWasNotFound);
            }
            Err(e) => return Err(e),
        };

        self.save_cache(&session_id, &initiator, &chain).await?;
        group.replace_chain(chain);
        Ok(())
    }

    /// Add participants to the group, advancing it by one epoch.
    ///
    /// Initiator only. Joiners receive the new epoch onward; historical
    /// epochs are never granted to them.
    pub async fn add_participants(
        &self,
        group: &mut Group,
        add: BTreeSet<Identity>,
    ) -> Result<()> {
        self.require_fresh(group)?;
        self.require_initiator(group)?;

        if add.is_empty() {
            return Err(GroupError::InvalidChangeParticipants(
                "no participants to add".into(),
            ));
        }
        let current = group.participants()?.clone();
        if let Some(already) = add.iter().find(|p| current.contains(*p)) {
            return Err(GroupError::InvalidChangeParticipants(format!(
                "{} is already a participant",
                already
            )));
        }

        let mut next_set = current;
        next_set.extend(add.iter().cloned());
        self.validate_count(next_set.len())?;

        let latest = group
            .chain()
            .latest()
            .ok_or(GroupError::GroupWasNotFound)?
            .clone();
        let next = latest.next(next_set.clone(), now_millis());

        self.push_next_epoch(group, next).await?;

        tracing::debug!(
            session = %group.session_id(),
            added = add.len(),
            epoch = group.current_epoch(),
            "added participants"
        );
        Ok(())
    }

    /// Remove participants from the group, advancing it by one epoch.
    ///
    /// Initiator only, and the initiator cannot remove themselves.
    /// Depending on [`RevocationPolicy`], removed participants also
    /// lose relay access to historical epochs.
    pub async fn remove_participants(
        &self,
        group: &mut Group,
        remove: BTreeSet<Identity>,
    ) -> Result<()> {
        self.require_fresh(group)?;
        self.require_initiator(group)?;

        if remove.contains(&self.identity) {
            return Err(GroupError::InitiatorRemovalFailed);
        }
        if remove.is_empty() {
            return Err(GroupError::InvalidChangeParticipants(
                "no participants to remove".into(),
            ));
        }
        let current = group.participants()?.clone();
        if let Some(absent) = remove.iter().find(|p| !current.contains(*p)) {
            return Err(GroupError::InvalidChangeParticipants(format!(
                "{} is not a participant",
                absent
            )));
        }

        let remaining: BTreeSet<Identity> = current.difference(&remove).cloned().collect();
        self.validate_count(remaining.len())?;

        let latest = group
            .chain()
            .latest()
            .ok_or(GroupError::GroupWasNotFound)?
            .clone();
        let next = latest.next(remaining, now_millis());
        let session_id = group.session_id();

        self.push_next_epoch(group, next).await?;

        if self.config.revocation == RevocationPolicy::AllEpochs {
            for removed in &remove {
                self.store.revoke(&session_id, removed, None).await?;
            }
        }

        tracing::debug!(
            session = %session_id,
            removed = remove.len(),
            epoch = group.current_epoch(),
            "removed participants"
        );
        Ok(())
    }

    /// Re-share the current epoch with a participant whose card was
    /// replaced.
    ///
    /// Initiator only. The current epoch's ticket is re-sealed against
    /// the participant's new agreement key; the key material itself is
    /// unchanged and no new epoch is minted. Access starts over at the
    /// current epoch: older epochs are never retroactively re-granted,
    /// since the rotated keys could not open them anyway.
    pub async fn re_add_participant(&self, group: &mut Group, who: &Identity) -> Result<()> {
        self.require_fresh(group)?;
        self.require_initiator(group)?;

        if who == &self.identity {
            return Err(GroupError::InvalidChangeParticipants(
                "cannot re-add the initiator".into(),
            ));
        }
        if !group.participants()?.contains(who) {
            return Err(GroupError::InvalidChangeParticipants(format!(
                "{} is not a participant",
                who
            )));
        }

        let session_id = group.session_id();
        let latest = group
            .chain()
            .latest()
            .ok_or(GroupError::GroupWasNotFound)?
            .clone();

        // Drop stale grants, then re-push the current epoch sealed with
        // current cards.
        self.store.revoke(&session_id, who, None).await?;

        let recipients =
            resolve_agreement_keys(self.resolver.as_ref(), &latest.participants).await?;
        let sealed = SealedTicket::seal(&latest, &self.keypair, &recipients)?;
        let bytes = sealed.to_bytes()?;

        self.store
            .push(&session_id, latest.epoch, &latest.participants, &bytes, false)
            .await?;

        tracing::debug!(session = %session_id, who = %who, "re-added participant");
        Ok(())
    }

    /// Delete the session from the relay and evict the local cache.
    ///
    /// Initiator only. Other participants converge to
    /// [`GroupError::GroupWasNotFound`] on their next update.
    pub async fn delete_group(&self, group: &mut Group) -> Result<()> {
        if group.state() == GroupState::Deleted {
            return Err(GroupError::GroupWasNotFound);
        }
        self.require_initiator(group)?;

        let session_id = group.session_id();
        self.store.reset(&session_id).await?;
        self.cache.evict(&session_id).await?;
        group.mark_deleted();

        tracing::debug!(session = %session_id, "deleted group");
        Ok(())
    }

    /// Drop the local cache for a session without touching the relay.
    pub async fn forget_group(&self, session_id: &SessionId) -> Result<()> {
        self.cache.evict(session_id).await?;
        Ok(())
    }

    fn make_group(&self, session_id: SessionId, initiator: Identity, chain: TicketChain) -> Group {
        Group::new(
            session_id,
            initiator,
            self.identity.clone(),
            self.keypair.clone(),
            chain,
        )
    }

    fn validate_count(&self, count: usize) -> Result<()> {
        self.config.policy.validate(count).map_err(|e| match e {
            CoreError::InvalidParticipantsCount { count, min, max } => {
                GroupError::InvalidParticipantsCount { count, min, max }
            }
            other => GroupError::Core(other),
        })
    }

    fn require_initiator(&self, group: &Group) -> Result<()> {
        if group.initiator() != &self.identity {
            return Err(GroupError::PermissionDenied);
        }
        Ok(())
    }

    fn require_fresh(&self, group: &Group) -> Result<()> {
        match group.state() {
            GroupState::Fresh => Ok(()),
            GroupState::Stale => Err(GroupError::GroupIsOutdated),
            GroupState::Deleted => Err(GroupError::GroupWasNotFound),
        }
    }

    /// Pull and open every visible epoch above the base chain's
    /// maximum, merged into the base. An empty base pulls everything.
    async fn pull_chain(
        &self,
        session_id: SessionId,
        initiator: &Identity,
        base: TicketChain,
    ) -> Result<TicketChain> {
        let epochs = self.store.list_epochs(&self.identity, &session_id).await?;
        if epochs.is_empty() {
            self.cache.evict(&session_id).await?;
            tracing::debug!(session = %session_id, "no visible epochs, group gone");
            return Err(GroupError::GroupWasNotFound);
        }

        let initiator_card = self.resolver.resolve(initiator).await?;

        let after = base.max_epoch();
        let mut chain = base;

        for epoch in epochs {
            if after.is_some_and(|held| epoch <= held) {
                continue;
            }
            let bytes = self
                .store
                .pull(&self.identity, &session_id, epoch)
                .await?
                .ok_or(GroupError::GroupWasNotFound)?;

            let ticket = self.open_sealed(&bytes, &initiator_card)?;
            chain.insert(ticket).map_err(GroupError::Core)?;
        }

        chain.validate_contiguous().map_err(GroupError::Core)?;
        Ok(chain)
    }

    /// Verify and open a sealed ticket pulled from the relay.
    ///
    /// The initiator's signing key is selected from their card history
    /// by the ticket's mint time, so tickets signed before a key
    /// rotation still verify.
    fn open_sealed(&self, bytes: &[u8], initiator_card: &Card) -> Result<Ticket> {
        let sealed = SealedTicket::from_bytes(bytes)?;
        let signer_key = initiator_card.signing_key_at(sealed.header.created_at);

        let ticket = sealed.open(&self.identity, &self.agreement_secret, &signer_key)?;
        Ok(ticket)
    }

    /// Seal and push a successor epoch, then commit it to the handle
    /// and cache. A conflict means another device extended the chain
    /// first; the handle goes stale.
    async fn push_next_epoch(&self, group: &mut Group, next: Ticket) -> Result<()> {
        let session_id = group.session_id();
        let recipients =
            resolve_agreement_keys(self.resolver.as_ref(), &next.participants).await?;
        let sealed = SealedTicket::seal(&next, &self.keypair, &recipients)?;
        let bytes = sealed.to_bytes()?;

        let result = self
            .store
            .push(&session_id, next.epoch, &next.participants, &bytes, true)
            .await?;

        if result == PushResult::Conflict {
            tracing::warn!(
                session = %session_id,
                epoch = next.epoch,
                "lost extension race, handle is stale"
            );
            group.mark_stale();
            return Err(GroupError::GroupIsOutdated);
        }

        group.chain_mut().insert(next).map_err(GroupError::Core)?;
        let initiator = group.initiator().clone();
        self.save_cache(&session_id, &initiator, group.chain()).await?;
        Ok(())
    }

    async fn save_cache(
        &self,
        session_id: &SessionId,
        initiator: &Identity,
        chain: &TicketChain,
    ) -> Result<()> {
        let cached = CachedChain {
            initiator: initiator.clone(),
            chain: chain.clone(),
        };
        self.cache.save(session_id, &cached).await?;
        Ok(())
    }
}
