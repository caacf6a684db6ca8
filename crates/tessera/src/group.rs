//! The group handle: encryption, decryption, and staleness tracking.
//!
//! A [`Group`] is a client-side view of one session: the opened ticket
//! chain this device holds plus a freshness state. All membership
//! mutation goes through [`crate::GroupManager`], which updates the
//! handle in place after the relay accepts a change.

use std::collections::BTreeSet;

use tessera_core::{now_millis, Card, Epoch, Identity, Keypair, SessionId, TicketChain};
use tessera_seal::{GroupEnvelope, SealError};

use crate::error::{GroupError, Result};

/// Freshness of a group handle relative to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// The handle is usable; the chain is believed current.
    Fresh,
    /// The relay holds epochs this handle does not. Encryption and
    /// decryption are refused until the handle is updated.
    Stale,
    /// The session was deleted. The handle refuses everything.
    Deleted,
}

/// A client-side handle on one group session.
#[derive(Debug)]
pub struct Group {
    session_id: SessionId,
    initiator: Identity,
    identity: Identity,
    keypair: Keypair,
    chain: TicketChain,
    state: GroupState,
}

impl Group {
    pub(crate) fn new(
        session_id: SessionId,
        initiator: Identity,
        identity: Identity,
        keypair: Keypair,
        chain: TicketChain,
    ) -> Self {
        Self {
            session_id,
            initiator,
            identity,
            keypair,
            chain,
            state: GroupState::Fresh,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn initiator(&self) -> &Identity {
        &self.initiator
    }

    /// The identity this handle operates as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    /// The highest epoch this handle holds a ticket for.
    pub fn current_epoch(&self) -> Option<Epoch> {
        self.chain.max_epoch()
    }

    /// The participant set under the latest held epoch.
    pub fn participants(&self) -> Result<&BTreeSet<Identity>> {
        self.require_usable()?;
        let latest = self.chain.latest().ok_or(GroupError::GroupWasNotFound)?;
        Ok(&latest.participants)
    }

    pub(crate) fn chain(&self) -> &TicketChain {
        &self.chain
    }

    pub(crate) fn chain_mut(&mut self) -> &mut TicketChain {
        &mut self.chain
    }

    pub(crate) fn replace_chain(&mut self, chain: TicketChain) {
        self.chain = chain;
        self.state = GroupState::Fresh;
    }

    pub(crate) fn mark_stale(&mut self) {
        if self.state == GroupState::Fresh {
            self.state = GroupState::Stale;
        }
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = GroupState::Deleted;
    }

    fn require_usable(&self) -> Result<()> {
        match self.state {
            GroupState::Fresh => Ok(()),
            GroupState::Stale => Err(GroupError::GroupIsOutdated),
            GroupState::Deleted => Err(GroupError::GroupWasNotFound),
        }
    }

    /// Encrypt a message under the latest held epoch.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<GroupEnvelope> {
        self.require_usable()?;

        let ticket = self.chain.latest().ok_or(GroupError::GroupWasNotFound)?;
        let envelope = GroupEnvelope::seal(
            plaintext,
            ticket,
            self.identity.clone(),
            now_millis(),
            &self.keypair,
        )?;
        Ok(envelope)
    }

    /// Verify and decrypt an envelope from `sender_card`.
    ///
    /// `as_of` selects the sender's signing key generation: pass the
    /// instant the message was sent to verify historical messages after
    /// the sender rotated keys. Omitting it uses the sender's current
    /// key, so messages signed before a rotation fail verification.
    ///
    /// An envelope at an epoch newer than the held chain marks this
    /// handle stale and fails with [`GroupError::GroupIsOutdated`].
    pub fn decrypt(
        &mut self,
        envelope: &GroupEnvelope,
        sender_card: &Card,
        as_of: Option<i64>,
    ) -> Result<Vec<u8>> {
        self.require_usable()?;

        if envelope.session_id != self.session_id {
            return Err(GroupError::MessageNotFromThisGroup);
        }

        let max = self.chain.max_epoch().ok_or(GroupError::GroupWasNotFound)?;
        if envelope.epoch > max {
            self.mark_stale();
            return Err(GroupError::GroupIsOutdated);
        }

        let ticket = self
            .chain
            .ticket_at(envelope.epoch)
            .ok_or(GroupError::TicketNotFound(envelope.epoch))?;

        let sender_key = match as_of {
            Some(at) => sender_card.signing_key_at(at),
            None => sender_card.signing_key(),
        };

        match envelope.open(ticket, &sender_key) {
            Ok(plaintext) => Ok(plaintext),
            Err(SealError::Core(tessera_core::CoreError::InvalidSignature)) => {
                Err(GroupError::VerificationFailed)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tessera_core::{AgreementPublicKey, Ticket};

    fn make_group(names: &[&str]) -> (Group, Keypair) {
        let session_id = SessionId::derive(b"group-facade-test").unwrap();
        let participants: BTreeSet<Identity> =
            names.iter().map(|n| Identity::from(*n)).collect();
        let root = Ticket::root(session_id, participants, 1000);
        let chain = TicketChain::from_tickets([root]).unwrap();
        let keypair = Keypair::from_seed(&[0x42; 32]);

        let group = Group::new(
            session_id,
            Identity::from("alice"),
            Identity::from("alice"),
            keypair.clone(),
            chain,
        );
        (group, keypair)
    }

    fn card_for(name: &str, keypair: &Keypair) -> Card {
        Card::new(
            Identity::from(name),
            keypair.public_key(),
            AgreementPublicKey([7; 32]),
            500,
        )
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (mut group, keypair) = make_group(&["alice", "bob"]);
        let card = card_for("alice", &keypair);

        let envelope = group.encrypt(b"hello").unwrap();
        let plaintext = group.decrypt(&envelope, &card, None).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_foreign_session_rejected() {
        let (mut group, keypair) = make_group(&["alice", "bob"]);
        let card = card_for("alice", &keypair);

        let other_session = SessionId::derive(b"a-different-session").unwrap();
        let participants: BTreeSet<Identity> =
            [Identity::from("alice"), Identity::from("bob")].into();
        let foreign_ticket = Ticket::root(other_session, participants, 1000);
        let envelope = GroupEnvelope::seal(
            b"hi",
            &foreign_ticket,
            Identity::from("alice"),
            2000,
            &keypair,
        )
        .unwrap();

        let err = group.decrypt(&envelope, &card, None).unwrap_err();
        assert!(matches!(err, GroupError::MessageNotFromThisGroup));
    }

    #[test]
    fn test_newer_epoch_marks_stale() {
        let (mut group, keypair) = make_group(&["alice", "bob"]);
        let card = card_for("alice", &keypair);

        // An envelope from an epoch this handle does not hold yet.
        let latest = group.chain().latest().unwrap().clone();
        let newer = latest.next(latest.participants.clone(), 3000);
        let envelope =
            GroupEnvelope::seal(b"hi", &newer, Identity::from("alice"), 3000, &keypair).unwrap();

        let err = group.decrypt(&envelope, &card, None).unwrap_err();
        assert!(matches!(err, GroupError::GroupIsOutdated));
        assert_eq!(group.state(), GroupState::Stale);

        // The stale handle now refuses encryption too.
        assert!(matches!(
            group.encrypt(b"later").unwrap_err(),
            GroupError::GroupIsOutdated
        ));
    }

    #[test]
    fn test_wrong_sender_key_is_verification_failure() {
        let (mut group, _) = make_group(&["alice", "bob"]);
        let impostor = Keypair::from_seed(&[0x99; 32]);
        let card = card_for("alice", &impostor);

        let envelope = group.encrypt(b"msg").unwrap();
        let err = group.decrypt(&envelope, &card, None).unwrap_err();
        assert!(matches!(err, GroupError::VerificationFailed));
    }

    #[test]
    fn test_dated_key_selection_after_sender_rotation() {
        let (mut group, old_keypair) = make_group(&["alice", "bob"]);
        let envelope = group.encrypt(b"before rotation").unwrap();

        // The sender rotates after the message is sealed.
        let new_keypair = Keypair::from_seed(&[0x43; 32]);
        let card = card_for("alice", &old_keypair).rotated(
            new_keypair.public_key(),
            AgreementPublicKey([8; 32]),
            envelope.timestamp + 1,
        );

        // Undated verification uses the current key and fails.
        let err = group.decrypt(&envelope, &card, None).unwrap_err();
        assert!(matches!(err, GroupError::VerificationFailed));

        // Dating the lookup to the send instant selects the old key.
        let sent_at = envelope.timestamp;
        assert_eq!(
            group.decrypt(&envelope, &card, Some(sent_at)).unwrap(),
            b"before rotation"
        );
    }

    #[test]
    fn test_deleted_handle_refuses_everything() {
        let (mut group, keypair) = make_group(&["alice", "bob"]);
        let card = card_for("alice", &keypair);
        let envelope = group.encrypt(b"msg").unwrap();

        group.mark_deleted();

        assert!(matches!(
            group.encrypt(b"x").unwrap_err(),
            GroupError::GroupWasNotFound
        ));
        assert!(matches!(
            group.decrypt(&envelope, &card, None).unwrap_err(),
            GroupError::GroupWasNotFound
        ));
        assert!(matches!(
            group.participants().unwrap_err(),
            GroupError::GroupWasNotFound
        ));
    }
}
