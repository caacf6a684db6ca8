//! Tickets and ticket chains.
//!
//! A [`Ticket`] carries the symmetric key material for one epoch of a
//! session together with the participant set that was authoritative
//! when the epoch was minted. Tickets are immutable once created; any
//! membership change mints a successor ticket at the next epoch.
//!
//! A [`TicketChain`] is the epoch-indexed collection of tickets one
//! party holds for a session. A joiner admitted at epoch N holds
//! N..=latest; only founding participants hold epoch 0.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CoreError;
use crate::session::SessionId;
use crate::types::{Epoch, Identity};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// 256 bits of symmetric key material for one epoch.
///
/// Freshly random per epoch; never derived from a predecessor, so
/// holding epoch N reveals nothing about any other epoch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial(pub [u8; 32]);

impl KeyMaterial {
    /// Generate fresh random key material.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key bytes.
        f.write_str("KeyMaterial(..)")
    }
}

/// One epoch of a session: key material plus the membership valid
/// under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub session_id: SessionId,
    pub epoch: Epoch,
    pub key: KeyMaterial,
    pub participants: BTreeSet<Identity>,
    /// Millisecond timestamp at which the epoch was minted.
    pub created_at: i64,
}

impl Ticket {
    /// Mint the founding ticket for a session at epoch 0.
    pub fn root(session_id: SessionId, participants: BTreeSet<Identity>, created_at: i64) -> Self {
        Self {
            session_id,
            epoch: 0,
            key: KeyMaterial::generate(),
            participants,
            created_at,
        }
    }

    /// Mint the successor ticket: next epoch, fresh key material, and
    /// the given membership.
    pub fn next(&self, participants: BTreeSet<Identity>, created_at: i64) -> Self {
        Self {
            session_id: self.session_id,
            epoch: self.epoch + 1,
            key: KeyMaterial::generate(),
            participants,
            created_at,
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.participants.contains(identity)
    }
}

/// The epoch-indexed sequence of tickets one party holds for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketChain {
    tickets: BTreeMap<Epoch, Ticket>,
}

impl TicketChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from a collection of tickets.
    ///
    /// All tickets must share a session id, epochs must be distinct,
    /// and the held range must be contiguous.
    pub fn from_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Result<Self, CoreError> {
        let mut chain = Self::new();
        for ticket in tickets {
            chain.insert(ticket)?;
        }
        chain.validate_contiguous()?;
        Ok(chain)
    }

    /// Insert a ticket into the chain.
    ///
    /// Rejects a ticket from a different session or one whose epoch is
    /// already held. Contiguity is checked by [`validate_contiguous`],
    /// not here, so tickets can arrive in any order.
    ///
    /// [`validate_contiguous`]: TicketChain::validate_contiguous
    pub fn insert(&mut self, ticket: Ticket) -> Result<(), CoreError> {
        if let Some(existing) = self.tickets.values().next() {
            if existing.session_id != ticket.session_id {
                return Err(CoreError::SessionMismatch);
            }
        }
        if self.tickets.contains_key(&ticket.epoch) {
            return Err(CoreError::DuplicateEpoch(ticket.epoch));
        }
        self.tickets.insert(ticket.epoch, ticket);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// The ticket for the highest held epoch.
    pub fn latest(&self) -> Option<&Ticket> {
        self.tickets.values().next_back()
    }

    /// The ticket for a specific epoch, if held.
    pub fn ticket_at(&self, epoch: Epoch) -> Option<&Ticket> {
        self.tickets.get(&epoch)
    }

    pub fn min_epoch(&self) -> Option<Epoch> {
        self.tickets.keys().next().copied()
    }

    pub fn max_epoch(&self) -> Option<Epoch> {
        self.tickets.keys().next_back().copied()
    }

    /// Iterate tickets in ascending epoch order.
    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    /// Epochs held, ascending.
    pub fn epochs(&self) -> impl Iterator<Item = Epoch> + '_ {
        self.tickets.keys().copied()
    }

    /// Drop every ticket below `epoch`, keeping `epoch` and above.
    pub fn truncate_below(&mut self, epoch: Epoch) {
        self.tickets = self.tickets.split_off(&epoch);
    }

    /// Check that the held epochs form a contiguous range.
    ///
    /// The chain need not start at 0: a joiner admitted at epoch N
    /// legitimately holds N..=latest. Gaps inside the held range mean
    /// lost tickets and make decryption of those epochs impossible.
    pub fn validate_contiguous(&self) -> Result<(), CoreError> {
        let (min, max) = match (self.min_epoch(), self.max_epoch()) {
            (Some(min), Some(max)) => (min, max),
            _ => return Ok(()),
        };

        let missing: Vec<Epoch> = (min..=max)
            .filter(|e| !self.tickets.contains_key(e))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::EpochGap { missing })
        }
    }
}

impl<'a> IntoIterator for &'a TicketChain {
    type Item = &'a Ticket;
    type IntoIter = std::collections::btree_map::Values<'a, Epoch, Ticket>;

    fn into_iter(self) -> Self::IntoIter {
        self.tickets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participants(names: &[&str]) -> BTreeSet<Identity> {
        names.iter().map(|n| Identity::from(*n)).collect()
    }

    fn session() -> SessionId {
        SessionId::derive(b"ticket-test-session").unwrap()
    }

    #[test]
    fn test_root_ticket_is_epoch_zero() {
        let ticket = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        assert_eq!(ticket.epoch, 0);
        assert!(ticket.contains(&Identity::from("alice")));
        assert!(!ticket.contains(&Identity::from("carol")));
    }

    #[test]
    fn test_next_advances_epoch_with_fresh_key() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let next = root.next(participants(&["alice", "bob", "carol"]), 2000);

        assert_eq!(next.epoch, 1);
        assert_eq!(next.session_id, root.session_id);
        assert_ne!(next.key, root.key);
        assert!(next.contains(&Identity::from("carol")));
    }

    #[test]
    fn test_chain_insert_and_latest() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let t1 = root.next(participants(&["alice", "bob", "carol"]), 2000);

        let mut chain = TicketChain::new();
        chain.insert(root).unwrap();
        chain.insert(t1.clone()).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest(), Some(&t1));
        assert_eq!(chain.max_epoch(), Some(1));
        assert_eq!(chain.min_epoch(), Some(0));
    }

    #[test]
    fn test_chain_rejects_duplicate_epoch() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let mut chain = TicketChain::new();
        chain.insert(root.clone()).unwrap();

        let err = chain.insert(root).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEpoch(0)));
    }

    #[test]
    fn test_chain_rejects_foreign_session() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let other = Ticket::root(
            SessionId::derive(b"some-other-session").unwrap(),
            participants(&["alice", "bob"]),
            1000,
        );

        let mut chain = TicketChain::new();
        chain.insert(root).unwrap();
        assert!(matches!(
            chain.insert(other),
            Err(CoreError::SessionMismatch)
        ));
    }

    #[test]
    fn test_chain_detects_gap() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let t1 = root.next(participants(&["alice", "bob"]), 2000);
        let t2 = t1.next(participants(&["alice", "bob"]), 3000);

        let mut chain = TicketChain::new();
        chain.insert(root).unwrap();
        chain.insert(t2).unwrap();

        let err = chain.validate_contiguous().unwrap_err();
        assert!(matches!(err, CoreError::EpochGap { missing } if missing == vec![1]));
    }

    #[test]
    fn test_joiner_chain_need_not_start_at_zero() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let t1 = root.next(participants(&["alice", "bob", "carol"]), 2000);
        let t2 = t1.next(participants(&["alice", "bob", "carol"]), 3000);

        // Carol joined at epoch 1 and holds 1..=2.
        let chain = TicketChain::from_tickets([t1, t2]).unwrap();
        assert_eq!(chain.min_epoch(), Some(1));
        assert_eq!(chain.max_epoch(), Some(2));
        chain.validate_contiguous().unwrap();
    }

    #[test]
    fn test_truncate_below() {
        let root = Ticket::root(session(), participants(&["alice", "bob"]), 1000);
        let t1 = root.next(participants(&["alice", "bob"]), 2000);
        let t2 = t1.next(participants(&["alice", "bob"]), 3000);

        let mut chain = TicketChain::from_tickets([root, t1, t2]).unwrap();
        chain.truncate_below(1);

        assert_eq!(chain.min_epoch(), Some(1));
        assert_eq!(chain.max_epoch(), Some(2));
        assert!(chain.ticket_at(0).is_none());
    }

    #[test]
    fn test_empty_chain_is_contiguous() {
        let chain = TicketChain::new();
        chain.validate_contiguous().unwrap();
        assert!(chain.latest().is_none());
    }
}
