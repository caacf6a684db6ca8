//! In-memory implementations of the store traits.
//!
//! Primarily for testing. [`MemoryTicketStore`] has the same semantics
//! a remote relay would, including per-slot read ACLs, and counts calls
//! so tests can assert that an operation made no relay round trips.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use tessera_core::{Epoch, Identity, SessionId};

use crate::error::Result;
use crate::traits::{CachedChain, GroupCache, PushResult, TicketStore};

struct Slot {
    bytes: Vec<u8>,
    readers: BTreeSet<Identity>,
}

/// In-memory ticket relay.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryTicketStore {
    slots: RwLock<HashMap<(SessionId, Epoch), Slot>>,
    push_calls: AtomicU64,
    pull_calls: AtomicU64,
}

impl MemoryTicketStore {
    /// Create a new empty relay.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            push_calls: AtomicU64::new(0),
            pull_calls: AtomicU64::new(0),
        }
    }

    /// Total push calls observed.
    pub fn push_calls(&self) -> u64 {
        self.push_calls.load(Ordering::Relaxed)
    }

    /// Total pull and list calls observed.
    pub fn pull_calls(&self) -> u64 {
        self.pull_calls.load(Ordering::Relaxed)
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn push(
        &self,
        session_id: &SessionId,
        epoch: Epoch,
        readers: &BTreeSet<Identity>,
        bytes: &[u8],
        expect_absent: bool,
    ) -> Result<PushResult> {
        self.push_calls.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.slots.write().unwrap();

        let key = (*session_id, epoch);
        if expect_absent && slots.contains_key(&key) {
            return Ok(PushResult::Conflict);
        }

        slots.insert(
            key,
            Slot {
                bytes: bytes.to_vec(),
                readers: readers.clone(),
            },
        );
        Ok(PushResult::Stored)
    }

    async fn pull(
        &self,
        reader: &Identity,
        session_id: &SessionId,
        epoch: Epoch,
    ) -> Result<Option<Vec<u8>>> {
        self.pull_calls.fetch_add(1, Ordering::Relaxed);
        let slots = self.slots.read().unwrap();

        Ok(slots
            .get(&(*session_id, epoch))
            .filter(|slot| slot.readers.contains(reader))
            .map(|slot| slot.bytes.clone()))
    }

    async fn list_epochs(&self, reader: &Identity, session_id: &SessionId) -> Result<Vec<Epoch>> {
        self.pull_calls.fetch_add(1, Ordering::Relaxed);
        let slots = self.slots.read().unwrap();

        let mut epochs: Vec<Epoch> = slots
            .iter()
            .filter(|((sid, _), slot)| sid == session_id && slot.readers.contains(reader))
            .map(|((_, epoch), _)| *epoch)
            .collect();
        epochs.sort_unstable();
        Ok(epochs)
    }

    async fn revoke(
        &self,
        session_id: &SessionId,
        reader: &Identity,
        epoch: Option<Epoch>,
    ) -> Result<()> {
        let mut slots = self.slots.write().unwrap();
        match epoch {
            Some(epoch) => {
                if let Some(slot) = slots.get_mut(&(*session_id, epoch)) {
                    slot.readers.remove(reader);
                }
            }
            None => {
                for ((sid, _), slot) in slots.iter_mut() {
                    if sid == session_id {
                        slot.readers.remove(reader);
                    }
                }
            }
        }
        Ok(())
    }

    async fn reset(&self, session_id: &SessionId) -> Result<()> {
        let mut slots = self.slots.write().unwrap();
        slots.retain(|(sid, _), _| sid != session_id);
        Ok(())
    }
}

/// In-memory group cache.
pub struct MemoryGroupCache {
    chains: RwLock<HashMap<SessionId, CachedChain>>,
}

impl MemoryGroupCache {
    pub fn new() -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryGroupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupCache for MemoryGroupCache {
    async fn load(&self, session_id: &SessionId) -> Result<Option<CachedChain>> {
        let chains = self.chains.read().unwrap();
        Ok(chains.get(session_id).cloned())
    }

    async fn save(&self, session_id: &SessionId, cached: &CachedChain) -> Result<()> {
        let mut chains = self.chains.write().unwrap();
        chains.insert(*session_id, cached.clone());
        Ok(())
    }

    async fn evict(&self, session_id: &SessionId) -> Result<()> {
        let mut chains = self.chains.write().unwrap();
        chains.remove(session_id);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut chains = self.chains.write().unwrap();
        chains.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{Ticket, TicketChain};

    fn session() -> SessionId {
        SessionId::derive(b"memory-store-test").unwrap()
    }

    fn readers(names: &[&str]) -> BTreeSet<Identity> {
        names.iter().map(|n| Identity::from(*n)).collect()
    }

    #[tokio::test]
    async fn test_push_pull_respects_acl() {
        let store = MemoryTicketStore::new();
        let sid = session();

        store
            .push(&sid, 0, &readers(&["alice", "bob"]), b"sealed", true)
            .await
            .unwrap();

        let alice = Identity::from("alice");
        let mallory = Identity::from("mallory");

        assert_eq!(
            store.pull(&alice, &sid, 0).await.unwrap(),
            Some(b"sealed".to_vec())
        );
        assert_eq!(store.pull(&mallory, &sid, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expect_absent_conflict() {
        let store = MemoryTicketStore::new();
        let sid = session();
        let acl = readers(&["alice", "bob"]);

        let first = store.push(&sid, 0, &acl, b"winner", true).await.unwrap();
        assert_eq!(first, PushResult::Stored);

        let second = store.push(&sid, 0, &acl, b"loser", true).await.unwrap();
        assert_eq!(second, PushResult::Conflict);

        // The first writer's bytes survive.
        let alice = Identity::from("alice");
        assert_eq!(
            store.pull(&alice, &sid, 0).await.unwrap(),
            Some(b"winner".to_vec())
        );
    }

    #[tokio::test]
    async fn test_overwrite_without_expect_absent() {
        let store = MemoryTicketStore::new();
        let sid = session();
        let acl = readers(&["alice"]);

        store.push(&sid, 1, &acl, b"old", true).await.unwrap();
        let result = store.push(&sid, 1, &acl, b"new", false).await.unwrap();
        assert_eq!(result, PushResult::Stored);

        let alice = Identity::from("alice");
        assert_eq!(
            store.pull(&alice, &sid, 1).await.unwrap(),
            Some(b"new".to_vec())
        );
    }

    #[tokio::test]
    async fn test_revoke_all_epochs() {
        let store = MemoryTicketStore::new();
        let sid = session();
        let acl = readers(&["alice", "bob"]);

        store.push(&sid, 0, &acl, b"t0", true).await.unwrap();
        store.push(&sid, 1, &acl, b"t1", true).await.unwrap();

        let bob = Identity::from("bob");
        store.revoke(&sid, &bob, None).await.unwrap();

        assert!(store.list_epochs(&bob, &sid).await.unwrap().is_empty());
        let alice = Identity::from("alice");
        assert_eq!(store.list_epochs(&alice, &sid).await.unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_repush_replaces_readers() {
        let store = MemoryTicketStore::new();
        let sid = session();

        store
            .push(&sid, 0, &readers(&["alice"]), b"t0", true)
            .await
            .unwrap();

        let carol = Identity::from("carol");
        assert!(store.pull(&carol, &sid, 0).await.unwrap().is_none());

        // Re-sealing a slot carries a fresh ACL with it.
        store
            .push(&sid, 0, &readers(&["alice", "carol"]), b"t0", false)
            .await
            .unwrap();
        assert!(store.pull(&carol, &sid, 0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reset_clears_session_only() {
        let store = MemoryTicketStore::new();
        let sid = session();
        let other = SessionId::derive(b"another-session-id").unwrap();
        let acl = readers(&["alice"]);

        store.push(&sid, 0, &acl, b"a", true).await.unwrap();
        store.push(&other, 0, &acl, b"b", true).await.unwrap();

        store.reset(&sid).await.unwrap();

        let alice = Identity::from("alice");
        assert!(store.pull(&alice, &sid, 0).await.unwrap().is_none());
        assert!(store.pull(&alice, &other, 0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_group_cache_roundtrip() {
        let cache = MemoryGroupCache::new();
        let sid = session();

        let ticket = Ticket::root(sid, readers(&["alice", "bob"]), 1000);
        let cached = CachedChain {
            initiator: Identity::from("alice"),
            chain: TicketChain::from_tickets([ticket]).unwrap(),
        };

        cache.save(&sid, &cached).await.unwrap();
        assert_eq!(cache.load(&sid).await.unwrap(), Some(cached));

        cache.evict(&sid).await.unwrap();
        assert_eq!(cache.load(&sid).await.unwrap(), None);
    }
}
