//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic participants
//! with cards, wired to one shared in-memory relay and a static card
//! resolver.

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera::{GroupConfig, GroupSession, StaticCardResolver};
use tessera_core::{Card, Identity, Keypair};
use tessera_seal::X25519StaticSecret;
use tessera_store::{MemoryGroupCache, MemoryTicketStore};

/// One test participant: identity, current keys, and card.
///
/// Key seeds are kept so sessions can be constructed repeatedly (one
/// per simulated device).
pub struct Participant {
    pub identity: Identity,
    signing_seed: [u8; 32],
    agreement_seed: [u8; 32],
    pub card: Card,
}

impl Participant {
    fn new(name: &str, index: u8, created_at: i64) -> Self {
        let mut signing_seed = [0x10u8; 32];
        signing_seed[0] = index;
        let mut agreement_seed = [0x20u8; 32];
        agreement_seed[0] = index;

        let keypair = Keypair::from_seed(&signing_seed);
        let secret = X25519StaticSecret::from_bytes(agreement_seed);
        let card = Card::new(
            Identity::from(name),
            keypair.public_key(),
            secret.public_key().into(),
            created_at,
        );

        Self {
            identity: Identity::from(name),
            signing_seed,
            agreement_seed,
            card,
        }
    }

    pub fn keypair(&self) -> Keypair {
        Keypair::from_seed(&self.signing_seed)
    }

    pub fn agreement_secret(&self) -> X25519StaticSecret {
        X25519StaticSecret::from_bytes(self.agreement_seed)
    }

    /// Rotate to fresh keys at the given instant, pushing the old
    /// generation into card history.
    fn rotate(&mut self, at: i64) {
        self.signing_seed[1] = self.signing_seed[1].wrapping_add(1);
        self.agreement_seed[1] = self.agreement_seed[1].wrapping_add(1);

        let keypair = Keypair::from_seed(&self.signing_seed);
        let secret = X25519StaticSecret::from_bytes(self.agreement_seed);
        self.card = self
            .card
            .rotated(keypair.public_key(), secret.public_key().into(), at);
    }
}

/// A set of participants wired to one shared relay and resolver.
pub struct Harness {
    pub store: Arc<MemoryTicketStore>,
    pub resolver: Arc<StaticCardResolver>,
    participants: Vec<Participant>,
}

/// The concrete session type every harness participant uses.
pub type TestSession = GroupSession<MemoryTicketStore, MemoryGroupCache, StaticCardResolver>;

impl Harness {
    /// Create a harness with one participant per name, deterministic
    /// keys, and every card pre-registered with the resolver.
    pub fn new(names: &[&str]) -> Self {
        let store = Arc::new(MemoryTicketStore::new());
        let resolver = Arc::new(StaticCardResolver::new());

        let participants: Vec<Participant> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Participant::new(name, i as u8 + 1, 1000))
            .collect();

        for p in &participants {
            resolver.put(p.card.clone());
        }

        Self {
            store,
            resolver,
            participants,
        }
    }

    pub fn participant(&self, name: &str) -> &Participant {
        self.participants
            .iter()
            .find(|p| p.identity.as_str() == name)
            .unwrap_or_else(|| panic!("no such participant: {}", name))
    }

    /// Identities for the given names.
    pub fn identities(&self, names: &[&str]) -> BTreeSet<Identity> {
        names.iter().map(|n| Identity::from(*n)).collect()
    }

    /// A new session (fresh device, empty local cache) for a
    /// participant.
    pub fn session(&self, name: &str) -> TestSession {
        self.session_with_config(name, GroupConfig::default())
    }

    /// A new session with a custom configuration.
    pub fn session_with_config(&self, name: &str, config: GroupConfig) -> TestSession {
        let p = self.participant(name);
        GroupSession::new(
            p.card.clone(),
            p.keypair(),
            p.agreement_secret(),
            Arc::clone(&self.store),
            Arc::new(MemoryGroupCache::new()),
            Arc::clone(&self.resolver),
            config,
        )
    }

    /// Rotate a participant's keys at `at` and publish the new card.
    ///
    /// Existing sessions for that participant keep the old secrets;
    /// create a new session to act with the rotated keys.
    pub fn rotate(&mut self, name: &str, at: i64) {
        let p = self
            .participants
            .iter_mut()
            .find(|p| p.identity.as_str() == name)
            .unwrap_or_else(|| panic!("no such participant: {}", name));
        p.rotate(at);
        self.resolver.put(p.card.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participants_have_distinct_keys() {
        let harness = Harness::new(&["alice", "bob", "carol"]);

        let keys: Vec<_> = ["alice", "bob", "carol"]
            .iter()
            .map(|n| harness.participant(n).keypair().public_key())
            .collect();
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert_ne!(keys[0], keys[2]);
    }

    #[test]
    fn test_rotation_updates_card_history() {
        let mut harness = Harness::new(&["alice"]);
        let before = harness.participant("alice").card.signing_key();

        harness.rotate("alice", 5000);

        let card = &harness.participant("alice").card;
        assert_ne!(card.signing_key(), before);
        assert_eq!(card.signing_key_at(2000), before);
        assert_eq!(card.history().len(), 2);
    }

    #[tokio::test]
    async fn test_session_wiring() {
        let harness = Harness::new(&["alice", "bob"]);
        let alice = harness.session("alice");

        let group = alice
            .create_group(b"fixture-smoke-test", harness.identities(&["bob"]))
            .await
            .unwrap();
        assert_eq!(group.current_epoch(), Some(0));
    }
}
