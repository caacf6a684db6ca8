//! Card resolution.
//!
//! Sealing a ticket needs each participant's current agreement key, and
//! verifying a message needs the sender's signing key history. Both
//! come from cards served by a [`CardResolver`]. Production resolvers
//! query a card service; tests use a static in-memory one.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tessera_core::{AgreementPublicKey, Card, Identity};

use crate::error::{GroupError, Result};

/// Resolves identities to their cards.
#[async_trait]
pub trait CardResolver: Send + Sync {
    /// Resolve the current card for an identity.
    async fn resolve(&self, identity: &Identity) -> Result<Card>;
}

/// Resolve the current agreement key for every listed identity.
pub(crate) async fn resolve_agreement_keys<R: CardResolver + ?Sized>(
    resolver: &R,
    identities: impl IntoIterator<Item = &Identity>,
) -> Result<BTreeMap<Identity, AgreementPublicKey>> {
    let mut keys = BTreeMap::new();
    for identity in identities {
        let card = resolver.resolve(identity).await?;
        keys.insert(identity.clone(), card.agreement_key());
    }
    Ok(keys)
}

/// A fixed set of cards, resolved from memory.
///
/// Cards can be replaced to model key rotation.
pub struct StaticCardResolver {
    cards: RwLock<HashMap<Identity, Card>>,
}

impl StaticCardResolver {
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace the card for an identity.
    pub fn put(&self, card: Card) {
        let mut cards = self.cards.write().unwrap();
        cards.insert(card.identity().clone(), card);
    }
}

impl Default for StaticCardResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardResolver for StaticCardResolver {
    async fn resolve(&self, identity: &Identity) -> Result<Card> {
        let cards = self.cards.read().unwrap();
        cards
            .get(identity)
            .cloned()
            .ok_or_else(|| GroupError::CardNotFound(identity.to_string()))
    }
}
