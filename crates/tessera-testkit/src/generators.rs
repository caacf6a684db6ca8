//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use tessera_core::{Identity, KeyMaterial, Keypair, SessionId, Ticket, TicketChain};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random SessionId.
pub fn session_id() -> impl Strategy<Value = SessionId> {
    any::<[u8; 32]>().prop_map(SessionId::from_bytes)
}

/// Generate a group identifier long enough to derive a session id.
pub fn identifier() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 11..=64)
}

/// Generate an identity string.
pub fn identity() -> impl Strategy<Value = Identity> {
    "[a-z][a-z0-9_]{0,15}".prop_map(Identity::from)
}

/// Generate a set of distinct identities within the given size range.
pub fn participants(min: usize, max: usize) -> impl Strategy<Value = BTreeSet<Identity>> {
    prop::collection::btree_set(identity(), min..=max)
}

/// Generate random key material.
pub fn key_material() -> impl Strategy<Value = KeyMaterial> {
    any::<[u8; 32]>().prop_map(KeyMaterial::from_bytes)
}

/// Generate an epoch.
pub fn epoch() -> impl Strategy<Value = u32> {
    0u32..=10_000
}

/// Generate a reasonable millisecond timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Parameters for generating a ticket chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub session_id: SessionId,
    pub participants: BTreeSet<Identity>,
    pub created_at: i64,
    pub length: usize,
}

impl Arbitrary for ChainParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            session_id(),
            participants(2, 8),
            0i64..=1_700_000_000_000i64,
            1usize..=20,
        )
            .prop_map(|(session_id, participants, created_at, length)| ChainParams {
                session_id,
                participants,
                created_at,
                length,
            })
            .boxed()
    }
}

/// Build a contiguous chain from parameters, epoch 0 through
/// `length - 1`, keeping the participant set fixed.
pub fn chain_from_params(params: &ChainParams) -> TicketChain {
    let mut chain = TicketChain::new();
    let mut ticket = Ticket::root(
        params.session_id,
        params.participants.clone(),
        params.created_at,
    );
    for i in 1..params.length {
        let next = ticket.next(params.participants.clone(), params.created_at + i as i64);
        chain.insert(ticket).expect("contiguous insert");
        ticket = next;
    }
    chain.insert(ticket).expect("contiguous insert");
    chain
}
