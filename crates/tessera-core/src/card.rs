//! Identity cards.
//!
//! A [`Card`] binds an identity to its current public keys plus the
//! dated history of keys it held before rotation. Dated lookup lets a
//! verifier check a signature made at some past instant against the key
//! that was current then, instead of failing on every rotation.

use serde::{Deserialize, Serialize};

use crate::crypto::{AgreementPublicKey, Ed25519PublicKey};
use crate::types::Identity;

/// One generation of an identity's keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    pub signing_key: Ed25519PublicKey,
    pub agreement_key: AgreementPublicKey,
    /// Millisecond timestamp at which this generation became current.
    pub created_at: i64,
}

/// An identity's public keys with rotation history.
///
/// `history` is kept sorted oldest-first by `created_at`; the last
/// entry is the current generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    identity: Identity,
    history: Vec<CardEntry>,
}

impl Card {
    /// Create a card with a single (current) key generation.
    pub fn new(
        identity: Identity,
        signing_key: Ed25519PublicKey,
        agreement_key: AgreementPublicKey,
        created_at: i64,
    ) -> Self {
        Self {
            identity,
            history: vec![CardEntry {
                signing_key,
                agreement_key,
                created_at,
            }],
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The current key generation.
    pub fn current(&self) -> &CardEntry {
        // Invariant: history is never empty.
        self.history.last().expect("card history is never empty")
    }

    pub fn signing_key(&self) -> Ed25519PublicKey {
        self.current().signing_key
    }

    pub fn agreement_key(&self) -> AgreementPublicKey {
        self.current().agreement_key
    }

    pub fn history(&self) -> &[CardEntry] {
        &self.history
    }

    /// Produce a new card with rotated keys, pushing the previous
    /// generation into history.
    pub fn rotated(
        &self,
        signing_key: Ed25519PublicKey,
        agreement_key: AgreementPublicKey,
        created_at: i64,
    ) -> Self {
        let mut history = self.history.clone();
        history.push(CardEntry {
            signing_key,
            agreement_key,
            created_at,
        });
        history.sort_by_key(|e| e.created_at);
        Self {
            identity: self.identity.clone(),
            history,
        }
    }

    /// Select the key generation that was current at instant `at`.
    ///
    /// Walks the history newest-first and returns the first generation
    /// created at or before `at`. When every generation postdates `at`
    /// (clock skew between parties), falls back to the oldest one.
    pub fn entry_at(&self, at: i64) -> &CardEntry {
        for entry in self.history.iter().rev() {
            if entry.created_at <= at {
                return entry;
            }
        }
        // All generations are newer than the requested instant.
        &self.history[0]
    }

    /// The signing key that was current at instant `at`.
    pub fn signing_key_at(&self, at: i64) -> Ed25519PublicKey {
        self.entry_at(at).signing_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn entry_keys(seed: u8) -> (Ed25519PublicKey, AgreementPublicKey) {
        let kp = Keypair::from_seed(&[seed; 32]);
        (kp.public_key(), AgreementPublicKey([seed; 32]))
    }

    fn card_with_rotations() -> Card {
        let (sign0, agree0) = entry_keys(1);
        let (sign1, agree1) = entry_keys(2);
        let (sign2, agree2) = entry_keys(3);

        Card::new(Identity::from("alice"), sign0, agree0, 1000)
            .rotated(sign1, agree1, 2000)
            .rotated(sign2, agree2, 3000)
    }

    #[test]
    fn test_current_is_latest_generation() {
        let card = card_with_rotations();
        let (sign2, _) = entry_keys(3);
        assert_eq!(card.signing_key(), sign2);
        assert_eq!(card.history().len(), 3);
    }

    #[test]
    fn test_entry_at_selects_dated_generation() {
        let card = card_with_rotations();
        let (sign0, _) = entry_keys(1);
        let (sign1, _) = entry_keys(2);
        let (sign2, _) = entry_keys(3);

        // Exactly at a rotation boundary picks that generation.
        assert_eq!(card.signing_key_at(2000), sign1);
        // Between rotations picks the one current then.
        assert_eq!(card.signing_key_at(2500), sign1);
        assert_eq!(card.signing_key_at(1500), sign0);
        // After the last rotation picks the newest.
        assert_eq!(card.signing_key_at(9999), sign2);
    }

    #[test]
    fn test_entry_at_before_all_falls_back_to_oldest() {
        let card = card_with_rotations();
        let (sign0, _) = entry_keys(1);
        assert_eq!(card.signing_key_at(500), sign0);
    }

    #[test]
    fn test_rotated_preserves_identity() {
        let card = card_with_rotations();
        assert_eq!(card.identity().as_str(), "alice");
    }
}
