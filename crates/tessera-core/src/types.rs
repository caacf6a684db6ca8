//! Strong type definitions shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One version of a group's key material. Epoch 0 is chain creation;
/// every membership change advances the chain by exactly one epoch.
pub type Epoch = u32;

/// An identity string, as registered with the card service.
///
/// Identities are opaque to the core: equality and ordering are byte-wise.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_identity_ordering_is_bytewise() {
        let mut set = BTreeSet::new();
        set.insert(Identity::from("bob"));
        set.insert(Identity::from("alice"));

        let ordered: Vec<_> = set.iter().map(Identity::as_str).collect();
        assert_eq!(ordered, vec!["alice", "bob"]);
    }

    #[test]
    fn test_identity_display() {
        let id = Identity::from("alice");
        assert_eq!(format!("{}", id), "alice");
        assert_eq!(format!("{:?}", id), "Identity(alice)");
    }
}
