//! # Tessera Testkit
//!
//! Testing utilities for Tessera.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic participants wired to a shared
//!   in-memory relay, for multi-party integration tests
//! - **Generators**: proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use tessera_testkit::Harness;
//!
//! # async fn example() {
//! let harness = Harness::new(&["alice", "bob", "carol"]);
//! let alice = harness.session("alice");
//! let group = alice
//!     .create_group(b"team-standup-room", harness.identities(&["bob", "carol"]))
//!     .await
//!     .unwrap();
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tessera_testkit::generators::{chain_from_params, ChainParams};
//!
//! proptest! {
//!     #[test]
//!     fn chain_stays_contiguous(params: ChainParams) {
//!         let chain = chain_from_params(&params);
//!         prop_assert!(chain.validate_contiguous().is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{Harness, Participant, TestSession};
pub use generators::{chain_from_params, ChainParams};
