//! End-to-end group lifecycle: create, load, converge, delete.

use tessera::{derive_session_id, GroupError, GroupState};
use tessera_core::Identity;
use tessera_store::TicketStore;
use tessera_testkit::Harness;

const ROOM: &[u8] = b"lifecycle-test-room";

#[tokio::test]
async fn test_create_load_and_message_roundtrip() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");
    let bob = harness.session("bob");

    let alice_group = alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    assert_eq!(alice_group.current_epoch(), Some(0));
    assert_eq!(alice_group.state(), GroupState::Fresh);

    let envelope = alice_group.encrypt(b"hello bob").unwrap();

    let mut bob_group = bob
        .load_group(ROOM, &Identity::from("alice"))
        .await
        .unwrap();
    let plaintext = bob_group
        .decrypt(&envelope, &harness.participant("alice").card, None)
        .unwrap();
    assert_eq!(plaintext, b"hello bob");

    // Replies go the other way with the same ticket.
    let reply = bob_group.encrypt(b"hi alice").unwrap();
    let mut alice_group = alice_group;
    let plaintext = alice_group
        .decrypt(&reply, &harness.participant("bob").card, None)
        .unwrap();
    assert_eq!(plaintext, b"hi alice");
}

#[tokio::test]
async fn test_create_race_reports_existing_group() {
    let harness = Harness::new(&["alice", "bob", "eve"]);
    let alice = harness.session("alice");
    let bob = harness.session("bob");
    let eve = harness.session("eve");

    alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();

    // A participant losing the race can read the winner's ticket.
    let err = bob
        .create_group(ROOM, harness.identities(&["alice"]))
        .await
        .unwrap_err();
    assert!(matches!(err, GroupError::GroupAlreadyExists));

    // An outsider cannot read the slot, but the outcome is the same.
    let err = eve
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap_err();
    assert!(matches!(err, GroupError::GroupAlreadyExists));
}

#[tokio::test]
async fn test_retrieve_prefers_local_cache() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");

    alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();

    let pulls_before = harness.store.pull_calls();
    let group = alice.group(ROOM, &Identity::from("alice")).await.unwrap();
    assert_eq!(group.current_epoch(), Some(0));
    assert_eq!(harness.store.pull_calls(), pulls_before);
}

#[tokio::test]
async fn test_forget_group_forces_relay_reload() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");

    alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    alice.forget_group(ROOM).await.unwrap();

    let pulls_before = harness.store.pull_calls();
    let group = alice.group(ROOM, &Identity::from("alice")).await.unwrap();
    assert_eq!(group.current_epoch(), Some(0));
    assert!(harness.store.pull_calls() > pulls_before);
}

#[tokio::test]
async fn test_update_keeps_held_epochs_after_cache_eviction() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");

    let mut group = alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();

    // Evicting the cache under a live handle must not cost it epochs:
    // an update merges into the handle's own chain, not the cache copy.
    alice.forget_group(ROOM).await.unwrap();
    alice.manager().update(&mut group).await.unwrap();
    assert_eq!(group.current_epoch(), Some(0));
    assert_eq!(group.state(), GroupState::Fresh);

    let envelope = group.encrypt(b"still here").unwrap();
    let plaintext = group
        .decrypt(&envelope, &harness.participant("alice").card, None)
        .unwrap();
    assert_eq!(plaintext, b"still here");
}

#[tokio::test]
async fn test_update_is_a_no_op_when_current() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");

    let mut group = alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    alice.manager().update(&mut group).await.unwrap();
    assert_eq!(group.current_epoch(), Some(0));
    assert_eq!(group.state(), GroupState::Fresh);
}

#[tokio::test]
async fn test_delete_converges_other_participants() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");
    let bob = harness.session("bob");

    let mut alice_group = alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    let mut bob_group = bob
        .load_group(ROOM, &Identity::from("alice"))
        .await
        .unwrap();

    alice.delete_group(&mut alice_group).await.unwrap();
    assert_eq!(alice_group.state(), GroupState::Deleted);

    let err = bob.manager().update(&mut bob_group).await.unwrap_err();
    assert!(matches!(err, GroupError::GroupWasNotFound));
    assert_eq!(bob_group.state(), GroupState::Deleted);

    // A deleted handle stays dead without further relay traffic.
    let err = bob.manager().update(&mut bob_group).await.unwrap_err();
    assert!(matches!(err, GroupError::GroupWasNotFound));
}

#[tokio::test]
async fn test_identifier_is_free_for_reuse_after_delete() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");

    let mut group = alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    alice.delete_group(&mut group).await.unwrap();

    let recreated = alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    assert_eq!(recreated.current_epoch(), Some(0));
}

#[tokio::test]
async fn test_non_initiator_cannot_delete() {
    let harness = Harness::new(&["alice", "bob"]);
    let alice = harness.session("alice");
    let bob = harness.session("bob");

    alice
        .create_group(ROOM, harness.identities(&["bob"]))
        .await
        .unwrap();
    let mut bob_group = bob
        .load_group(ROOM, &Identity::from("alice"))
        .await
        .unwrap();

    let err = bob.delete_group(&mut bob_group).await.unwrap_err();
    assert!(matches!(err, GroupError::PermissionDenied));

    // The session is untouched on the relay.
    let session_id = derive_session_id(ROOM).unwrap();
    let visible = harness
        .store
        .list_epochs(&Identity::from("alice"), &session_id)
        .await
        .unwrap();
    assert_eq!(visible, vec![0]);
}
