mod common;

use common::{harness, user};
use veea_lib::error::{Error, InputError};

#[tokio::test]
async fn profile_update_keeps_or_changes_the_username() {
    let h = harness();
    let alice = user(&h.state, "alice").await;

    let same = h
        .state
        .accounts
        .update_profile(alice, "alice", "Alice Liddell")
        .await
        .unwrap();
    assert_eq!(same.username, "alice");
    assert_eq!(same.full_name, "Alice Liddell");

    let renamed = h
        .state
        .accounts
        .update_profile(alice, "ally", "Alice Liddell")
        .await
        .unwrap();
    assert_eq!(renamed.username, "ally");
    let stored = h.state.db.get_user(alice).await.unwrap().unwrap();
    assert_eq!(stored.username, "ally");
    assert!(h.state.db.get_credentials("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn profile_update_is_validated() {
    let h = harness();
    let alice = user(&h.state, "alice").await;
    user(&h.state, "bob").await;

    let err = h
        .state
        .accounts
        .update_profile(alice, "bob", "Alice")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::DuplicateUsername(ref name)) if name == "bob"));

    let err = h
        .state
        .accounts
        .update_profile(alice, "ADMIN", "Alice")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::ReservedName(_))));

    let err = h
        .state
        .accounts
        .update_profile(alice, "alice", &"x".repeat(81))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Input(InputError::FieldTooLong { field: "full name", max: 80 })
    ));

    let err = h
        .state
        .accounts
        .update_profile(404, "nobody", "Nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::UnknownUser(404))));

    let unchanged = h.state.db.get_user(alice).await.unwrap().unwrap();
    assert_eq!(unchanged.username, "alice");
    assert_eq!(unchanged.full_name, "Test User");
}

#[tokio::test]
async fn password_hash_update_replaces_the_stored_hash() {
    let h = harness();
    let alice = user(&h.state, "alice").await;

    h.state
        .accounts
        .update_password_hash(alice, "new-hash")
        .await
        .unwrap();
    let credentials = h.state.db.get_credentials("alice").await.unwrap().unwrap();
    assert_eq!(credentials.password_hash, "new-hash");

    let err = h
        .state
        .accounts
        .update_password_hash(404, "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::UnknownUser(404))));
}

#[tokio::test]
async fn admin_account_is_created_once() {
    let h = harness();

    let created = h
        .state
        .accounts
        .ensure_admin("admin", "Administrator", "root")
        .await
        .unwrap()
        .unwrap();
    assert!(created.is_admin);
    assert_eq!(created.username, "admin");

    let again = h
        .state
        .accounts
        .ensure_admin("root", "Another Admin", "root")
        .await
        .unwrap();
    assert!(again.is_none());
    assert!(h.state.db.get_credentials("root").await.unwrap().is_none());

    let admin = h.state.db.get_credentials("admin").await.unwrap().unwrap();
    assert!(admin.is_admin);
}

#[tokio::test]
async fn admin_bootstrap_respects_field_rules_and_taken_names() {
    let h = harness();
    user(&h.state, "boss").await;

    let err = h
        .state
        .accounts
        .ensure_admin("boss", "Boss", "root")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::DuplicateUsername(_))));

    let err = h
        .state
        .accounts
        .ensure_admin("administrator", "Admin", "root")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::FieldTooLong { field: "username", .. })));
}
