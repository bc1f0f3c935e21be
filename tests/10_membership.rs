mod common;

use anyhow::Result;
use serde_json::json;

use clubhub_api::auth::OfficerPermission;
use clubhub_api::firestore::FirestoreValue;
use common::*;

const SCHOOL: &str = "s1";
const CLUB: &str = "c1";

const SIGNUP_PRIVATE: i64 = 0;
const SIGNUP_OPEN: i64 = 1;

fn club_path() -> String {
    format!("schools/{}/clubs/{}", SCHOOL, CLUB)
}

fn club_private_path() -> String {
    format!("schools/{}/clubs_private/{}", SCHOOL, CLUB)
}

#[tokio::test]
async fn self_join_open_club_updates_claims_and_documents() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_OPEN, &[], &[]).await;
    let record = user_record("u1", "a@x.edu", member_claims(SCHOOL, &[]));
    env.identity.add_user(record.clone()).await;

    env.membership()
        .add_member(&auth_user(&record), CLUB, None)
        .await?;

    let claims = env.identity.claims_of("u1").await;
    assert!(claims.is_member_of(CLUB));

    let members = env.firestore.field(&club_private_path(), "members").await.unwrap();
    assert!(members.contains_str("a@x.edu"));
    assert_eq!(
        env.firestore.field(&club_path(), "numMembers").await,
        Some(FirestoreValue::Integer(1))
    );
    Ok(())
}

#[tokio::test]
async fn self_join_closed_club_is_forbidden() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_PRIVATE, &[], &[]).await;
    let record = user_record("u1", "a@x.edu", member_claims(SCHOOL, &[]));
    env.identity.add_user(record.clone()).await;

    let err = env
        .membership()
        .add_member(&auth_user(&record), CLUB, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    // no writes happened
    assert!(!env.identity.claims_of("u1").await.is_member_of(CLUB));
    let members = env.firestore.field(&club_private_path(), "members").await.unwrap();
    assert_eq!(members, FirestoreValue::Array(Vec::new()));
    Ok(())
}

#[tokio::test]
async fn adding_twice_conflicts_and_increments_once() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_OPEN, &[], &[]).await;
    let record = user_record("u1", "a@x.edu", member_claims(SCHOOL, &[]));
    env.identity.add_user(record.clone()).await;

    env.membership()
        .add_member(&auth_user(&record), CLUB, None)
        .await?;

    // second submission with fresh claims must be a visible conflict
    let retry = fresh_auth(&env.identity, &record).await;
    let err = env
        .membership()
        .add_member(&retry, CLUB, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    assert_eq!(
        env.firestore.field(&club_path(), "numMembers").await,
        Some(FirestoreValue::Integer(1))
    );
    let members = env.firestore.field(&club_private_path(), "members").await.unwrap();
    assert_eq!(members.as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn officer_add_requires_members_bit() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_PRIVATE, &[], &[]).await;
    let officer = user_record(
        "u1",
        "officer@x.edu",
        officer_claims(SCHOOL, CLUB, OfficerPermission::MESSAGES),
    );
    let target = user_record("u2", "b@x.edu", member_claims(SCHOOL, &[]));
    env.identity.add_user(officer.clone()).await;
    env.identity.add_user(target).await;

    let err = env
        .membership()
        .add_member(&auth_user(&officer), CLUB, Some("b@x.edu"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
    assert!(!env.identity.claims_of("u2").await.is_member_of(CLUB));
    Ok(())
}

#[tokio::test]
async fn officer_adds_member_bypassing_signup_gate() -> Result<()> {
    let env = TestEnv::new();
    // signup is closed; the officer path does not consult it
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_PRIVATE, &[], &[]).await;
    let officer = user_record(
        "u1",
        "officer@x.edu",
        officer_claims(SCHOOL, CLUB, OfficerPermission::MEMBERS),
    );
    let target = user_record("u2", "b@x.edu", member_claims(SCHOOL, &[]));
    env.identity.add_user(officer.clone()).await;
    env.identity.add_user(target).await;

    env.membership()
        .add_member(&auth_user(&officer), CLUB, Some("b@x.edu"))
        .await?;

    assert!(env.identity.claims_of("u2").await.is_member_of(CLUB));
    let members = env.firestore.field(&club_private_path(), "members").await.unwrap();
    assert!(members.contains_str("b@x.edu"));
    Ok(())
}

#[tokio::test]
async fn cross_school_target_reads_as_nonexistent() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_OPEN, &[], &[]).await;
    let officer = user_record(
        "u1",
        "officer@x.edu",
        officer_claims(SCHOOL, CLUB, OfficerPermission::MEMBERS),
    );
    let outsider = user_record("u2", "other@y.edu", member_claims("other-school", &[]));
    env.identity.add_user(officer.clone()).await;
    env.identity.add_user(outsider).await;

    let cross = env
        .membership()
        .add_member(&auth_user(&officer), CLUB, Some("other@y.edu"))
        .await
        .unwrap_err();
    let ghost = env
        .membership()
        .add_member(&auth_user(&officer), CLUB, Some("ghost@x.edu"))
        .await
        .unwrap_err();

    // cross-tenant and nonexistent must be indistinguishable
    assert_eq!(cross.error_code(), "BAD_REQUEST");
    assert_eq!(ghost.error_code(), "BAD_REQUEST");
    assert_eq!(cross.message(), ghost.message());
    Ok(())
}

#[tokio::test]
async fn remove_member_updates_claims_and_documents() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_OPEN, &[], &["a@x.edu"]).await;
    let record = user_record("u1", "a@x.edu", member_claims(SCHOOL, &[CLUB]));
    env.identity.add_user(record.clone()).await;

    env.membership()
        .remove_member(&auth_user(&record), CLUB, None)
        .await?;

    assert!(!env.identity.claims_of("u1").await.is_member_of(CLUB));
    let members = env.firestore.field(&club_private_path(), "members").await.unwrap();
    assert!(!members.contains_str("a@x.edu"));
    assert_eq!(
        env.firestore.field(&club_path(), "numMembers").await,
        Some(FirestoreValue::Integer(0))
    );
    Ok(())
}

#[tokio::test]
async fn removing_nonmember_is_bad_request() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_OPEN, &[], &[]).await;
    let record = user_record("u1", "a@x.edu", member_claims(SCHOOL, &[]));
    env.identity.add_user(record.clone()).await;

    let err = env
        .membership()
        .remove_member(&auth_user(&record), CLUB, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn removing_officer_strips_officer_state_everywhere() -> Result<()> {
    let env = TestEnv::new();
    seed_club(
        &env.firestore,
        SCHOOL,
        CLUB,
        SIGNUP_OPEN,
        &[
            ("a@x.edu", OfficerPermission::ALL),
            ("b@x.edu", OfficerPermission::ALL),
        ],
        &["a@x.edu", "b@x.edu"],
    )
    .await;
    let actor = user_record(
        "u1",
        "a@x.edu",
        officer_claims(SCHOOL, CLUB, OfficerPermission::ALL),
    );
    let target = user_record(
        "u2",
        "b@x.edu",
        officer_claims(SCHOOL, CLUB, OfficerPermission::ALL),
    );
    env.identity.add_user(actor.clone()).await;
    env.identity.add_user(target).await;

    env.membership()
        .remove_member(&auth_user(&actor), CLUB, Some("b@x.edu"))
        .await?;

    // officer entry gone from the public doc, membership from the private
    // doc, and the counter moved exactly once
    let officers = env.firestore.field(&club_path(), "officers").await.unwrap();
    let officers = officers.as_map().unwrap();
    assert!(officers.contains_key("a@x.edu"));
    assert!(!officers.contains_key("b@x.edu"));
    assert_eq!(
        env.firestore.field(&club_path(), "numMembers").await,
        Some(FirestoreValue::Integer(1))
    );
    let members = env.firestore.field(&club_private_path(), "members").await.unwrap();
    assert!(!members.contains_str("b@x.edu"));

    let claims = env.identity.claims_of("u2").await;
    assert!(!claims.is_member_of(CLUB));
    assert!(claims.officer_permissions(CLUB).is_none());
    Ok(())
}

#[tokio::test]
async fn membership_updates_preserve_profile_claims() -> Result<()> {
    let env = TestEnv::new();
    seed_club(&env.firestore, SCHOOL, CLUB, SIGNUP_OPEN, &[], &[]).await;
    let mut claims = member_claims(SCHOOL, &[]);
    claims.grad_year = Some(json!("2027"));
    claims.interests = Some(json!([1, 5]));
    let record = user_record("u1", "a@x.edu", claims);
    env.identity.add_user(record.clone()).await;

    env.membership()
        .add_member(&auth_user(&record), CLUB, None)
        .await?;

    // fields the update never mentioned must survive it
    let stored = env.identity.claims_of("u1").await;
    assert_eq!(stored.grad_year, Some(json!("2027")));
    assert_eq!(stored.interests, Some(json!([1, 5])));
    assert_eq!(stored.school.as_deref(), Some(SCHOOL));
    Ok(())
}
