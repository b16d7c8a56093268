mod common;

use crate::common::TestHarness;
use memorial_circles::{
    families::{self, ActivityKind, Authority, PageQuery},
    invitations::{self, InvitationStatus, InviteMembers},
    ErrorKind,
};

const TTL: time::Duration = time::Duration::days(30);

async fn setup() -> TestHarness {
    TestHarness::new().await.expect("Failed to create test harness")
}

fn invitees(ids: &[&str]) -> InviteMembers {
    InviteMembers {
        user_ids: ids.iter().map(|id| id.to_string()).collect(),
        message: "join us".to_owned(),
    }
}

#[tokio::test]
async fn accepted_invitation_grants_membership_once() {
    let h = setup().await;
    let family = h.family("alice").await;

    let created = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), TTL)
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, InvitationStatus::Pending);

    let pending = invitations::pending_invitations(&h.db_pool, "bob").await.unwrap();
    assert_eq!(pending.len(), 1);

    let answered = invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, true)
        .await
        .unwrap();
    assert_eq!(answered.status, InvitationStatus::Accepted);

    let members = families::list_members(&h.db_pool, "bob", family.id).await.unwrap();
    let bob = members.iter().find(|m| m.user_id == "bob").unwrap();
    assert_eq!(bob.authority, Authority::Member);

    let err = invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(invitations::pending_invitations(&h.db_pool, "bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn admins_invite_members_do_not() {
    let h = setup().await;
    let family = h.family("alice").await;
    h.admin(&family, "bob").await;
    h.join(&family, "carol").await;

    let err = invitations::invite(&h.db_pool, "carol", family.id, invitees(&["dave"]), TTL)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let created = invitations::invite(&h.db_pool, "bob", family.id, invitees(&["dave"]), TTL)
        .await
        .unwrap();
    assert_eq!(created[0].inviter_id, "bob");
}

#[tokio::test]
async fn members_and_pending_invitees_are_skipped() {
    let h = setup().await;
    let family = h.family("alice").await;
    h.join(&family, "bob").await;

    let first = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["carol"]), TTL)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    let second = invitations::invite(
        &h.db_pool,
        "alice",
        family.id,
        invitees(&["bob", "carol", "dave", "dave"]),
        TTL,
    )
    .await
    .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].invitee_id, "dave");

    let err = invitations::invite(&h.db_pool, "alice", family.id, invitees(&[" "]), TTL)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn only_the_invitee_may_answer() {
    let h = setup().await;
    let family = h.family("alice").await;
    let created = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), TTL)
        .await
        .unwrap();

    let err = invitations::respond_to_invitation(&h.db_pool, "mallory", created[0].id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = invitations::respond_to_invitation(&h.db_pool, "bob", uuid::Uuid::now_v7(), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn declined_invitation_is_terminal() {
    let h = setup().await;
    let family = h.family("alice").await;
    let created = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), TTL)
        .await
        .unwrap();

    let answered = invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, false)
        .await
        .unwrap();
    assert_eq!(answered.status, InvitationStatus::Declined);

    let err = invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = families::get_family(&h.db_pool, "bob", family.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn lapsed_invitation_cannot_be_accepted() {
    let h = setup().await;
    let family = h.family("alice").await;
    let created = invitations::invite(
        &h.db_pool,
        "alice",
        family.id,
        invitees(&["bob"]),
        time::Duration::ZERO,
    )
    .await
    .unwrap();

    assert!(invitations::pending_invitations(&h.db_pool, "bob").await.unwrap().is_empty());
    let err = invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // a lapsed invitation does not block a fresh one
    let again = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), TTL)
        .await
        .unwrap();
    assert_eq!(again.len(), 1);
}

#[tokio::test]
async fn sweep_expires_only_overdue_invitations() {
    let h = setup().await;
    let family = h.family("alice").await;
    invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), time::Duration::ZERO)
        .await
        .unwrap();
    let live = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["carol"]), TTL)
        .await
        .unwrap();

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let expired = invitations::expire_stale_invitations(&h.db_pool, now + 1).await.unwrap();
    assert_eq!(expired, 1);
    assert_eq!(invitations::expire_stale_invitations(&h.db_pool, now + 1).await.unwrap(), 0);

    let answered = invitations::respond_to_invitation(&h.db_pool, "carol", live[0].id, true)
        .await
        .unwrap();
    assert_eq!(answered.status, InvitationStatus::Accepted);
}

#[tokio::test]
async fn deleting_the_family_voids_its_invitations() {
    let h = setup().await;
    let family = h.family("alice").await;
    let created = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), TTL)
        .await
        .unwrap();

    families::delete_family(&h.db_pool, "alice", family.id).await.unwrap();

    assert!(invitations::pending_invitations(&h.db_pool, "bob").await.unwrap().is_empty());
    let err = invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn invitation_and_code_paths_converge() {
    let h = setup().await;
    let family = h.family("alice").await;
    let created = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob"]), TTL)
        .await
        .unwrap();

    families::join_by_code(&h.db_pool, "bob", &family.invite_code).await.unwrap();
    invitations::respond_to_invitation(&h.db_pool, "bob", created[0].id, true)
        .await
        .unwrap();

    let members = families::list_members(&h.db_pool, "alice", family.id).await.unwrap();
    assert_eq!(members.iter().filter(|m| m.user_id == "bob").count(), 1);
}

#[tokio::test]
async fn accepted_invitation_is_logged_once() {
    let h = setup().await;
    let family = h.family("alice").await;
    let created = invitations::invite(&h.db_pool, "alice", family.id, invitees(&["bob", "carol"]), TTL)
        .await
        .unwrap();
    let bobs = created.iter().find(|i| i.invitee_id == "bob").unwrap();
    let carols = created.iter().find(|i| i.invitee_id == "carol").unwrap();

    invitations::respond_to_invitation(&h.db_pool, "bob", bobs.id, true).await.unwrap();
    // already a member by code, so accepting adds nothing to the log
    families::join_by_code(&h.db_pool, "carol", &family.invite_code).await.unwrap();
    invitations::respond_to_invitation(&h.db_pool, "carol", carols.id, true).await.unwrap();

    let page = families::family_activities(&h.db_pool, "alice", family.id, PageQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let bob_joined = page.activities.iter().find(|a| a.user_id == "bob").unwrap();
    assert_eq!(bob_joined.kind, ActivityKind::Join);
    assert_eq!(bob_joined.content["method"], "invitation");
    assert_eq!(bob_joined.content["invitation_id"], bobs.id.to_string());
}
