mod common;

use crate::common::TestHarness;
use memorial_circles::{
    access::{self, AccessRequestStatus},
    memorials::PrivacyLevel,
    privacy::{self, Action, Verdict},
    ErrorKind,
};
use uuid::Uuid;

async fn setup() -> TestHarness {
    TestHarness::new().await.expect("Failed to create test harness")
}

#[tokio::test]
async fn approved_request_opens_a_private_memorial() {
    let h = setup().await;
    let family = h.family("alice").await;
    let memorial_id = h.memorial("alice", PrivacyLevel::Private).await;
    h.link(&family, memorial_id).await;

    let request = access::request_access(&h.db_pool, "dave", memorial_id, "please".to_owned())
        .await
        .unwrap();
    assert_eq!(request.status, AccessRequestStatus::Pending);

    let err = access::request_access(&h.db_pool, "dave", memorial_id, "again".to_owned())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(!privacy::can_access(&h.db_pool, "dave", memorial_id, Action::View).await.unwrap());

    let handled = access::handle_access_request(&h.db_pool, "alice", request.id, true, Vec::new())
        .await
        .unwrap();
    assert_eq!(handled.status, AccessRequestStatus::Approved);

    assert!(privacy::can_access(&h.db_pool, "dave", memorial_id, Action::View).await.unwrap());
    assert_eq!(
        privacy::explain(&h.db_pool, "dave", memorial_id, Action::View).await.unwrap(),
        Verdict::ApprovedRequest
    );
}

#[tokio::test]
async fn only_the_memorial_creator_decides() {
    let h = setup().await;
    let memorial_id = h.memorial("alice", PrivacyLevel::Private).await;
    let request = access::request_access(&h.db_pool, "dave", memorial_id, String::new())
        .await
        .unwrap();

    let err = access::handle_access_request(&h.db_pool, "dave", request.id, true, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = access::handle_access_request(&h.db_pool, "alice", Uuid::now_v7(), true, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn handled_requests_are_not_reopened() {
    let h = setup().await;
    let memorial_id = h.memorial("alice", PrivacyLevel::Private).await;
    let request = access::request_access(&h.db_pool, "dave", memorial_id, String::new())
        .await
        .unwrap();

    let rejected = access::handle_access_request(&h.db_pool, "alice", request.id, false, Vec::new())
        .await
        .unwrap();
    assert_eq!(rejected.status, AccessRequestStatus::Rejected);
    assert!(!privacy::can_access(&h.db_pool, "dave", memorial_id, Action::View).await.unwrap());

    let err = access::handle_access_request(&h.db_pool, "alice", request.id, true, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // a rejection frees the requester to ask again
    let retry = access::request_access(&h.db_pool, "dave", memorial_id, String::new())
        .await
        .unwrap();
    assert_ne!(retry.id, request.id);
}

#[tokio::test]
async fn approval_can_grant_scoped_overrides() {
    let h = setup().await;
    let memorial_id = h.memorial("alice", PrivacyLevel::Private).await;
    let request = access::request_access(&h.db_pool, "dave", memorial_id, String::new())
        .await
        .unwrap();

    access::handle_access_request(
        &h.db_pool,
        "alice",
        request.id,
        true,
        vec![Action::Comment, Action::Comment, Action::Worship],
    )
    .await
    .unwrap();

    let settings = privacy::get_privacy_settings(&h.db_pool, "alice", memorial_id).await.unwrap();
    assert_eq!(settings.overrides.len(), 2);
    assert!(settings
        .overrides
        .iter()
        .all(|o| o.user_id.as_deref() == Some("dave") && o.allowed));
    assert!(settings.pending_requests.is_empty());
}

#[tokio::test]
async fn blacklist_outranks_an_approved_request() {
    let h = setup().await;
    let memorial_id = h.memorial("alice", PrivacyLevel::Private).await;
    let request = access::request_access(&h.db_pool, "dave", memorial_id, String::new())
        .await
        .unwrap();
    access::handle_access_request(&h.db_pool, "alice", request.id, true, Vec::new())
        .await
        .unwrap();

    privacy::add_to_blacklist(&h.db_pool, "alice", memorial_id, "dave", String::new())
        .await
        .unwrap();
    assert_eq!(
        privacy::explain(&h.db_pool, "dave", memorial_id, Action::View).await.unwrap(),
        Verdict::Blacklisted
    );
}

#[tokio::test]
async fn requests_need_an_existing_memorial() {
    let h = setup().await;
    let err = access::request_access(&h.db_pool, "dave", Uuid::now_v7(), String::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn creator_lists_requests() {
    let h = setup().await;
    let memorial_id = h.memorial("alice", PrivacyLevel::Private).await;
    access::request_access(&h.db_pool, "dave", memorial_id, String::new()).await.unwrap();
    access::request_access(&h.db_pool, "erin", memorial_id, String::new()).await.unwrap();

    let listed = access::list_access_requests(&h.db_pool, "alice", memorial_id).await.unwrap();
    assert_eq!(listed.len(), 2);

    let settings = privacy::get_privacy_settings(&h.db_pool, "alice", memorial_id).await.unwrap();
    assert_eq!(settings.pending_requests.len(), 2);

    let err = access::list_access_requests(&h.db_pool, "dave", memorial_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
