mod common;

use crate::common::TestHarness;
use memorial_circles::{
    families::{self, Family},
    genealogy::{self, CreateNode},
    invitations::{self, InvitationStatus, InviteMembers},
    CoreResult, ErrorKind,
};
use uuid::Uuid;

const ROUNDS: usize = 10;

async fn setup() -> TestHarness {
    TestHarness::with_connections(8)
        .await
        .expect("Failed to create test harness")
}

fn kind<T>(result: &CoreResult<T>) -> Option<ErrorKind> {
    result.as_ref().err().map(|err| err.kind())
}

fn person(name: &str, parent_id: Option<Uuid>) -> CreateNode {
    CreateNode {
        person_name: name.to_owned(),
        generation: if parent_id.is_some() { 2 } else { 1 },
        gender: "female".to_owned(),
        parent_id,
        memorial_id: None,
        biography: String::new(),
        position: String::new(),
        birth_date: None,
        death_date: None,
        avatar_url: String::new(),
        achievements: String::new(),
    }
}

async fn memberships(h: &TestHarness, family: &Family, user_id: &str) -> usize {
    families::list_members(&h.db_pool, &family.creator_id, family.id)
        .await
        .expect("Failed to list members")
        .iter()
        .filter(|m| m.user_id == user_id)
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_code_joins_admit_the_user_once() {
    let h = setup().await;

    for _ in 0..ROUNDS {
        let family = h.family("alice").await;
        let joins: Vec<_> = (0..4)
            .map(|_| {
                let db_pool = h.db_pool.clone();
                let code = family.invite_code.clone();
                tokio::spawn(async move { families::join_by_code(&db_pool, "bob", &code).await })
            })
            .collect();

        let mut results = Vec::new();
        for join in joins {
            results.push(join.await.expect("join task panicked"));
        }

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(kind)
            .all(|k| k == ErrorKind::Conflict));
        assert_eq!(memberships(&h, &family, "bob").await, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_accepts_and_code_join_converge() {
    let h = setup().await;

    for _ in 0..ROUNDS {
        let family = h.family("alice").await;
        let invitation = invitations::invite(
            &h.db_pool,
            "alice",
            family.id,
            InviteMembers {
                user_ids: vec!["bob".to_owned()],
                message: String::new(),
            },
            time::Duration::days(1),
        )
        .await
        .expect("Failed to invite")
        .remove(0);
        let invitation_id = invitation.id;

        let accepts: Vec<_> = (0..2)
            .map(|_| {
                let db_pool = h.db_pool.clone();
                tokio::spawn(async move {
                    invitations::respond_to_invitation(&db_pool, "bob", invitation_id, true).await
                })
            })
            .collect();
        let join = {
            let db_pool = h.db_pool.clone();
            let code = family.invite_code.clone();
            tokio::spawn(async move { families::join_by_code(&db_pool, "bob", &code).await })
        };

        let mut answers = Vec::new();
        for accept in accepts {
            answers.push(accept.await.expect("accept task panicked"));
        }
        let joined = join.await.expect("join task panicked");

        let accepted: Vec<_> = answers.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].status, InvitationStatus::Accepted);
        assert!(answers
            .iter()
            .filter_map(kind)
            .all(|k| k == ErrorKind::Validation));
        assert!(matches!(kind(&joined), None | Some(ErrorKind::Conflict)));
        assert_eq!(memberships(&h, &family, "bob").await, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deleting_a_parent_while_adopting_keeps_the_tree_whole() {
    let h = setup().await;
    let family_id = h.family("alice").await.id;

    for round in 0..ROUNDS {
        let root_id = genealogy::create_node(&h.db_pool, "alice", family_id, person("Lan", None))
            .await
            .expect("Failed to create root")
            .id;

        let adopt = {
            let db_pool = h.db_pool.clone();
            let child = person(&format!("Mei {round}"), Some(root_id));
            tokio::spawn(async move { genealogy::create_node(&db_pool, "alice", family_id, child).await })
        };
        let delete = {
            let db_pool = h.db_pool.clone();
            tokio::spawn(async move { genealogy::delete_node(&db_pool, "alice", family_id, root_id).await })
        };
        let adopted = adopt.await.expect("create task panicked");
        let deleted = delete.await.expect("delete task panicked");

        match (kind(&adopted), kind(&deleted)) {
            (None, Some(ErrorKind::Conflict)) => {
                let child = adopted.expect("checked above");
                let tree = genealogy::get_tree(&h.db_pool, "alice", family_id).await.unwrap();
                assert_eq!(tree.get(child.id).and_then(|n| n.parent_id), Some(root_id));
                genealogy::delete_node(&h.db_pool, "alice", family_id, child.id).await.unwrap();
                genealogy::delete_node(&h.db_pool, "alice", family_id, root_id).await.unwrap();
            }
            (Some(ErrorKind::Validation), None) => {}
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
        assert!(genealogy::get_tree(&h.db_pool, "alice", family_id).await.unwrap().is_empty());
    }
}
