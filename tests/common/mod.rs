// Shared fixtures for the integration tests
#![allow(dead_code)]

use memorial_circles::{
    families::{self, CreateFamily, Family},
    memorials::{self, PrivacyLevel},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::{path::PathBuf, time::Duration};
use uuid::Uuid;

pub struct TestHarness {
    pub db_pool: SqlitePool,
    db_file: Option<PathBuf>,
}

impl TestHarness {
    /// Fresh in-memory database with the schema applied.
    ///
    /// A single connection that never idles out keeps the in-memory database alive
    /// for the whole test.
    pub async fn new() -> anyhow::Result<Self> {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        Ok(Self {
            db_pool,
            db_file: None,
        })
    }

    /// File-backed database behind a pool of real connections, so concurrent
    /// operations actually contend for SQLite's write lock.
    pub async fn with_connections(max_connections: u32) -> anyhow::Result<Self> {
        let db_file = std::env::temp_dir().join(format!("memorial-circles-{}.db", Uuid::now_v7()));
        let options = SqliteConnectOptions::new()
            .filename(&db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));
        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        Ok(Self {
            db_pool,
            db_file: Some(db_file),
        })
    }

    pub async fn family(&self, creator_id: &str) -> Family {
        families::create_family(
            &self.db_pool,
            creator_id,
            CreateFamily {
                name: format!("{creator_id} family"),
                description: String::new(),
            },
        )
        .await
        .expect("Failed to create family")
    }

    pub async fn join(&self, family: &Family, user_id: &str) {
        families::join_by_code(&self.db_pool, user_id, &family.invite_code)
            .await
            .expect("Failed to join family");
    }

    pub async fn admin(&self, family: &Family, user_id: &str) {
        self.join(family, user_id).await;
        families::set_member_role(&self.db_pool, &family.creator_id, family.id, user_id, "admin")
            .await
            .expect("Failed to promote admin");
    }

    /// Stands in for the memorial service creating a memorial page.
    pub async fn memorial(&self, creator_id: &str, privacy_level: PrivacyLevel) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO memorials (id, creator_id, privacy_level) VALUES (?, ?, ?)")
            .bind(id)
            .bind(creator_id)
            .bind(privacy_level)
            .execute(&self.db_pool)
            .await
            .expect("Failed to create memorial");
        id
    }

    pub async fn link(&self, family: &Family, memorial_id: Uuid) {
        memorials::link_memorial(&self.db_pool, &family.creator_id, family.id, memorial_id)
            .await
            .expect("Failed to link memorial");
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        let Some(db_file) = self.db_file.take() else {
            return;
        };
        for suffix in ["", "-wal", "-shm"] {
            let mut path = db_file.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}
