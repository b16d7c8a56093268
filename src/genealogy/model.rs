use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use time::Date;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(CoreError::validation(format!("unknown gender {other:?}"))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
        })
    }
}

/// One person in a family's ancestry forest.
///
/// `generation` is stored exactly as supplied; smaller numbers are more senior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct GenealogyNode {
    pub id: Uuid,
    pub family_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub generation: i32,
    pub person_name: String,
    pub gender: Gender,
    pub biography: String,
    pub position: String,
    pub birth_date: Option<Date>,
    pub death_date: Option<Date>,
    pub avatar_url: String,
    pub achievements: String,
    pub memorial_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GenealogyNode {
    /// Finds a node only if it belongs to `family_id`.
    pub(crate) async fn find_in_family(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, family_id, parent_id, generation, person_name, gender, biography, position,
                    birth_date, death_date, avatar_url, achievements, memorial_id, created_at, updated_at
             FROM genealogy_nodes WHERE family_id = ? AND id = ?",
        )
        .bind(family_id)
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub(crate) async fn for_family(
        conn: &mut SqliteConnection,
        family_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, family_id, parent_id, generation, person_name, gender, biography, position,
                    birth_date, death_date, avatar_url, achievements, memorial_id, created_at, updated_at
             FROM genealogy_nodes WHERE family_id = ?
             ORDER BY generation ASC, person_name ASC",
        )
        .bind(family_id)
        .fetch_all(conn)
        .await
    }

    pub(crate) async fn count_children(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM genealogy_nodes WHERE family_id = ? AND parent_id = ?")
                .bind(family_id)
                .bind(id)
                .fetch_one(conn)
                .await?;
        Ok(count)
    }

    pub(crate) async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO genealogy_nodes
                (id, family_id, parent_id, generation, person_name, gender, biography, position,
                 birth_date, death_date, avatar_url, achievements, memorial_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.family_id)
        .bind(self.parent_id)
        .bind(self.generation)
        .bind(&self.person_name)
        .bind(self.gender)
        .bind(&self.biography)
        .bind(&self.position)
        .bind(self.birth_date)
        .bind(self.death_date)
        .bind(&self.avatar_url)
        .bind(&self.achievements)
        .bind(self.memorial_id)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub(crate) async fn update(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE genealogy_nodes
             SET parent_id = ?, generation = ?, person_name = ?, gender = ?, biography = ?,
                 position = ?, birth_date = ?, death_date = ?, avatar_url = ?, achievements = ?,
                 memorial_id = ?, updated_at = ?
             WHERE family_id = ? AND id = ?",
        )
        .bind(self.parent_id)
        .bind(self.generation)
        .bind(&self.person_name)
        .bind(self.gender)
        .bind(&self.biography)
        .bind(&self.position)
        .bind(self.birth_date)
        .bind(self.death_date)
        .bind(&self.avatar_url)
        .bind(&self.achievements)
        .bind(self.memorial_id)
        .bind(self.updated_at)
        .bind(self.family_id)
        .bind(self.id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub(crate) async fn delete(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM genealogy_nodes WHERE family_id = ? AND id = ?")
            .bind(family_id)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
