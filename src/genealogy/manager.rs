use serde::{Deserialize, Deserializer};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use time::Date;
use tracing::info;
use uuid::Uuid;

use crate::{
    begin_write,
    error::{is_foreign_key_violation, CoreError, CoreResult},
    families::{Activity, ActivityKind, Authority},
    memorials::MemorialLink,
    now,
};

use super::{
    forest::Forest,
    model::{Gender, GenealogyNode},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNode {
    pub person_name: String,
    pub generation: i32,
    pub gender: String,
    pub parent_id: Option<Uuid>,
    pub memorial_id: Option<Uuid>,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub position: String,
    pub birth_date: Option<Date>,
    pub death_date: Option<Date>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub achievements: String,
}

/// Partial update; absent fields keep their stored value.
///
/// The nullable fields take an explicit `null` to clear them: `parent_id: null`
/// makes the node a root and `memorial_id: null` drops its memorial.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNode {
    pub person_name: Option<String>,
    pub generation: Option<i32>,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present")]
    pub memorial_id: Option<Option<Uuid>>,
    pub biography: Option<String>,
    pub position: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub birth_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "present")]
    pub death_date: Option<Option<Date>>,
    pub avatar_url: Option<String>,
    pub achievements: Option<String>,
}

/// Maps a field that is present in the body to `Some`, even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("person name must not be empty"));
    }
    Ok(name.to_owned())
}

fn validate_lifespan(birth_date: Option<Date>, death_date: Option<Date>) -> CoreResult<()> {
    match (birth_date, death_date) {
        (Some(born), Some(died)) if died < born => {
            Err(CoreError::validation("death date precedes birth date"))
        }
        _ => Ok(()),
    }
}

async fn validate_parent(conn: &mut SqliteConnection, family_id: Uuid, parent_id: Uuid) -> CoreResult<GenealogyNode> {
    GenealogyNode::find_in_family(conn, family_id, parent_id)
        .await?
        .ok_or_else(|| CoreError::validation("parent node does not belong to this family"))
}

async fn validate_memorial(conn: &mut SqliteConnection, family_id: Uuid, memorial_id: Uuid) -> CoreResult<()> {
    if !MemorialLink::exists(conn, memorial_id, family_id).await? {
        return Err(CoreError::validation("memorial is not linked to this family"));
    }
    Ok(())
}

fn parent_rejected(err: sqlx::Error) -> CoreError {
    if is_foreign_key_violation(&err) {
        CoreError::validation("parent node does not belong to this family")
    } else {
        err.into()
    }
}

pub async fn create_node(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    req: CreateNode,
) -> CoreResult<GenealogyNode> {
    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;

    let gender: Gender = req.gender.parse()?;
    let person_name = validate_name(&req.person_name)?;
    validate_lifespan(req.birth_date, req.death_date)?;

    if let Some(parent_id) = req.parent_id {
        validate_parent(&mut tx, family_id, parent_id).await?;
    }
    if let Some(memorial_id) = req.memorial_id {
        validate_memorial(&mut tx, family_id, memorial_id).await?;
    }

    let created_at = now();
    let node = GenealogyNode {
        id: Uuid::now_v7(),
        family_id,
        parent_id: req.parent_id,
        generation: req.generation,
        person_name,
        gender,
        biography: req.biography,
        position: req.position,
        birth_date: req.birth_date,
        death_date: req.death_date,
        avatar_url: req.avatar_url,
        achievements: req.achievements,
        memorial_id: req.memorial_id,
        created_at,
        updated_at: created_at,
    };
    // the composite foreign key rejects a parent deleted since the check above
    node.insert(&mut tx).await.map_err(parent_rejected)?;
    Activity::record(
        &mut tx,
        family_id,
        acting_user_id,
        node.memorial_id,
        ActivityKind::CreateGenealogy,
        json!({
            "node_id": node.id,
            "person_name": node.person_name,
            "generation": node.generation,
        }),
    )
    .await?;
    tx.commit().await?;

    info!(%family_id, node_id = %node.id, generation = node.generation, "genealogy node created");
    Ok(node)
}

pub async fn get_tree(db_pool: &SqlitePool, user_id: &str, family_id: Uuid) -> CoreResult<Forest> {
    let mut conn = db_pool.acquire().await?;
    Authority::require(&mut conn, family_id, user_id, Authority::Member).await?;
    let nodes = GenealogyNode::for_family(&mut conn, family_id).await?;
    Ok(Forest::from_nodes(nodes))
}

pub async fn update_node(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    node_id: Uuid,
    req: UpdateNode,
) -> CoreResult<GenealogyNode> {
    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;

    let mut node = GenealogyNode::find_in_family(&mut tx, family_id, node_id)
        .await?
        .ok_or(CoreError::NotFound("genealogy node"))?;

    if let Some(gender) = req.gender {
        node.gender = gender.parse()?;
    }
    if let Some(name) = req.person_name {
        node.person_name = validate_name(&name)?;
    }
    match req.parent_id {
        Some(Some(parent_id)) => {
            if parent_id == node.id {
                return Err(CoreError::validation("a node cannot be its own parent"));
            }
            validate_parent(&mut tx, family_id, parent_id).await?;
            let forest = Forest::from_nodes(GenealogyNode::for_family(&mut tx, family_id).await?);
            if forest.is_ancestor(node.id, parent_id) {
                return Err(CoreError::validation("a node cannot descend from itself"));
            }
            node.parent_id = Some(parent_id);
        }
        Some(None) => node.parent_id = None,
        None => {}
    }
    if let Some(memorial_id) = req.memorial_id {
        if let Some(memorial_id) = memorial_id {
            validate_memorial(&mut tx, family_id, memorial_id).await?;
        }
        node.memorial_id = memorial_id;
    }
    if let Some(generation) = req.generation {
        node.generation = generation;
    }
    if let Some(biography) = req.biography {
        node.biography = biography;
    }
    if let Some(position) = req.position {
        node.position = position;
    }
    if let Some(birth_date) = req.birth_date {
        node.birth_date = birth_date;
    }
    if let Some(death_date) = req.death_date {
        node.death_date = death_date;
    }
    validate_lifespan(node.birth_date, node.death_date)?;
    if let Some(avatar_url) = req.avatar_url {
        node.avatar_url = avatar_url;
    }
    if let Some(achievements) = req.achievements {
        node.achievements = achievements;
    }

    node.updated_at = now();
    node.update(&mut tx).await.map_err(parent_rejected)?;
    tx.commit().await?;

    info!(%family_id, %node_id, "genealogy node updated");
    Ok(node)
}

/// Deletes a leaf node. Nodes must be removed leaf-first.
pub async fn delete_node(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    node_id: Uuid,
) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;

    if GenealogyNode::find_in_family(&mut tx, family_id, node_id).await?.is_none() {
        return Err(CoreError::NotFound("genealogy node"));
    }
    if GenealogyNode::count_children(&mut tx, family_id, node_id).await? > 0 {
        return Err(CoreError::conflict("genealogy node has descendants"));
    }
    match GenealogyNode::delete(&mut tx, family_id, node_id).await {
        Ok(_) => {}
        // a child adopted this node after the count
        Err(err) if is_foreign_key_violation(&err) => {
            return Err(CoreError::conflict("genealogy node has descendants"));
        }
        Err(err) => return Err(err.into()),
    }
    tx.commit().await?;

    info!(%family_id, %node_id, "genealogy node deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tells_null_from_absent() {
        let absent: UpdateNode = serde_json::from_str(r#"{"person_name": "Wei"}"#).unwrap();
        assert_eq!(absent.parent_id, None);
        assert_eq!(absent.memorial_id, None);

        let cleared: UpdateNode =
            serde_json::from_str(r#"{"parent_id": null, "memorial_id": null, "death_date": null}"#).unwrap();
        assert_eq!(cleared.parent_id, Some(None));
        assert_eq!(cleared.memorial_id, Some(None));
        assert_eq!(cleared.death_date, Some(None));

        let id = Uuid::now_v7();
        let set: UpdateNode =
            serde_json::from_str(&format!(r#"{{"parent_id": "{id}", "birth_date": "1931-04-02"}}"#)).unwrap();
        assert_eq!(set.parent_id, Some(Some(id)));
        assert_eq!(
            set.birth_date,
            Some(Some(Date::from_calendar_date(1931, time::Month::April, 2).unwrap()))
        );
    }

    #[test]
    fn death_cannot_precede_birth() {
        let born = Date::from_calendar_date(1931, time::Month::April, 2).unwrap();
        let died = Date::from_calendar_date(2004, time::Month::November, 9).unwrap();
        assert!(validate_lifespan(Some(born), Some(died)).is_ok());
        assert!(validate_lifespan(Some(born), None).is_ok());
        assert!(validate_lifespan(Some(born), Some(born)).is_ok());
        assert_eq!(
            validate_lifespan(Some(died), Some(born)).unwrap_err().kind(),
            crate::ErrorKind::Validation
        );
    }
}
