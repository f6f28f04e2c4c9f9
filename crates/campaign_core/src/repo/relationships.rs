//! Shared relationship edge persistence.
//!
//! Edges live in one `relationships` table keyed by owner and position, so
//! campaigns and top-level objects share the same storage and ordering.

use crate::model::relationship::{Relationship, RelationshipType};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// One endpoint of an edge: type tag plus id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint<'a> {
    pub tag: &'a str,
    pub id: Uuid,
}

/// Loads the edges owned by `owner` in insertion order.
pub(crate) fn load_relationships(conn: &Connection, owner: Uuid) -> RepoResult<Vec<Relationship>> {
    let mut stmt = conn.prepare(
        "SELECT object_uuid, object_type, relationship, analyst, date
         FROM relationships
         WHERE owner_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut relationships = Vec::new();

    while let Some(row) = rows.next()? {
        let object_text: String = row.get("object_uuid")?;
        let relationship_text: String = row.get("relationship")?;
        let relationship = RelationshipType::parse(&relationship_text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid relationship `{relationship_text}` in relationships.relationship"
            ))
        })?;
        relationships.push(Relationship {
            object_id: parse_uuid(&object_text, "relationships.object_uuid")?,
            rel_type: row.get("object_type")?,
            relationship,
            analyst: row.get("analyst")?,
            date: row.get("date")?,
        });
    }

    Ok(relationships)
}

/// Writes `left -[relationship]-> right` and the inverse edge on `right`.
///
/// Callers own the surrounding transaction.
pub(crate) fn insert_edge_pair(
    conn: &Connection,
    left: Endpoint<'_>,
    right: Endpoint<'_>,
    relationship: RelationshipType,
    analyst: &str,
    date: i64,
) -> RepoResult<()> {
    insert_edge(conn, left, right, relationship, analyst, date)?;
    insert_edge(conn, right, left, relationship.inverse(), analyst, date)
}

/// Drops every edge owned by `owner`.
pub(crate) fn delete_owned(conn: &Connection, owner: Uuid) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM relationships WHERE owner_uuid = ?1;",
        [owner.to_string()],
    )?;
    Ok(())
}

fn insert_edge(
    conn: &Connection,
    owner: Endpoint<'_>,
    target: Endpoint<'_>,
    relationship: RelationshipType,
    analyst: &str,
    date: i64,
) -> RepoResult<()> {
    let owner_text = owner.id.to_string();
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM relationships WHERE owner_uuid = ?1;",
        [owner_text.as_str()],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO relationships (
            owner_uuid,
            owner_type,
            position,
            object_uuid,
            object_type,
            relationship,
            analyst,
            date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            owner_text,
            owner.tag,
            position,
            target.id.to_string(),
            target.tag,
            relationship.as_str(),
            analyst,
            date,
        ],
    )?;
    Ok(())
}
