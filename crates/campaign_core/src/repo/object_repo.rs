//! Top-level object repository: the object resolver and document store.
//!
//! # Responsibility
//! - Resolve `(type, id)` pairs into fully loaded objects.
//! - Persist embedded campaign attributions atomically per object.
//!
//! # Invariants
//! - `resolve` only returns an object when both id and type match.
//! - `save_object` rewrites the whole attribution list; relationships are
//!   read-only on this path.
//! - Storage enforces one attribution row per `(object, campaign name)`.

use crate::model::attribution::{CampaignList, Confidence, EmbeddedCampaign};
use crate::model::object::{ObjectId, ObjectRef, ObjectType, TopLevelObject};
use crate::model::relationship::RelationshipType;
use crate::model::now_epoch_ms;
use crate::repo::relationships::{insert_edge_pair, load_relationships, Endpoint};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

const REQUIRED_TABLES: &[&str] = &["objects", "object_campaigns", "relationships"];

/// Repository interface for attributable top-level objects.
pub trait ObjectRepository {
    /// Inserts a new object with its initial attributions.
    fn create_object(&self, object: &TopLevelObject, analyst: &str) -> RepoResult<ObjectId>;
    /// Loads one object with attributions and relationships.
    fn resolve(&self, object: ObjectRef) -> RepoResult<Option<TopLevelObject>>;
    /// Validates and persists value and attribution list.
    fn save_object(&self, object: &TopLevelObject, analyst: &str) -> RepoResult<()>;
    /// Stores `left -[relationship]-> right` plus the inverse edge on `right`.
    fn relate(
        &self,
        left: ObjectRef,
        right: ObjectRef,
        relationship: RelationshipType,
        analyst: &str,
    ) -> RepoResult<()>;
    /// Objects holding an attribution to `campaign`, ordered by type then id.
    fn list_by_campaign(&self, campaign: &str) -> RepoResult<Vec<ObjectRef>>;
}

/// SQLite-backed object repository.
pub struct SqliteObjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ObjectRepository for SqliteObjectRepository<'_> {
    fn create_object(&self, object: &TopLevelObject, analyst: &str) -> RepoResult<ObjectId> {
        object.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO objects (uuid, type, value, modified_by)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                object.id.to_string(),
                object.kind.tag(),
                object.value.as_str(),
                analyst,
            ],
        )?;
        write_campaigns(&tx, object)?;
        tx.commit()?;

        Ok(object.id)
    }

    fn resolve(&self, object: ObjectRef) -> RepoResult<Option<TopLevelObject>> {
        let id_text = object.id.to_string();
        let row = self
            .conn
            .query_row(
                "SELECT value, updated_at, modified_by
                 FROM objects
                 WHERE uuid = ?1 AND type = ?2;",
                params![id_text, object.kind.tag()],
                |row| {
                    Ok((
                        row.get::<_, String>("value")?,
                        row.get::<_, i64>("updated_at")?,
                        row.get::<_, Option<String>>("modified_by")?,
                    ))
                },
            )
            .optional()?;

        let Some((value, updated_at, modified_by)) = row else {
            return Ok(None);
        };

        let mut loaded = TopLevelObject::with_id(object.id, object.kind, value);
        loaded.campaigns = load_campaigns(self.conn, &id_text)?;
        loaded.relationships = load_relationships(self.conn, object.id)?;
        loaded.updated_at = updated_at;
        loaded.modified_by = modified_by;
        loaded.validate()?;
        Ok(Some(loaded))
    }

    fn save_object(&self, object: &TopLevelObject, analyst: &str) -> RepoResult<()> {
        object.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id_text = object.id.to_string();
        let changed = tx.execute(
            "UPDATE objects
             SET
                value = ?1,
                modified_by = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3 AND type = ?4;",
            params![
                object.value.as_str(),
                analyst,
                id_text,
                object.kind.tag(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(object.id));
        }

        tx.execute(
            "DELETE FROM object_campaigns WHERE object_uuid = ?1;",
            [id_text.as_str()],
        )?;
        write_campaigns(&tx, object)?;
        tx.commit()?;
        Ok(())
    }

    fn relate(
        &self,
        left: ObjectRef,
        right: ObjectRef,
        relationship: RelationshipType,
        analyst: &str,
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for endpoint in [left, right] {
            let exists: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM objects WHERE uuid = ?1 AND type = ?2);",
                params![endpoint.id.to_string(), endpoint.kind.tag()],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(RepoError::NotFound(endpoint.id));
            }
        }

        insert_edge_pair(
            &tx,
            Endpoint {
                tag: left.kind.tag(),
                id: left.id,
            },
            Endpoint {
                tag: right.kind.tag(),
                id: right.id,
            },
            relationship,
            analyst,
            now_epoch_ms(),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_by_campaign(&self, campaign: &str) -> RepoResult<Vec<ObjectRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.uuid, o.type
             FROM object_campaigns AS c
             JOIN objects AS o ON o.uuid = c.object_uuid
             WHERE c.name = ?1
             ORDER BY o.type ASC, o.uuid ASC;",
        )?;
        let mut rows = stmt.query([campaign])?;
        let mut refs = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            let type_text: String = row.get("type")?;
            let kind = ObjectType::from_tag(&type_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid object type `{type_text}` in objects.type"))
            })?;
            refs.push(ObjectRef::new(kind, parse_uuid(&uuid_text, "objects.uuid")?));
        }
        Ok(refs)
    }
}

fn write_campaigns(conn: &Connection, object: &TopLevelObject) -> RepoResult<()> {
    let id_text = object.id.to_string();
    for (position, entry) in object.campaigns.iter().enumerate() {
        conn.execute(
            "INSERT INTO object_campaigns (
                object_uuid,
                position,
                name,
                confidence,
                description,
                analyst,
                date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id_text,
                position as i64,
                entry.name.as_str(),
                entry.confidence.as_str(),
                entry.description.as_str(),
                entry.analyst.as_str(),
                entry.date,
            ],
        )?;
    }
    Ok(())
}

fn load_campaigns(conn: &Connection, object_uuid: &str) -> RepoResult<CampaignList> {
    let mut stmt = conn.prepare(
        "SELECT name, confidence, description, analyst, date
         FROM object_campaigns
         WHERE object_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([object_uuid])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let confidence_text: String = row.get("confidence")?;
        let confidence = Confidence::parse(&confidence_text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid confidence `{confidence_text}` in object_campaigns.confidence"
            ))
        })?;
        entries.push(EmbeddedCampaign {
            name: row.get("name")?,
            confidence,
            description: row.get("description")?,
            analyst: row.get("analyst")?,
            date: row.get("date")?,
        });
    }
    Ok(CampaignList::from(entries))
}
