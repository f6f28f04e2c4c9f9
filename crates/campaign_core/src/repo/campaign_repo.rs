//! Campaign repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist campaign records with their aliases, buckets, tickets and TTPs.
//! - Create the campaign-side and object-side relationship edges together
//!   with the campaign row.
//!
//! # Invariants
//! - Campaign names are unique (exact match, case-sensitive).
//! - Deleting a campaign is a hard delete of its own rows. Attributions and
//!   edges held by other objects are left untouched.

use crate::model::campaign::{
    Campaign, CampaignId, CampaignStatus, EmbeddedTtp, TtpList,
};
use crate::model::object::{ObjectRef, CAMPAIGN_TYPE_TAG};
use crate::model::relationship::RelationshipType;
use crate::model::now_epoch_ms;
use crate::repo::relationships::{delete_owned, insert_edge_pair, load_relationships, Endpoint};
use crate::repo::{
    ensure_connection_ready, is_constraint_violation, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const CAMPAIGN_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    status,
    created_at,
    updated_at,
    modified_by
FROM campaigns";

const REQUIRED_TABLES: &[&str] = &[
    "campaigns",
    "campaign_aliases",
    "campaign_buckets",
    "campaign_tickets",
    "campaign_ttps",
    "objects",
    "relationships",
];

/// Relationship to create together with a new campaign.
///
/// `relationship` is expressed from the campaign's side; the related object
/// receives its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignLink {
    pub object: ObjectRef,
    pub relationship: RelationshipType,
}

/// Repository interface for campaign registry persistence.
pub trait CampaignRepository {
    /// Inserts a campaign and, when given, its relationship edges in one
    /// transaction.
    fn insert_campaign(
        &self,
        campaign: &Campaign,
        link: Option<&CampaignLink>,
        analyst: &str,
    ) -> RepoResult<CampaignId>;
    /// Rewrites scalar fields, aliases, buckets, tickets and TTPs.
    fn update_campaign(&self, campaign: &Campaign, analyst: &str) -> RepoResult<()>;
    /// Hard-deletes one campaign.
    fn delete_campaign(&self, id: CampaignId) -> RepoResult<()>;
    fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>>;
    /// Exact-match lookup by name.
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Campaign>>;
    /// Campaign names sorted ascending, optionally without deprecated ones.
    fn list_names(&self, active_only: bool) -> RepoResult<Vec<String>>;
}

/// SQLite-backed campaign repository.
pub struct SqliteCampaignRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCampaignRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl CampaignRepository for SqliteCampaignRepository<'_> {
    fn insert_campaign(
        &self,
        campaign: &Campaign,
        link: Option<&CampaignLink>,
        analyst: &str,
    ) -> RepoResult<CampaignId> {
        campaign.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id_text = campaign.id.to_string();
        let inserted = tx.execute(
            "INSERT INTO campaigns (
                uuid,
                name,
                description,
                status,
                modified_by
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id_text,
                campaign.name.as_str(),
                campaign.description.as_str(),
                campaign.status.as_str(),
                analyst,
            ],
        );
        if let Err(err) = inserted {
            if is_constraint_violation(&err) {
                return Err(RepoError::DuplicateName(campaign.name.clone()));
            }
            return Err(err.into());
        }

        write_child_rows(&tx, campaign)?;

        if let Some(link) = link {
            let related_text = link.object.id.to_string();
            let exists: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM objects WHERE uuid = ?1 AND type = ?2);",
                params![related_text, link.object.kind.tag()],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(RepoError::NotFound(link.object.id));
            }

            insert_edge_pair(
                &tx,
                Endpoint {
                    tag: CAMPAIGN_TYPE_TAG,
                    id: campaign.id,
                },
                Endpoint {
                    tag: link.object.kind.tag(),
                    id: link.object.id,
                },
                link.relationship,
                analyst,
                now_epoch_ms(),
            )?;
        }

        tx.commit()?;
        Ok(campaign.id)
    }

    fn update_campaign(&self, campaign: &Campaign, analyst: &str) -> RepoResult<()> {
        campaign.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE campaigns
             SET
                name = ?1,
                description = ?2,
                status = ?3,
                modified_by = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                campaign.name.as_str(),
                campaign.description.as_str(),
                campaign.status.as_str(),
                analyst,
                campaign.id.to_string(),
            ],
        );
        match changed {
            Ok(0) => return Err(RepoError::NotFound(campaign.id)),
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(RepoError::DuplicateName(campaign.name.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        let id_text = campaign.id.to_string();
        for table in [
            "campaign_aliases",
            "campaign_buckets",
            "campaign_tickets",
            "campaign_ttps",
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE campaign_uuid = ?1;"),
                [id_text.as_str()],
            )?;
        }
        write_child_rows(&tx, campaign)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_campaign(&self, id: CampaignId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM campaigns WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        delete_owned(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>> {
        let row = self
            .conn
            .query_row(
                &format!("{CAMPAIGN_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                read_campaign_row,
            )
            .optional()?;
        row.map(|row| self.hydrate(row)).transpose()
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Campaign>> {
        let row = self
            .conn
            .query_row(
                &format!("{CAMPAIGN_SELECT_SQL} WHERE name = ?1;"),
                [name],
                read_campaign_row,
            )
            .optional()?;
        row.map(|row| self.hydrate(row)).transpose()
    }

    fn list_names(&self, active_only: bool) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name
             FROM campaigns
             WHERE (?1 = 0 OR status <> 'deprecated')
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([i64::from(active_only)])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get("name")?);
        }
        Ok(names)
    }
}

/// Campaign scalar columns, before child rows are attached.
struct CampaignRow {
    uuid: String,
    name: String,
    description: String,
    status: String,
    created_at: i64,
    updated_at: i64,
    modified_by: Option<String>,
}

fn read_campaign_row(row: &Row<'_>) -> rusqlite::Result<CampaignRow> {
    Ok(CampaignRow {
        uuid: row.get("uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        modified_by: row.get("modified_by")?,
    })
}

impl SqliteCampaignRepository<'_> {
    fn hydrate(&self, row: CampaignRow) -> RepoResult<Campaign> {
        let id = parse_uuid(&row.uuid, "campaigns.uuid")?;
        let status = CampaignStatus::parse(&row.status).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid campaign status `{}` in campaigns.status",
                row.status
            ))
        })?;

        let campaign = Campaign {
            id,
            name: row.name,
            description: row.description,
            aliases: load_values(self.conn, "campaign_aliases", "alias", &row.uuid)?,
            status,
            bucket_list: load_values(self.conn, "campaign_buckets", "bucket", &row.uuid)?,
            tickets: load_values(self.conn, "campaign_tickets", "ticket", &row.uuid)?,
            ttps: load_ttps(self.conn, &row.uuid)?,
            relationships: load_relationships(self.conn, id)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            modified_by: row.modified_by,
        };
        campaign.validate()?;
        Ok(campaign)
    }
}

fn write_child_rows(conn: &Connection, campaign: &Campaign) -> RepoResult<()> {
    let id_text = campaign.id.to_string();
    insert_values(conn, "campaign_aliases", "alias", &id_text, &campaign.aliases)?;
    insert_values(conn, "campaign_buckets", "bucket", &id_text, &campaign.bucket_list)?;
    insert_values(conn, "campaign_tickets", "ticket", &id_text, &campaign.tickets)?;

    for (position, ttp) in campaign.ttps.iter().enumerate() {
        conn.execute(
            "INSERT INTO campaign_ttps (campaign_uuid, position, ttp, analyst, date)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id_text,
                position as i64,
                ttp.ttp.as_str(),
                ttp.analyst.as_str(),
                ttp.date,
            ],
        )?;
    }
    Ok(())
}

fn insert_values(
    conn: &Connection,
    table: &'static str,
    column: &'static str,
    campaign_uuid: &str,
    values: &[String],
) -> RepoResult<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {table} (campaign_uuid, {column}) VALUES (?1, ?2);"
    );
    for value in values {
        conn.execute(&sql, params![campaign_uuid, value.as_str()])?;
    }
    Ok(())
}

fn load_values(
    conn: &Connection,
    table: &'static str,
    column: &'static str,
    campaign_uuid: &str,
) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column} FROM {table} WHERE campaign_uuid = ?1 ORDER BY {column} ASC;"
    ))?;
    let mut rows = stmt.query([campaign_uuid])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

fn load_ttps(conn: &Connection, campaign_uuid: &str) -> RepoResult<TtpList> {
    let mut stmt = conn.prepare(
        "SELECT ttp, analyst, date
         FROM campaign_ttps
         WHERE campaign_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([campaign_uuid])?;
    let mut ttps = TtpList::new();
    while let Some(row) = rows.next()? {
        ttps.add(EmbeddedTtp {
            ttp: row.get("ttp")?,
            analyst: row.get("analyst")?,
            date: row.get("date")?,
        });
    }
    Ok(ttps)
}
