//! Campaign registry use-case service.
//!
//! # Responsibility
//! - Create, remove and transition campaigns.
//! - Maintain aliases, description and TTP notes.
//! - Link a new campaign to an existing object in the same save.
//!
//! # Invariants
//! - Creating an existing name fails and never touches the existing record.
//! - Removal never cleans up attributions held by other objects.
//! - Status transitions carry no state-machine guard; repeating one succeeds.

use crate::model::campaign::{AliasInput, Campaign, CampaignId, CampaignStatus, EmbeddedTtp};
use crate::model::now_epoch_ms;
use crate::model::object::ObjectRef;
use crate::model::relationship::RelationshipType;
use crate::repo::campaign_repo::{CampaignLink, CampaignRepository};
use crate::repo::object_repo::ObjectRepository;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from campaign registry operations.
#[derive(Debug)]
pub enum CampaignServiceError {
    /// A campaign with this exact name exists.
    AlreadyExists { name: String, id: Option<CampaignId> },
    /// No campaign with this name.
    NotFound(String),
    /// No campaign with this id.
    IdNotFound(CampaignId),
    /// Object named as relationship partner on create does not exist.
    RelatedObjectNotFound(ObjectRef),
    /// Campaign holds no TTP with this text.
    TtpNotFound(String),
    /// Store rejected the campaign on save.
    ValidationFailed { detail: String },
    /// Storage failure.
    Repo(RepoError),
}

impl Display for CampaignServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyExists { name, .. } => write!(f, "campaign already exists: {name}"),
            Self::NotFound(name) => write!(f, "campaign not found: {name}"),
            Self::IdNotFound(id) => write!(f, "could not find campaign: {id}"),
            Self::RelatedObjectNotFound(object) => {
                write!(f, "related object not found: {object}")
            }
            Self::TtpNotFound(ttp) => write!(f, "TTP not found: `{ttp}`"),
            Self::ValidationFailed { detail } => write!(f, "invalid value: {detail}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CampaignServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CampaignServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateName(name) => Self::AlreadyExists { name, id: None },
            RepoError::NotFound(id) => Self::IdNotFound(id),
            err if err.is_validation() => Self::ValidationFailed {
                detail: err.to_string(),
            },
            other => Self::Repo(other),
        }
    }
}

/// Object to relate a new campaign to.
///
/// `relationship` is named from the related object's perspective
/// (e.g. the indicator `Attributed To` the campaign); the campaign stores
/// the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedObject {
    pub object: ObjectRef,
    pub relationship: RelationshipType,
}

/// Request model for creating one campaign.
#[derive(Debug, Clone, Default)]
pub struct NewCampaignRequest {
    pub name: String,
    pub description: String,
    pub aliases: AliasInput,
    pub bucket_list: Option<AliasInput>,
    pub tickets: Option<AliasInput>,
    pub related: Option<RelatedObject>,
    pub analyst: String,
}

impl NewCampaignRequest {
    pub fn new(name: impl Into<String>, analyst: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyst: analyst.into(),
            ..Self::default()
        }
    }
}

/// Campaign registry facade over campaign and object repositories.
pub struct CampaignService<C: CampaignRepository, O: ObjectRepository> {
    campaigns: C,
    objects: O,
}

impl<C: CampaignRepository, O: ObjectRepository> CampaignService<C, O> {
    pub fn new(campaigns: C, objects: O) -> Self {
        Self { campaigns, objects }
    }

    /// Creates one campaign and returns its stable id.
    ///
    /// When `related` is set, the relationship edges are written in the
    /// same transaction as the campaign row.
    pub fn create(&self, request: NewCampaignRequest) -> Result<CampaignId, CampaignServiceError> {
        if let Some(existing) = self.campaigns.find_by_name(&request.name)? {
            return Err(CampaignServiceError::AlreadyExists {
                name: request.name,
                id: Some(existing.id),
            });
        }

        let mut campaign = Campaign::new(request.name);
        campaign.description = request.description;
        campaign.add_aliases(&request.aliases);
        if let Some(buckets) = &request.bucket_list {
            campaign.add_buckets(buckets);
        }
        if let Some(tickets) = &request.tickets {
            campaign.add_tickets(tickets);
        }

        let link = match request.related {
            Some(related) => {
                if self.objects.resolve(related.object)?.is_none() {
                    return Err(CampaignServiceError::RelatedObjectNotFound(related.object));
                }
                Some(CampaignLink {
                    object: related.object,
                    relationship: related.relationship.inverse(),
                })
            }
            None => None,
        };

        let id = self
            .campaigns
            .insert_campaign(&campaign, link.as_ref(), &request.analyst)
            .map_err(|err| match (err, link) {
                (RepoError::NotFound(_), Some(link)) => {
                    CampaignServiceError::RelatedObjectNotFound(link.object)
                }
                (err, _) => {
                    warn!("event=campaign_create module=campaign status=error error={err}");
                    CampaignServiceError::from(err)
                }
            })?;

        info!(
            "event=campaign_create module=campaign status=ok campaign_id={} related={}",
            id,
            link.is_some()
        );
        Ok(id)
    }

    /// Hard-deletes the campaign named `name`.
    ///
    /// No row survives the delete, so the removed record is returned with
    /// `modified_by` set to `analyst` for the caller's audit trail.
    pub fn remove(&self, name: &str, analyst: &str) -> Result<Campaign, CampaignServiceError> {
        let mut campaign = self.require_by_name(name)?;
        self.campaigns.delete_campaign(campaign.id)?;
        campaign.modified_by = Some(analyst.to_string());
        info!(
            "event=campaign_remove module=campaign status=ok campaign_id={} analyst={}",
            campaign.id, analyst
        );
        Ok(campaign)
    }

    /// Marks a campaign `Analyzed`.
    pub fn activate(&self, name: &str, analyst: &str) -> Result<(), CampaignServiceError> {
        self.set_status(name, CampaignStatus::Analyzed, analyst)
    }

    /// Marks a campaign `Deprecated`, hiding it from active listings.
    pub fn deactivate(&self, name: &str, analyst: &str) -> Result<(), CampaignServiceError> {
        self.set_status(name, CampaignStatus::Deprecated, analyst)
    }

    pub fn set_status(
        &self,
        name: &str,
        status: CampaignStatus,
        analyst: &str,
    ) -> Result<(), CampaignServiceError> {
        self.modify_by_name(name, analyst, "campaign_status", |campaign| {
            campaign.status = status;
        })
    }

    /// Replaces the alias set.
    pub fn set_aliases(
        &self,
        name: &str,
        aliases: &AliasInput,
        analyst: &str,
    ) -> Result<(), CampaignServiceError> {
        self.modify_by_name(name, analyst, "campaign_aliases", |campaign| {
            campaign.set_aliases(aliases);
        })
    }

    pub fn edit_description(
        &self,
        name: &str,
        description: &str,
        analyst: &str,
    ) -> Result<(), CampaignServiceError> {
        self.modify_by_name(name, analyst, "campaign_description", |campaign| {
            campaign.description = description.to_string();
        })
    }

    /// Appends one TTP note. Adding text that is already present changes
    /// nothing.
    pub fn add_ttp(
        &self,
        id: CampaignId,
        ttp: &str,
        analyst: &str,
    ) -> Result<Campaign, CampaignServiceError> {
        let mut campaign = self.require_by_id(id)?;
        campaign.ttps.add(EmbeddedTtp {
            ttp: ttp.to_string(),
            analyst: analyst.to_string(),
            date: now_epoch_ms(),
        });
        self.save(&campaign, analyst, "campaign_ttp_add")?;
        Ok(campaign)
    }

    /// Rewrites the text of the TTP equal to `old_ttp`.
    pub fn edit_ttp(
        &self,
        id: CampaignId,
        old_ttp: &str,
        new_ttp: &str,
        analyst: &str,
    ) -> Result<Campaign, CampaignServiceError> {
        let mut campaign = self.require_by_id(id)?;
        if !campaign.ttps.edit(old_ttp, new_ttp) {
            return Err(CampaignServiceError::TtpNotFound(old_ttp.to_string()));
        }
        self.save(&campaign, analyst, "campaign_ttp_edit")?;
        Ok(campaign)
    }

    /// Removes the TTP equal to `ttp`.
    pub fn remove_ttp(
        &self,
        id: CampaignId,
        ttp: &str,
        analyst: &str,
    ) -> Result<Campaign, CampaignServiceError> {
        let mut campaign = self.require_by_id(id)?;
        if campaign.ttps.remove(ttp).is_none() {
            return Err(CampaignServiceError::TtpNotFound(ttp.to_string()));
        }
        self.save(&campaign, analyst, "campaign_ttp_remove")?;
        Ok(campaign)
    }

    /// Exact-match lookup by name.
    pub fn get(&self, name: &str) -> RepoResult<Option<Campaign>> {
        self.campaigns.find_by_name(name)
    }

    pub fn get_by_id(&self, id: CampaignId) -> RepoResult<Option<Campaign>> {
        self.campaigns.get_campaign(id)
    }

    /// Sorted campaign names; `active_only` drops deprecated campaigns.
    pub fn list_names(&self, active_only: bool) -> RepoResult<Vec<String>> {
        self.campaigns.list_names(active_only)
    }

    /// Objects currently attributed to the campaign name.
    ///
    /// Works for names whose campaign was removed, since attributions are
    /// not cleaned up on removal.
    pub fn attributed_objects(&self, name: &str) -> RepoResult<Vec<ObjectRef>> {
        self.objects.list_by_campaign(name)
    }

    fn modify_by_name(
        &self,
        name: &str,
        analyst: &str,
        event: &'static str,
        mutate: impl FnOnce(&mut Campaign),
    ) -> Result<(), CampaignServiceError> {
        let mut campaign = self.require_by_name(name)?;
        mutate(&mut campaign);
        self.save(&campaign, analyst, event)
    }

    fn require_by_name(&self, name: &str) -> Result<Campaign, CampaignServiceError> {
        self.campaigns
            .find_by_name(name)?
            .ok_or_else(|| CampaignServiceError::NotFound(name.to_string()))
    }

    fn require_by_id(&self, id: CampaignId) -> Result<Campaign, CampaignServiceError> {
        self.campaigns
            .get_campaign(id)?
            .ok_or(CampaignServiceError::IdNotFound(id))
    }

    fn save(
        &self,
        campaign: &Campaign,
        analyst: &str,
        event: &'static str,
    ) -> Result<(), CampaignServiceError> {
        match self.campaigns.update_campaign(campaign, analyst) {
            Ok(()) => {
                info!(
                    "event={} module=campaign status=ok campaign_id={}",
                    event, campaign.id
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event={} module=campaign status=error campaign_id={} error={}",
                    event, campaign.id, err
                );
                Err(err.into())
            }
        }
    }
}
