//! Campaign attribution use-case service.
//!
//! # Responsibility
//! - Attach, edit and remove campaign attributions on top-level objects.
//! - Optionally fan a new or edited attribution out to related objects.
//!
//! # Invariants
//! - Target resolution failures (`ObjectNotFound`) are distinct from missing
//!   attribution entries (`AttributionNotFound`).
//! - Propagation runs only after the target's list was updated, and before
//!   the target itself is saved.
//! - The overall result depends only on the target's own save; propagation
//!   outcomes are reported, never raised.

use crate::model::attribution::{
    Confidence, EmbedOutcome, EmbeddedCampaign, MergePolicy, NewAttribution,
};
use crate::model::now_epoch_ms;
use crate::model::object::{ObjectRef, TopLevelObject};
use crate::repo::object_repo::ObjectRepository;
use crate::repo::RepoError;
use crate::service::propagation::{propagate, PropagationOutcome};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from attribution operations.
#[derive(Debug)]
pub enum AttributionError {
    /// Request is unusable before any lookup (e.g. blank campaign name).
    InvalidRequest(&'static str),
    /// Target object does not exist.
    ObjectNotFound(ObjectRef),
    /// Target exists but holds no attribution for this campaign name.
    AttributionNotFound { object: ObjectRef, campaign: String },
    /// Store rejected the target on save.
    ValidationFailed { detail: String },
    /// Internal consistency mismatch between mutation and read-back.
    InconsistentState(&'static str),
    /// Storage failure.
    Repo(RepoError),
}

impl Display for AttributionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(message) => write!(f, "invalid attribution request: {message}"),
            Self::ObjectNotFound(object) => write!(f, "cannot find {}: {}", object.kind, object.id),
            Self::AttributionNotFound { object, campaign } => write!(
                f,
                "campaign `{campaign}` is not attributed to {}: {}",
                object.kind, object.id
            ),
            Self::ValidationFailed { detail } => write!(f, "invalid value: {detail}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent attribution state: {details}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttributionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

/// Object to attribute: already loaded by the caller, or looked up by ref.
#[derive(Debug, Clone)]
pub enum AttributionTarget {
    Loaded(TopLevelObject),
    Ref(ObjectRef),
}

impl From<ObjectRef> for AttributionTarget {
    fn from(value: ObjectRef) -> Self {
        Self::Ref(value)
    }
}

impl From<TopLevelObject> for AttributionTarget {
    fn from(value: TopLevelObject) -> Self {
        Self::Loaded(value)
    }
}

/// Request model for attributing a campaign.
#[derive(Debug, Clone)]
pub struct AttributionRequest {
    pub target: AttributionTarget,
    pub campaign: String,
    pub confidence: Confidence,
    pub description: String,
    pub analyst: String,
    /// Fan the attribution out to directly related objects.
    pub propagate: bool,
    pub merge: MergePolicy,
}

impl AttributionRequest {
    /// Request with empty description, no propagation and merge enabled.
    pub fn new(
        target: impl Into<AttributionTarget>,
        campaign: impl Into<String>,
        confidence: Confidence,
        analyst: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            campaign: campaign.into(),
            confidence,
            description: String::new(),
            analyst: analyst.into(),
            propagate: false,
            merge: MergePolicy::Merge,
        }
    }
}

/// Request model for editing an existing attribution.
#[derive(Debug, Clone)]
pub struct EditAttributionRequest {
    pub object: ObjectRef,
    pub campaign: String,
    pub confidence: Confidence,
    pub description: String,
    /// New attribution date in epoch milliseconds; `None` means now.
    pub date: Option<i64>,
    pub analyst: String,
    pub propagate: bool,
}

/// Resulting attribution entry echoed back to UI callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributionReport {
    pub object: ObjectRef,
    pub entry: EmbeddedCampaign,
    pub outcome: EmbedOutcome,
    /// Empty when propagation was not requested.
    pub propagation: Vec<PropagationOutcome>,
}

/// Attribution engine over an object repository.
pub struct AttributionService<R: ObjectRepository> {
    repo: R,
}

impl<R: ObjectRepository> AttributionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Attributes a campaign to one object, merging by campaign name.
    ///
    /// With `MergePolicy::KeepExisting` an existing entry is left as is and
    /// the call still succeeds with `EmbedOutcome::Unchanged`. Propagation
    /// always fans out the requested values credited to the caller.
    pub fn attribute(
        &self,
        request: AttributionRequest,
    ) -> Result<AttributionReport, AttributionError> {
        if request.campaign.trim().is_empty() {
            return Err(AttributionError::InvalidRequest(
                "campaign name must not be blank",
            ));
        }

        let mut object = self.load_target(request.target)?;
        let now = now_epoch_ms();
        let attribution = NewAttribution::new(
            request.campaign.as_str(),
            request.confidence,
            request.description,
            request.analyst.as_str(),
        );
        let outcome = object.campaigns.embed(&attribution, now, request.merge);
        let entry = object
            .campaigns
            .get(request.campaign.as_str())
            .cloned()
            .ok_or(AttributionError::InconsistentState(
                "attribution missing after embed",
            ))?;

        // Related objects receive the caller's values, whatever the target's
        // merge kept.
        let propagation = if request.propagate {
            propagate(&self.repo, &object, &attribution, now, &request.analyst)
        } else {
            Vec::new()
        };

        self.save(&object, &request.analyst, "attribution_add")?;
        info!(
            "event=attribution_add module=attribution status=ok object={} outcome={:?} propagated={}",
            object.object_ref(),
            outcome,
            propagation.len()
        );

        Ok(AttributionReport {
            object: object.object_ref(),
            entry,
            outcome,
            propagation,
        })
    }

    /// Replaces confidence, description, date and analyst of an existing
    /// attribution.
    pub fn edit(
        &self,
        request: EditAttributionRequest,
    ) -> Result<AttributionReport, AttributionError> {
        let mut object = self.resolve(request.object)?;
        let replacement = EmbeddedCampaign {
            name: request.campaign.clone(),
            confidence: request.confidence,
            description: request.description,
            analyst: request.analyst.clone(),
            date: request.date.unwrap_or_else(now_epoch_ms),
        };
        let entry = object
            .campaigns
            .replace(replacement)
            .cloned()
            .ok_or_else(|| AttributionError::AttributionNotFound {
                object: request.object,
                campaign: request.campaign.clone(),
            })?;

        let propagation = if request.propagate {
            propagate(
                &self.repo,
                &object,
                &NewAttribution::from_entry(&entry),
                entry.date,
                &request.analyst,
            )
        } else {
            Vec::new()
        };

        self.save(&object, &request.analyst, "attribution_edit")?;
        info!(
            "event=attribution_edit module=attribution status=ok object={} propagated={}",
            request.object,
            propagation.len()
        );

        Ok(AttributionReport {
            object: request.object,
            entry,
            outcome: EmbedOutcome::Replaced,
            propagation,
        })
    }

    /// Removes the attribution for `campaign` from one object.
    ///
    /// Removing a campaign that is not attributed is an error.
    pub fn remove(
        &self,
        object_ref: ObjectRef,
        campaign: &str,
        analyst: &str,
    ) -> Result<EmbeddedCampaign, AttributionError> {
        let mut object = self.resolve(object_ref)?;
        let removed = object.campaigns.remove(campaign).ok_or_else(|| {
            AttributionError::AttributionNotFound {
                object: object_ref,
                campaign: campaign.to_string(),
            }
        })?;

        self.save(&object, analyst, "attribution_remove")?;
        info!("event=attribution_remove module=attribution status=ok object={object_ref}");
        Ok(removed)
    }

    /// Lists current attributions of one object.
    pub fn attributions(
        &self,
        object_ref: ObjectRef,
    ) -> Result<Vec<EmbeddedCampaign>, AttributionError> {
        let object = self.resolve(object_ref)?;
        Ok(object.campaigns.iter().cloned().collect())
    }

    fn load_target(&self, target: AttributionTarget) -> Result<TopLevelObject, AttributionError> {
        match target {
            AttributionTarget::Loaded(object) => Ok(object),
            AttributionTarget::Ref(object_ref) => self.resolve(object_ref),
        }
    }

    fn resolve(&self, object_ref: ObjectRef) -> Result<TopLevelObject, AttributionError> {
        self.repo
            .resolve(object_ref)
            .map_err(AttributionError::Repo)?
            .ok_or(AttributionError::ObjectNotFound(object_ref))
    }

    fn save(
        &self,
        object: &TopLevelObject,
        analyst: &str,
        event: &'static str,
    ) -> Result<(), AttributionError> {
        self.repo.save_object(object, analyst).map_err(|err| {
            warn!(
                "event={event} module=attribution status=error object={} error={err}",
                object.object_ref()
            );
            match err {
                RepoError::NotFound(_) => AttributionError::ObjectNotFound(object.object_ref()),
                err if err.is_validation() => AttributionError::ValidationFailed {
                    detail: err.to_string(),
                },
                err => AttributionError::Repo(err),
            }
        })
    }
}
