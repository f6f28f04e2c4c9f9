//! One-hop attribution propagation across relationship edges.
//!
//! # Invariants
//! - Only direct relationships of the source are visited; related objects'
//!   own edges are never followed.
//! - Edges are visited in the source's relationship-list order and saved
//!   sequentially.
//! - A failure on one related object never aborts the remaining fan-out and
//!   never rolls back earlier saves.

use crate::model::attribution::{EmbedOutcome, MergePolicy, NewAttribution};
use crate::model::object::{ObjectRef, ObjectType, TopLevelObject};
use crate::repo::object_repo::ObjectRepository;
use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

/// Why a relationship edge was not attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Edge type tag is not an attributable object kind.
    UnknownType,
    /// No object with this id and type exists.
    Unresolvable,
}

/// Result for one visited edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PropagationStatus {
    Added,
    Merged,
    Unchanged,
    Skipped { reason: SkipReason },
    Failed { detail: String },
}

impl PropagationStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Added | Self::Merged | Self::Unchanged)
    }
}

/// Per-edge propagation record, in edge order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationOutcome {
    pub rel_type: String,
    pub object_id: Uuid,
    #[serde(flatten)]
    pub status: PropagationStatus,
}

/// Attributes `attribution` to every object directly related to `source`.
///
/// Related objects are merged by campaign name (`MergePolicy::Merge`) and
/// saved one by one as `analyst`. Nothing is returned as an error: skips and
/// save failures are reported in the outcome list and logged.
pub fn propagate<R: ObjectRepository + ?Sized>(
    repo: &R,
    source: &TopLevelObject,
    attribution: &NewAttribution,
    now: i64,
    analyst: &str,
) -> Vec<PropagationOutcome> {
    source
        .relationships
        .iter()
        .map(|edge| PropagationOutcome {
            rel_type: edge.rel_type.clone(),
            object_id: edge.object_id,
            status: propagate_one(repo, &edge.rel_type, edge.object_id, attribution, now, analyst),
        })
        .collect()
}

fn propagate_one<R: ObjectRepository + ?Sized>(
    repo: &R,
    rel_type: &str,
    object_id: Uuid,
    attribution: &NewAttribution,
    now: i64,
    analyst: &str,
) -> PropagationStatus {
    let Some(kind) = ObjectType::from_tag(rel_type) else {
        debug!(
            "event=propagation_target module=propagation status=skipped reason=unknown_type object_id={object_id}"
        );
        return PropagationStatus::Skipped {
            reason: SkipReason::UnknownType,
        };
    };

    let object_ref = ObjectRef::new(kind, object_id);
    let mut related = match repo.resolve(object_ref) {
        Ok(Some(related)) => related,
        Ok(None) => {
            debug!(
                "event=propagation_target module=propagation status=skipped reason=unresolvable object={object_ref}"
            );
            return PropagationStatus::Skipped {
                reason: SkipReason::Unresolvable,
            };
        }
        Err(err) => {
            warn!(
                "event=propagation_target module=propagation status=skipped reason=unresolvable object={object_ref} error={err}"
            );
            return PropagationStatus::Skipped {
                reason: SkipReason::Unresolvable,
            };
        }
    };

    let outcome = related
        .campaigns
        .embed(attribution, now, MergePolicy::Merge);

    if let Err(err) = repo.save_object(&related, analyst) {
        warn!(
            "event=propagation_target module=propagation status=failed object={object_ref} error={err}"
        );
        return PropagationStatus::Failed {
            detail: err.to_string(),
        };
    }

    debug!("event=propagation_target module=propagation status=ok object={object_ref}");
    match outcome {
        EmbedOutcome::Added => PropagationStatus::Added,
        EmbedOutcome::Merged | EmbedOutcome::Replaced => PropagationStatus::Merged,
        EmbedOutcome::Unchanged => PropagationStatus::Unchanged,
    }
}
