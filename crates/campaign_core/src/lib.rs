//! Campaign registry and attribution engine for threat-intelligence records.
//! This crate is the single source of truth for attribution invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attribution::{
    CampaignList, Confidence, EmbedOutcome, EmbeddedCampaign, MergePolicy, NewAttribution,
};
pub use model::campaign::{AliasInput, Campaign, CampaignId, CampaignStatus, EmbeddedTtp};
pub use model::object::{ObjectId, ObjectRef, ObjectType, TopLevelObject};
pub use model::relationship::{Relationship, RelationshipType};
pub use repo::campaign_repo::{CampaignRepository, SqliteCampaignRepository};
pub use repo::object_repo::{ObjectRepository, SqliteObjectRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attribution_service::{
    AttributionError, AttributionReport, AttributionRequest, AttributionService,
    EditAttributionRequest,
};
pub use service::campaign_service::{
    CampaignService, CampaignServiceError, NewCampaignRequest, RelatedObject,
};
pub use service::propagation::{PropagationOutcome, PropagationStatus, SkipReason};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
