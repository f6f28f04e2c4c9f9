//! Relationship vocabulary and edges between top-level objects.
//!
//! Edges are stored on both endpoints. The far side always holds the
//! inverse relationship type, so a `Contains` edge on A is mirrored by a
//! `Contained Within` edge on B.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Directional relationship type from the owning object's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    AttributedTo,
    Attributed,
    CompressedFrom,
    CompressedInto,
    ConnectedFrom,
    ConnectedTo,
    Contains,
    ContainedWithin,
    Created,
    CreatedBy,
    Downloaded,
    DownloadedBy,
    Dropped,
    DroppedBy,
    Installed,
    InstalledBy,
    Registered,
    RegisteredTo,
    RelatedTo,
    ResolvedTo,
    Sent,
    SentBy,
    SubdomainOf,
    SupradomainOf,
    Uses,
    UsedBy,
}

const RELATIONSHIP_TYPES: &[(RelationshipType, &str)] = &[
    (RelationshipType::AttributedTo, "Attributed To"),
    (RelationshipType::Attributed, "Attributed"),
    (RelationshipType::CompressedFrom, "Compressed From"),
    (RelationshipType::CompressedInto, "Compressed Into"),
    (RelationshipType::ConnectedFrom, "Connected From"),
    (RelationshipType::ConnectedTo, "Connected To"),
    (RelationshipType::Contains, "Contains"),
    (RelationshipType::ContainedWithin, "Contained Within"),
    (RelationshipType::Created, "Created"),
    (RelationshipType::CreatedBy, "Created By"),
    (RelationshipType::Downloaded, "Downloaded"),
    (RelationshipType::DownloadedBy, "Downloaded By"),
    (RelationshipType::Dropped, "Dropped"),
    (RelationshipType::DroppedBy, "Dropped By"),
    (RelationshipType::Installed, "Installed"),
    (RelationshipType::InstalledBy, "Installed By"),
    (RelationshipType::Registered, "Registered"),
    (RelationshipType::RegisteredTo, "Registered To"),
    (RelationshipType::RelatedTo, "Related To"),
    (RelationshipType::ResolvedTo, "Resolved To"),
    (RelationshipType::Sent, "Sent"),
    (RelationshipType::SentBy, "Sent By"),
    (RelationshipType::SubdomainOf, "Sub-domain Of"),
    (RelationshipType::SupradomainOf, "Supra-domain Of"),
    (RelationshipType::Uses, "Uses"),
    (RelationshipType::UsedBy, "Used By"),
];

impl RelationshipType {
    /// Stable vocabulary string, also used as the storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttributedTo => "Attributed To",
            Self::Attributed => "Attributed",
            Self::CompressedFrom => "Compressed From",
            Self::CompressedInto => "Compressed Into",
            Self::ConnectedFrom => "Connected From",
            Self::ConnectedTo => "Connected To",
            Self::Contains => "Contains",
            Self::ContainedWithin => "Contained Within",
            Self::Created => "Created",
            Self::CreatedBy => "Created By",
            Self::Downloaded => "Downloaded",
            Self::DownloadedBy => "Downloaded By",
            Self::Dropped => "Dropped",
            Self::DroppedBy => "Dropped By",
            Self::Installed => "Installed",
            Self::InstalledBy => "Installed By",
            Self::Registered => "Registered",
            Self::RegisteredTo => "Registered To",
            Self::RelatedTo => "Related To",
            Self::ResolvedTo => "Resolved To",
            Self::Sent => "Sent",
            Self::SentBy => "Sent By",
            Self::SubdomainOf => "Sub-domain Of",
            Self::SupradomainOf => "Supra-domain Of",
            Self::Uses => "Uses",
            Self::UsedBy => "Used By",
        }
    }

    /// Parses one vocabulary string, case-insensitive.
    pub fn parse(value: &str) -> Result<Self, RelationshipParseError> {
        let normalized = value.trim();
        RELATIONSHIP_TYPES
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(normalized))
            .map(|(kind, _)| *kind)
            .ok_or_else(|| RelationshipParseError(value.to_string()))
    }

    /// Relationship type as seen from the other endpoint.
    pub fn inverse(self) -> Self {
        match self {
            Self::AttributedTo => Self::Attributed,
            Self::Attributed => Self::AttributedTo,
            Self::CompressedFrom => Self::CompressedInto,
            Self::CompressedInto => Self::CompressedFrom,
            Self::ConnectedFrom => Self::ConnectedTo,
            Self::ConnectedTo => Self::ConnectedFrom,
            Self::Contains => Self::ContainedWithin,
            Self::ContainedWithin => Self::Contains,
            Self::Created => Self::CreatedBy,
            Self::CreatedBy => Self::Created,
            Self::Downloaded => Self::DownloadedBy,
            Self::DownloadedBy => Self::Downloaded,
            Self::Dropped => Self::DroppedBy,
            Self::DroppedBy => Self::Dropped,
            Self::Installed => Self::InstalledBy,
            Self::InstalledBy => Self::Installed,
            Self::Registered => Self::RegisteredTo,
            Self::RegisteredTo => Self::Registered,
            Self::RelatedTo => Self::RelatedTo,
            Self::ResolvedTo => Self::ResolvedTo,
            Self::Sent => Self::SentBy,
            Self::SentBy => Self::Sent,
            Self::SubdomainOf => Self::SupradomainOf,
            Self::SupradomainOf => Self::SubdomainOf,
            Self::Uses => Self::UsedBy,
            Self::UsedBy => Self::Uses,
        }
    }
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input value that is not part of the relationship vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipParseError(pub String);

impl Display for RelationshipParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported relationship type `{}`", self.0)
    }
}

impl Error for RelationshipParseError {}

/// One outgoing edge held by a top-level object or campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Id of the object on the far side.
    pub object_id: Uuid,
    /// Type tag of the far-side object. Not restricted to attributable
    /// kinds; campaigns are tagged `Campaign`.
    pub rel_type: String,
    pub relationship: RelationshipType,
    pub analyst: String,
    /// Epoch milliseconds.
    pub date: i64,
}
