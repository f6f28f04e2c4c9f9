//! Top-level intelligence objects that can carry campaign attributions.
//!
//! # Responsibility
//! - Define the closed set of attributable object kinds and their type tags.
//! - Define the per-kind validation applied before every save.
//!
//! # Invariants
//! - `ObjectType::from_tag` is the only path from a stored type tag to a
//!   kind; unknown tags resolve to `None`.
//! - `TopLevelObject::validate()` must pass before persistence.

use crate::model::attribution::CampaignList;
use crate::model::relationship::Relationship;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use uuid::Uuid;

/// Stable identifier of one top-level object.
pub type ObjectId = Uuid;

/// Type tag stored on relationship edges that point at a campaign.
pub const CAMPAIGN_TYPE_TAG: &str = "Campaign";

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[a-z0-9_](?:[a-z0-9_-]{0,62}[a-z0-9_])?(?:\.[a-z0-9_](?:[a-z0-9_-]{0,62}[a-z0-9_])?)+\.?$")
        .expect("valid domain regex")
});

/// Attributable top-level object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Actor,
    Backdoor,
    Domain,
    Email,
    Event,
    Exploit,
    Indicator,
    #[serde(rename = "IP")]
    Ip,
    #[serde(rename = "PCAP")]
    Pcap,
    Sample,
    Target,
}

const OBJECT_TYPES: &[ObjectType] = &[
    ObjectType::Actor,
    ObjectType::Backdoor,
    ObjectType::Domain,
    ObjectType::Email,
    ObjectType::Event,
    ObjectType::Exploit,
    ObjectType::Indicator,
    ObjectType::Ip,
    ObjectType::Pcap,
    ObjectType::Sample,
    ObjectType::Target,
];

impl ObjectType {
    /// Every attributable kind, sorted by tag.
    pub fn all() -> &'static [ObjectType] {
        OBJECT_TYPES
    }

    /// Stable type tag used in storage and on relationship edges.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Actor => "Actor",
            Self::Backdoor => "Backdoor",
            Self::Domain => "Domain",
            Self::Email => "Email",
            Self::Event => "Event",
            Self::Exploit => "Exploit",
            Self::Indicator => "Indicator",
            Self::Ip => "IP",
            Self::Pcap => "PCAP",
            Self::Sample => "Sample",
            Self::Target => "Target",
        }
    }

    /// Resolves one type tag. Tags are matched exactly.
    pub fn from_tag(tag: &str) -> Option<Self> {
        OBJECT_TYPES.iter().copied().find(|kind| kind.tag() == tag)
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Typed reference to one top-level object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectType,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(kind: ObjectType, id: ObjectId) -> Self {
        Self { kind, id }
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Validation failures for top-level objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectValidationError {
    /// Object value is blank after trim.
    EmptyValue(ObjectType),
    /// IP object value does not parse as an IPv4/IPv6 address.
    InvalidIp(String),
    /// Domain object value is not a dotted host name.
    InvalidDomain(String),
    /// An embedded attribution has a blank campaign name.
    EmptyCampaignName,
}

impl Display for ObjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue(kind) => write!(f, "{kind} value must not be blank"),
            Self::InvalidIp(value) => write!(f, "invalid IP address `{value}`"),
            Self::InvalidDomain(value) => write!(f, "invalid domain name `{value}`"),
            Self::EmptyCampaignName => write!(f, "campaign name must not be blank"),
        }
    }
}

impl Error for ObjectValidationError {}

/// Canonical record for any attributable intelligence object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopLevelObject {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    /// Primary value (indicator text, domain name, sample hash, ...).
    pub value: String,
    pub campaigns: CampaignList,
    /// Loaded for propagation; not written back by `save_object`.
    pub relationships: Vec<Relationship>,
    /// Epoch milliseconds of the last save.
    pub updated_at: i64,
    /// Analyst of the last save.
    pub modified_by: Option<String>,
}

impl TopLevelObject {
    /// Creates a new object with a generated stable ID.
    pub fn new(kind: ObjectType, value: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, value)
    }

    /// Creates a new object with a caller-provided stable ID.
    pub fn with_id(id: ObjectId, kind: ObjectType, value: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            value: value.into(),
            campaigns: CampaignList::new(),
            relationships: Vec::new(),
            updated_at: 0,
            modified_by: None,
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind, self.id)
    }

    /// Validates kind-specific value rules and embedded attributions.
    pub fn validate(&self) -> Result<(), ObjectValidationError> {
        let value = self.value.trim();
        if value.is_empty() {
            return Err(ObjectValidationError::EmptyValue(self.kind));
        }

        match self.kind {
            ObjectType::Ip => {
                if value.parse::<IpAddr>().is_err() {
                    return Err(ObjectValidationError::InvalidIp(self.value.clone()));
                }
            }
            ObjectType::Domain => {
                if !DOMAIN_RE.is_match(value) {
                    return Err(ObjectValidationError::InvalidDomain(self.value.clone()));
                }
            }
            _ => {}
        }

        if self
            .campaigns
            .iter()
            .any(|entry| entry.name.trim().is_empty())
        {
            return Err(ObjectValidationError::EmptyCampaignName);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ObjectType, ObjectValidationError, TopLevelObject};
    use crate::model::attribution::{Confidence, MergePolicy, NewAttribution};

    #[test]
    fn tags_roundtrip_and_unknown_tags_resolve_to_none() {
        for kind in ObjectType::all() {
            assert_eq!(ObjectType::from_tag(kind.tag()), Some(*kind));
        }
        assert_eq!(ObjectType::from_tag("Campaign"), None);
        assert_eq!(ObjectType::from_tag("ip"), None);
    }

    #[test]
    fn ip_objects_require_parsable_addresses() {
        assert!(TopLevelObject::new(ObjectType::Ip, "10.0.0.1")
            .validate()
            .is_ok());
        assert!(TopLevelObject::new(ObjectType::Ip, "2001:db8::1")
            .validate()
            .is_ok());
        assert!(matches!(
            TopLevelObject::new(ObjectType::Ip, "10.0.0.300").validate(),
            Err(ObjectValidationError::InvalidIp(_))
        ));
    }

    #[test]
    fn domain_objects_reject_whitespace_and_bare_labels() {
        assert!(TopLevelObject::new(ObjectType::Domain, "evil.example.com")
            .validate()
            .is_ok());
        assert!(TopLevelObject::new(ObjectType::Domain, "evil example.com")
            .validate()
            .is_err());
        assert!(TopLevelObject::new(ObjectType::Domain, "localhost")
            .validate()
            .is_err());
    }

    #[test]
    fn blank_values_and_blank_campaign_names_are_rejected() {
        assert_eq!(
            TopLevelObject::new(ObjectType::Sample, "  ").validate(),
            Err(ObjectValidationError::EmptyValue(ObjectType::Sample))
        );

        let mut object = TopLevelObject::new(ObjectType::Indicator, "bad.exe");
        object.campaigns.embed(
            &NewAttribution::new(" ", Confidence::Low, "", "alice"),
            1,
            MergePolicy::Merge,
        );
        assert_eq!(
            object.validate(),
            Err(ObjectValidationError::EmptyCampaignName)
        );
    }
}
