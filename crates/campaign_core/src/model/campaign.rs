//! Campaign registry model.
//!
//! # Responsibility
//! - Define the `Campaign` record, its status lifecycle and TTP notes.
//! - Normalize alias, bucket and ticket inputs.
//!
//! # Invariants
//! - `name` is the exact, case-sensitive unique key of a campaign.
//! - `aliases`, `bucket_list` and `tickets` are trimmed, blank-free and
//!   deduplicated.
//! - A `TtpList` never holds two notes with the same text.

use crate::model::relationship::Relationship;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one campaign.
pub type CampaignId = Uuid;

/// Analysis lifecycle of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    New,
    InProgress,
    Analyzed,
    Deprecated,
}

impl CampaignStatus {
    /// Stable storage identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Analyzed => "analyzed",
            Self::Deprecated => "deprecated",
        }
    }

    /// Parses a storage identifier.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "analyzed" => Some(Self::Analyzed),
            "deprecated" => Some(Self::Deprecated),
            _ => None,
        }
    }

    /// Label shown by listing filters.
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Analyzed => "Analyzed",
            Self::Deprecated => "Deprecated",
        }
    }

    /// Whether campaigns in this state appear in active listings.
    pub fn is_active(self) -> bool {
        self != Self::Deprecated
    }
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Alias input accepted from form fields or API callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasInput {
    /// Comma-separated values, e.g. `"a, b ,c"`.
    Csv(String),
    List(Vec<String>),
}

impl Default for AliasInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<&str> for AliasInput {
    fn from(value: &str) -> Self {
        Self::Csv(value.to_string())
    }
}

impl From<Vec<String>> for AliasInput {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl AliasInput {
    /// Trimmed, blank-free, deduplicated values in sorted order.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Self::Csv(text) => normalize_values(text.split(',')),
            Self::List(values) => normalize_values(values.iter().map(String::as_str)),
        }
    }
}

/// Trims values, drops blanks and deduplicates.
pub fn normalize_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let unique: BTreeSet<String> = values
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    unique.into_iter().collect()
}

/// Free-text tactic/technique/procedure note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedTtp {
    pub ttp: String,
    pub analyst: String,
    /// Epoch milliseconds.
    pub date: i64,
}

/// Ordered TTP notes keyed by text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EmbeddedTtp>", into = "Vec<EmbeddedTtp>")]
pub struct TtpList {
    entries: Vec<EmbeddedTtp>,
    index: HashMap<String, usize>,
}

impl TtpList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, ttp: &str) -> bool {
        self.index.contains_key(ttp)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedTtp> {
        self.entries.iter()
    }

    /// Appends one note. Returns `false` when the text is already present.
    pub fn add(&mut self, ttp: EmbeddedTtp) -> bool {
        if self.contains(ttp.ttp.as_str()) {
            return false;
        }
        self.index.insert(ttp.ttp.clone(), self.entries.len());
        self.entries.push(ttp);
        true
    }

    /// Rewrites the text of one note in place.
    ///
    /// Returns `false` when `old` is missing. When `new` already exists as
    /// another note, the edited note is dropped so the key stays unique.
    pub fn edit(&mut self, old: &str, new: &str) -> bool {
        let Some(&position) = self.index.get(old) else {
            return false;
        };
        if old == new {
            return true;
        }
        if self.contains(new) {
            self.remove(old);
            return true;
        }
        self.index.remove(old);
        self.index.insert(new.to_string(), position);
        self.entries[position].ttp = new.to_string();
        true
    }

    /// Removes the note with text `ttp`.
    pub fn remove(&mut self, ttp: &str) -> Option<EmbeddedTtp> {
        let position = self.index.remove(ttp)?;
        let removed = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }
}

impl From<Vec<EmbeddedTtp>> for TtpList {
    fn from(value: Vec<EmbeddedTtp>) -> Self {
        let mut list = Self::new();
        for ttp in value {
            list.add(ttp);
        }
        list
    }
}

impl From<TtpList> for Vec<EmbeddedTtp> {
    fn from(value: TtpList) -> Self {
        value.entries
    }
}

/// Validation failures for campaign records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignValidationError {
    EmptyName,
    EmptyAlias,
    EmptyTtp,
}

impl Display for CampaignValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "campaign name must not be blank"),
            Self::EmptyAlias => write!(f, "campaign aliases must not be blank"),
            Self::EmptyTtp => write!(f, "TTP text must not be blank"),
        }
    }
}

impl Error for CampaignValidationError {}

/// Named threat operation tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub status: CampaignStatus,
    pub bucket_list: Vec<String>,
    pub tickets: Vec<String>,
    pub ttps: TtpList,
    pub relationships: Vec<Relationship>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    pub modified_by: Option<String>,
}

impl Campaign {
    /// Creates a `New` campaign with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            aliases: Vec::new(),
            status: CampaignStatus::New,
            bucket_list: Vec::new(),
            tickets: Vec::new(),
            ttps: TtpList::new(),
            relationships: Vec::new(),
            created_at: 0,
            updated_at: 0,
            modified_by: None,
        }
    }

    /// Adds normalized aliases, keeping existing ones.
    pub fn add_aliases(&mut self, aliases: &AliasInput) {
        self.aliases = merge_values(&self.aliases, aliases);
    }

    /// Replaces the alias set.
    pub fn set_aliases(&mut self, aliases: &AliasInput) {
        self.aliases = aliases.normalize();
    }

    /// Adds normalized bucket tags, keeping existing ones.
    pub fn add_buckets(&mut self, buckets: &AliasInput) {
        self.bucket_list = merge_values(&self.bucket_list, buckets);
    }

    /// Adds normalized ticket references, keeping existing ones.
    pub fn add_tickets(&mut self, tickets: &AliasInput) {
        self.tickets = merge_values(&self.tickets, tickets);
    }

    /// Validates fields that the store refuses to persist.
    pub fn validate(&self) -> Result<(), CampaignValidationError> {
        if self.name.trim().is_empty() {
            return Err(CampaignValidationError::EmptyName);
        }
        if self.aliases.iter().any(|alias| alias.trim().is_empty()) {
            return Err(CampaignValidationError::EmptyAlias);
        }
        if self.ttps.iter().any(|ttp| ttp.ttp.trim().is_empty()) {
            return Err(CampaignValidationError::EmptyTtp);
        }
        Ok(())
    }
}

fn merge_values(existing: &[String], incoming: &AliasInput) -> Vec<String> {
    let incoming = incoming.normalize();
    normalize_values(existing.iter().chain(incoming.iter()).map(String::as_str))
}
