//! Campaign attribution records embedded in top-level objects.
//!
//! # Responsibility
//! - Define the `EmbeddedCampaign` value and its confidence scale.
//! - Own merge-by-name semantics for repeated attribution.
//!
//! # Invariants
//! - A `CampaignList` never holds two entries with the same campaign name.
//! - Entry order is insertion order; removal keeps the relative order of the
//!   remaining entries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Analyst confidence that an object belongs to a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Stable storage/display identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses one confidence value, case-insensitive.
    pub fn parse(value: &str) -> Result<Self, ConfidenceParseError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ConfidenceParseError(value.to_string())),
        }
    }
}

impl Display for Confidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input value that does not name a known confidence level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidenceParseError(pub String);

impl Display for ConfidenceParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported confidence `{}`; expected low|medium|high",
            self.0
        )
    }
}

impl Error for ConfidenceParseError {}

/// Attribution of one object to one campaign.
///
/// `name` references a campaign by name only. Nothing checks that the
/// campaign exists, and deleting a campaign leaves these entries behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedCampaign {
    pub name: String,
    pub confidence: Confidence,
    pub description: String,
    pub analyst: String,
    /// Epoch milliseconds.
    pub date: i64,
}

/// Caller input for one attribution, before merge resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribution {
    pub name: String,
    pub confidence: Confidence,
    pub description: String,
    pub analyst: String,
    /// Explicit attribution date. `None` means "now" for new entries and
    /// "keep" for merged entries.
    pub date: Option<i64>,
}

impl NewAttribution {
    pub fn new(
        name: impl Into<String>,
        confidence: Confidence,
        description: impl Into<String>,
        analyst: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            confidence,
            description: description.into(),
            analyst: analyst.into(),
            date: None,
        }
    }

    /// Builds an input that carries every field of an existing entry.
    pub fn from_entry(entry: &EmbeddedCampaign) -> Self {
        Self {
            name: entry.name.clone(),
            confidence: entry.confidence,
            description: entry.description.clone(),
            analyst: entry.analyst.clone(),
            date: Some(entry.date),
        }
    }
}

/// What to do when the campaign name is already attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Update confidence and description in place.
    #[default]
    Merge,
    /// Leave the existing entry untouched.
    KeepExisting,
}

/// Result of embedding one attribution into a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedOutcome {
    Added,
    Merged,
    Unchanged,
    /// Entry overwritten by an explicit edit.
    Replaced,
}

/// Ordered campaign attributions keyed by campaign name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EmbeddedCampaign>", into = "Vec<EmbeddedCampaign>")]
pub struct CampaignList {
    entries: Vec<EmbeddedCampaign>,
    index: HashMap<String, usize>,
}

impl CampaignList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&EmbeddedCampaign> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedCampaign> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[EmbeddedCampaign] {
        &self.entries
    }

    /// Embeds one attribution using merge-by-name semantics.
    ///
    /// - No entry with this name: appended, dated `attribution.date` or `now`.
    /// - Entry exists and `policy == Merge`: confidence and description are
    ///   replaced; analyst is kept; date is replaced only when explicit.
    /// - Entry exists and `policy == KeepExisting`: nothing changes.
    pub fn embed(
        &mut self,
        attribution: &NewAttribution,
        now: i64,
        policy: MergePolicy,
    ) -> EmbedOutcome {
        if let Some(&position) = self.index.get(attribution.name.as_str()) {
            if policy == MergePolicy::KeepExisting {
                return EmbedOutcome::Unchanged;
            }
            let existing = &mut self.entries[position];
            existing.confidence = attribution.confidence;
            existing.description = attribution.description.clone();
            if let Some(date) = attribution.date {
                existing.date = date;
            }
            return EmbedOutcome::Merged;
        }

        self.push(EmbeddedCampaign {
            name: attribution.name.clone(),
            confidence: attribution.confidence,
            description: attribution.description.clone(),
            analyst: attribution.analyst.clone(),
            date: attribution.date.unwrap_or(now),
        });
        EmbedOutcome::Added
    }

    /// Replaces every field but the name of an existing entry.
    ///
    /// Returns `None` when no entry with `replacement.name` exists.
    pub fn replace(&mut self, replacement: EmbeddedCampaign) -> Option<&EmbeddedCampaign> {
        let position = *self.index.get(replacement.name.as_str())?;
        self.entries[position] = replacement;
        Some(&self.entries[position])
    }

    /// Removes the entry for `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<EmbeddedCampaign> {
        let position = self.index.remove(name)?;
        let removed = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    fn push(&mut self, entry: EmbeddedCampaign) {
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

impl From<Vec<EmbeddedCampaign>> for CampaignList {
    /// Later duplicates of a name are dropped so the keyed invariant holds
    /// for any external input.
    fn from(value: Vec<EmbeddedCampaign>) -> Self {
        let mut list = Self::new();
        for entry in value {
            if !list.contains(entry.name.as_str()) {
                list.push(entry);
            }
        }
        list
    }
}

impl From<CampaignList> for Vec<EmbeddedCampaign> {
    fn from(value: CampaignList) -> Self {
        value.entries
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CampaignList, Confidence, EmbedOutcome, EmbeddedCampaign, MergePolicy, NewAttribution,
    };

    fn attribution(name: &str, confidence: Confidence, analyst: &str) -> NewAttribution {
        NewAttribution::new(name, confidence, format!("{name} via {analyst}"), analyst)
    }

    #[test]
    fn confidence_orders_low_to_high_and_parses_case_insensitive() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(Confidence::parse(" HIGH ").unwrap(), Confidence::High);
        assert!(Confidence::parse("certain").is_err());
    }

    #[test]
    fn embed_appends_new_name_with_now_as_date() {
        let mut list = CampaignList::new();
        let outcome = list.embed(
            &attribution("Foo", Confidence::Low, "alice"),
            1_000,
            MergePolicy::Merge,
        );

        assert_eq!(outcome, EmbedOutcome::Added);
        let entry = list.get("Foo").unwrap();
        assert_eq!(entry.date, 1_000);
        assert_eq!(entry.analyst, "alice");
    }

    #[test]
    fn merge_replaces_confidence_and_description_but_keeps_analyst_and_date() {
        let mut list = CampaignList::new();
        list.embed(
            &attribution("Foo", Confidence::Low, "alice"),
            1_000,
            MergePolicy::Merge,
        );
        let outcome = list.embed(
            &attribution("Foo", Confidence::High, "bob"),
            2_000,
            MergePolicy::Merge,
        );

        assert_eq!(outcome, EmbedOutcome::Merged);
        assert_eq!(list.len(), 1);
        let entry = list.get("Foo").unwrap();
        assert_eq!(entry.confidence, Confidence::High);
        assert_eq!(entry.description, "Foo via bob");
        assert_eq!(entry.analyst, "alice");
        assert_eq!(entry.date, 1_000);
    }

    #[test]
    fn merge_takes_explicit_date() {
        let mut list = CampaignList::new();
        list.embed(
            &attribution("Foo", Confidence::Low, "alice"),
            1_000,
            MergePolicy::Merge,
        );
        let mut again = attribution("Foo", Confidence::Medium, "alice");
        again.date = Some(5_000);
        list.embed(&again, 2_000, MergePolicy::Merge);

        assert_eq!(list.get("Foo").unwrap().date, 5_000);
    }

    #[test]
    fn keep_existing_leaves_entry_untouched() {
        let mut list = CampaignList::new();
        list.embed(
            &attribution("Foo", Confidence::Low, "alice"),
            1_000,
            MergePolicy::Merge,
        );
        let before = list.get("Foo").cloned();
        let outcome = list.embed(
            &attribution("Foo", Confidence::High, "bob"),
            2_000,
            MergePolicy::KeepExisting,
        );

        assert_eq!(outcome, EmbedOutcome::Unchanged);
        assert_eq!(list.get("Foo").cloned(), before);
    }

    #[test]
    fn remove_keeps_index_consistent_for_later_entries() {
        let mut list = CampaignList::new();
        for name in ["A", "B", "C"] {
            list.embed(
                &attribution(name, Confidence::Low, "alice"),
                1,
                MergePolicy::Merge,
            );
        }

        assert!(list.remove("A").is_some());
        assert!(list.remove("A").is_none());
        assert_eq!(list.get("C").unwrap().name, "C");
        let names: Vec<_> = list.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn replace_requires_existing_name() {
        let mut list = CampaignList::new();
        let missing = EmbeddedCampaign {
            name: "Foo".to_string(),
            confidence: Confidence::High,
            description: String::new(),
            analyst: "alice".to_string(),
            date: 7,
        };
        assert!(list.replace(missing).is_none());
    }

    #[test]
    fn from_vec_drops_duplicate_names() {
        let entry = EmbeddedCampaign {
            name: "Foo".to_string(),
            confidence: Confidence::Low,
            description: String::new(),
            analyst: "alice".to_string(),
            date: 1,
        };
        let mut duplicate = entry.clone();
        duplicate.confidence = Confidence::High;

        let list = CampaignList::from(vec![entry, duplicate]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("Foo").unwrap().confidence, Confidence::Low);
    }
}
