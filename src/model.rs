// src/model.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrence counts per defect category for one version
pub type CategoryCounts = BTreeMap<String, u64>;

/// Maps a version key to its category counts. A version absent from the
/// table has no report; a version present with an empty map has zero findings.
pub type CountTable = BTreeMap<String, CategoryCounts>;

/// One immutable historical snapshot, as seen by a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    pub name: String,
    /// Commit time of the tagged commit, seconds since the epoch
    pub timestamp: i64,
    /// Position within the processing window, in processing order
    pub position: usize,
}

impl VersionTag {
    /// File stem used for the artifact cache and the report store.
    pub fn key(&self) -> String {
        tag_key(&self.name)
    }
}

/// Percent-escapes `%`, `/` and `\` so that distinct tag names never share
/// a key and the name can be read back with [`tag_name`].
pub fn tag_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => key.push_str("%25"),
            '/' => key.push_str("%2F"),
            '\\' => key.push_str("%5C"),
            c => key.push(c),
        }
    }
    key
}

/// Inverse of [`tag_key`]. Unknown escapes are kept as written.
pub fn tag_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(i) = rest.find('%') {
        name.push_str(&rest[..i]);
        let decoded = match rest.get(i..i + 3) {
            Some("%25") => Some('%'),
            Some("%2F") => Some('/'),
            Some("%5C") => Some('\\'),
            _ => None,
        };
        match decoded {
            Some(c) => {
                name.push(c);
                rest = &rest[i + 3..];
            }
            None => {
                name.push('%');
                rest = &rest[i + 1..];
            }
        }
    }
    name.push_str(rest);
    name
}

#[derive(clap::ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TagOrder {
    /// Process the most recent tag first
    #[default]
    NewestFirst,
    /// Process the oldest tag of the window first
    OldestFirst,
}

/// The bounded, ordered subset of tags mined in one run
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub tags: Vec<VersionTag>,
}

impl Window {
    /// Builds the window from `(name, timestamp)` pairs ordered oldest to newest.
    /// The window always covers the `size` most recent tags; `order` only
    /// decides the processing sequence and therefore the positions.
    pub fn select(chronological: Vec<(String, i64)>, size: usize, order: TagOrder) -> Self {
        let skip = chronological.len().saturating_sub(size);
        let mut recent: Vec<(String, i64)> = chronological.into_iter().skip(skip).collect();
        if order == TagOrder::NewestFirst {
            recent.reverse();
        }

        let tags = recent
            .into_iter()
            .enumerate()
            .map(|(position, (name, timestamp))| VersionTag { name, timestamp, position })
            .collect();
        Window { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// Where a tag ended up after one pass through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagStatus {
    /// Built (or cached) and analysed
    Complete,
    /// Built, but the analysis produced no report
    Partial,
    /// No build descriptor in the checked-out tree
    NotBuildable,
    /// Build tool failed or produced no usable artifact
    BuildFailed,
    /// Working tree could not be moved to the tag
    CheckoutFailed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub requested: usize,
    pub tags: Vec<(String, TagStatus)>,
}

impl RunSummary {
    pub fn new(requested: usize) -> Self {
        RunSummary { requested, tags: Vec::new() }
    }

    pub fn record(&mut self, tag: &str, status: TagStatus) {
        self.tags.push((tag.to_string(), status));
    }

    pub fn count(&self, status: &TagStatus) -> usize {
        self.tags.iter().filter(|(_, s)| s == status).count()
    }

    pub fn status_of(&self, tag: &str) -> Option<&TagStatus> {
        self.tags.iter().find(|(name, _)| name == tag).map(|(_, s)| s)
    }
}
