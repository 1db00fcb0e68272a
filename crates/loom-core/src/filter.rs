use serde::{Deserialize, Serialize};

use crate::record::{Record, is_reserved_tag};

/// User-level narrowing applied before records reach the graph builder or
/// the clustering engine. `limit` is the input-size bound for those
/// quadratic passes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    /// Record must carry every one of these tags (case-insensitive).
    pub tags: Vec<String>,
    /// Case-insensitive substring over content, tags and title.
    pub search: Option<String>,
    pub project: Option<String>,
    /// Category key; `"uncategorized"` selects records without one.
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.project.is_none()
            && self.category.is_none()
            && self.limit.is_none()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(project) = &self.project
            && record.project.as_deref() != Some(project.as_str())
        {
            return false;
        }

        if let Some(category) = &self.category
            && !record.category_key().eq_ignore_ascii_case(category)
        {
            return false;
        }

        let all_tags = self.tags.iter().all(|wanted| {
            !is_reserved_tag(wanted)
                && record
                    .relation_tags()
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(wanted))
        });
        if !all_tags {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                record.content.to_lowercase().contains(&needle)
                    || record
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    /// Keep matching records in input order, up to `limit`.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
