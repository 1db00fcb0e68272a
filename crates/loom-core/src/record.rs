use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{RESERVED_TAG_PREFIXES, UNCATEGORIZED};
use crate::time::parse_iso8601;

/// Fixed set of memory categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personal,
    Work,
    Code,
    Research,
    Conversations,
    Preferences,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Personal,
        Self::Work,
        Self::Code,
        Self::Research,
        Self::Conversations,
        Self::Preferences,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Work => "work",
            Self::Code => "code",
            Self::Research => "research",
            Self::Conversations => "conversations",
            Self::Preferences => "preferences",
        }
    }

    /// Case-insensitive parse; unknown names map to `None`.
    pub fn from_str_lossy(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// True for tags carrying display metadata (`title:`, `summary:`).
pub fn is_reserved_tag(tag: &str) -> bool {
    RESERVED_TAG_PREFIXES.iter().any(|p| tag.starts_with(p))
}

/// A stored memory. Immutable input to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl Record {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            category: None,
            project: None,
            tags: Vec::new(),
            timestamp: String::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Category name, or `"uncategorized"` when absent.
    pub fn category_key(&self) -> &str {
        self.category.map(|c| c.as_str()).unwrap_or(UNCATEGORIZED)
    }

    /// Non-reserved tags, deduplicated, in first-seen order.
    pub fn relation_tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty() && !is_reserved_tag(t))
            .filter(|t| seen.insert(*t))
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        !is_reserved_tag(tag) && self.tags.iter().any(|t| t == tag)
    }

    /// Inline title from a `title:` tag.
    pub fn title(&self) -> Option<&str> {
        self.reserved_value("title:")
    }

    /// Inline summary from a `summary:` tag.
    pub fn summary(&self) -> Option<&str> {
        self.reserved_value("summary:")
    }

    fn reserved_value(&self, prefix: &str) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|t| t.strip_prefix(prefix))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Short display label: the title tag, or the first 40 chars of content.
    pub fn label(&self) -> String {
        if let Some(title) = self.title() {
            return title.to_string();
        }
        let content = self.content.trim();
        if content.chars().count() <= 40 {
            content.to_string()
        } else {
            let head: String = content.chars().take(40).collect();
            format!("{}…", head.trim_end())
        }
    }

    /// Parsed timestamp in Unix seconds; `None` if unparsable.
    pub fn timestamp_secs(&self) -> Option<i64> {
        parse_iso8601(&self.timestamp)
    }
}
