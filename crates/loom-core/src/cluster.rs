//! Clustering engine: turns a record set into named, scored groups.
//!
//! Each strategy produces raw clusters; [`ClusterEngine::cluster`] then drops
//! everything below the minimum size and ranks the rest by member count.
//! Every call recomputes from scratch and reads no ambient state: "now" for
//! the temporal windows comes in through [`ClusterRequest`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MIN_CLUSTER_SIZE, KEYWORD_LIMIT, MAX_MIN_CLUSTER_SIZE, PALETTE,
};
use crate::record::Record;
use crate::similarity::extract_keywords;
use crate::time::now_unix_secs;
use crate::{content, partition, smart, tagging};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    Category,
    Tag,
    Temporal,
    Content,
    Project,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Temporal => "temporal",
            Self::Content => "content",
            Self::Project => "project",
        }
    }
}

/// How records are grouped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Partition by category.
    Category,
    /// One cluster per tag; a record joins every tag it carries.
    Tag,
    /// Partition into recency windows.
    Temporal,
    /// Greedy lexical-overlap grouping.
    Content,
    /// Category partition refined by tag or content sub-clusters.
    #[default]
    Smart,
    /// Partition by project label.
    Project,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Self::Category,
        Self::Tag,
        Self::Temporal,
        Self::Content,
        Self::Smart,
        Self::Project,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Temporal => "temporal",
            Self::Content => "content",
            Self::Smart => "smart",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(Strategy::as_str).collect();
                format!("unknown strategy '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// A named group of records. Recomputed on every call, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub cluster_type: ClusterType,
    /// Member record ids.
    pub members: Vec<String>,
    /// Up to five representative keywords.
    pub keywords: Vec<String>,
    /// Cohesion in [0, 1].
    pub strength: f64,
    pub color: String,
}

impl Cluster {
    /// Build a cluster from member records, deriving keywords from their content.
    pub(crate) fn from_members(
        id: String,
        name: String,
        cluster_type: ClusterType,
        members: &[&Record],
        strength: f64,
        index: usize,
    ) -> Self {
        Self {
            id,
            name,
            cluster_type,
            members: members.iter().map(|r| r.id.clone()).collect(),
            keywords: member_keywords(members),
            strength: strength.clamp(0.0, 1.0),
            color: palette_color(index),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.members.iter().any(|m| m == record_id)
    }
}

/// Palette color for the `index`-th cluster a strategy creates.
pub fn palette_color(index: usize) -> String {
    PALETTE[index % PALETTE.len()].to_string()
}

/// Concatenated member contents joined by spaces.
pub(crate) fn joined_content(members: &[&Record]) -> String {
    members
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn member_keywords(members: &[&Record]) -> Vec<String> {
    extract_keywords(&joined_content(members), KEYWORD_LIMIT)
}

/// Parameters for one clustering call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    pub strategy: Strategy,
    pub min_cluster_size: usize,
    /// Reference time (Unix seconds) for temporal windows.
    pub now: i64,
}

impl ClusterRequest {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            now: now_unix_secs(),
        }
    }

    pub fn with_min_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    pub fn with_now(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// Effective minimum: values outside 1..=10 are clamped into range.
    pub fn min_size(&self) -> usize {
        self.min_cluster_size.clamp(1, MAX_MIN_CLUSTER_SIZE)
    }
}

impl Default for ClusterRequest {
    fn default() -> Self {
        Self::new(Strategy::default())
    }
}

/// Stateless entry point for every clustering strategy.
pub struct ClusterEngine;

impl ClusterEngine {
    /// Cluster `records`: run the strategy, drop clusters below the minimum
    /// size, and sort by member count descending (stable on ties).
    pub fn cluster(records: &[Record], request: &ClusterRequest) -> Vec<Cluster> {
        let raw = Self::raw(records, request);
        finalize(raw, request.min_size())
    }

    /// Strategy output before size filtering and ranking.
    pub fn raw(records: &[Record], request: &ClusterRequest) -> Vec<Cluster> {
        let refs: Vec<&Record> = records.iter().collect();
        Self::run(&refs, request.strategy, request.min_size(), request.now)
    }

    pub(crate) fn run(
        records: &[&Record],
        strategy: Strategy,
        min_size: usize,
        now: i64,
    ) -> Vec<Cluster> {
        if records.is_empty() {
            return Vec::new();
        }
        match strategy {
            Strategy::Category => partition::by_category(records),
            Strategy::Project => partition::by_project(records),
            Strategy::Temporal => partition::by_time(records, now),
            Strategy::Tag => tagging::by_tag(records),
            Strategy::Content => content::by_content(records, min_size),
            Strategy::Smart => smart::by_smart(records, min_size),
        }
    }
}

/// Drop clusters below `min_size` and rank the rest by size.
pub fn finalize(mut clusters: Vec<Cluster>, min_size: usize) -> Vec<Cluster> {
    clusters.retain(|c| c.len() >= min_size);
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

/// Coverage of a clustering result over its input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub clusters: usize,
    pub clustered_records: usize,
    pub unclustered_records: usize,
    pub largest: usize,
    pub coverage: f64,
}

impl ClusterSummary {
    pub fn compute(records: &[Record], clusters: &[Cluster]) -> Self {
        let clustered: HashSet<&str> = clusters
            .iter()
            .flat_map(|c| c.members.iter().map(String::as_str))
            .collect();
        let clustered_records = records
            .iter()
            .filter(|r| clustered.contains(r.id.as_str()))
            .count();
        let coverage = if records.is_empty() {
            0.0
        } else {
            clustered_records as f64 / records.len() as f64
        };
        Self {
            clusters: clusters.len(),
            clustered_records,
            unclustered_records: records.len() - clustered_records,
            largest: clusters.iter().map(Cluster::len).max().unwrap_or(0),
            coverage,
        }
    }
}
