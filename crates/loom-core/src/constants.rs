/// Tag prefixes carrying inline display metadata. Never used for relations.
pub const RESERVED_TAG_PREFIXES: [&str; 2] = ["title:", "summary:"];

/// Content tokens must be longer than this (in chars) to count for similarity.
pub const MIN_CONTENT_TOKEN_LEN: usize = 3;

/// Keywords shorter than this (in chars) are dropped.
pub const MIN_KEYWORD_LEN: usize = 3;

/// Only the first N content tokens of the target take part in similarity.
pub const CONTENT_TOKEN_CAP: usize = 20;

/// Minimum directional similarity for a record to join a content group.
pub const CONTENT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Default number of keywords attached to a cluster.
pub const KEYWORD_LIMIT: usize = 5;

/// Words never reported as keywords.
pub const STOP_WORDS: [&str; 23] = [
    "this", "that", "with", "from", "have", "will", "been", "they", "there", "the", "and",
    "for", "are", "was", "but", "not", "you", "all", "can", "has", "had", "its", "our",
];

/// Default minimum member count for an emitted cluster.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Upper bound of the minimum cluster size accepted from callers.
pub const MAX_MIN_CLUSTER_SIZE: usize = 10;

/// Categories at or above this size are refined by the smart strategy.
pub const SMART_REFINE_MIN_MEMBERS: usize = 4;

/// A tag present on this share of the corpus saturates tag strength at 1.0.
pub const TAG_STRENGTH_SCALE: f64 = 10.0;

/// Duplicate-token ratio multiplier for content cohesion.
pub const CONTENT_COHESION_SCALE: f64 = 5.0;

/// Cohesion of every temporal cluster.
pub const TEMPORAL_STRENGTH: f64 = 0.8;

pub const SECS_PER_HOUR: i64 = 3600;
pub const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Cluster display colors, assigned by creation index.
pub const PALETTE: [&str; 10] = [
    "#6366f1", "#ec4899", "#14b8a6", "#f59e0b", "#8b5cf6", "#10b981", "#ef4444", "#3b82f6",
    "#f97316", "#84cc16",
];

/// Category key for records without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Project key for records without a project.
pub const UNASSIGNED: &str = "unassigned";

/// Tag cluster name for records without qualifying tags.
pub const UNTAGGED: &str = "untagged";
