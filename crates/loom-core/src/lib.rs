//! Relationship and clustering engine for a personal collection of tagged
//! text records ("memories").
//!
//! Three layers, leaves first: similarity primitives (tag overlap, directional
//! content overlap, keywords), a pairwise tag-overlap graph for visualization,
//! and a clustering engine with interchangeable strategies.
//!
//! Zero I/O. Deterministic heuristics with no opinions about transport or
//! persistence. Every call is a pure function of its inputs.

pub mod cluster;
pub mod constants;
pub mod content;
pub mod filter;
pub mod graph;
pub mod partition;
pub mod record;
pub mod serde_compat;
pub mod similarity;
pub mod smart;
pub mod tagging;
pub mod time;
pub mod tokenizer;

pub use cluster::{
    Cluster, ClusterEngine, ClusterRequest, ClusterSummary, ClusterType, Strategy, finalize,
};
pub use constants::{DEFAULT_MIN_CLUSTER_SIZE, MAX_MIN_CLUSTER_SIZE, PALETTE};
pub use filter::RecordFilter;
pub use graph::{GraphEdge, GraphNode, GraphStats, RelationGraph};
pub use record::{Category, Record, is_reserved_tag};
pub use serde_compat::{CURRENT_VERSION, export_records, parse_records};
pub use similarity::{
    ContentProfile, content_similarity, extract_keywords, shared_tags, tag_overlap_weight,
    tag_strength,
};
pub use smart::Refinement;
pub use time::{now_iso8601, now_unix_secs, parse_iso8601, unix_to_iso8601};
pub use tokenizer::tokenize;
