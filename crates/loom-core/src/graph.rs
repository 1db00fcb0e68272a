//! Undirected tag-overlap graph over a record set.
//!
//! Nodes are records annotated with their connection count; an edge joins
//! two records sharing at least one non-reserved tag. The graph is rebuilt
//! from scratch on every call (O(n²) pairs), so callers bound the input
//! with [`RecordFilter::limit`](crate::filter::RecordFilter) first.

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::similarity::shared_tags;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub category: String,
    /// Number of incident edges.
    pub connections: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Tag-overlap strength in (0, 1].
    pub weight: f64,
    pub shared_tags: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub isolated: usize,
    pub mean_weight: f64,
    pub max_connections: usize,
    pub density: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl RelationGraph {
    /// Build the graph for `records`, keeping their order for nodes and
    /// emitting edges in (i, j), i < j order.
    pub fn build(records: &[Record]) -> Self {
        let tag_lists: Vec<Vec<&str>> = records.iter().map(Record::relation_tags).collect();
        let mut connections = vec![0usize; records.len()];
        let mut edges = Vec::new();

        for i in 0..records.len() {
            if tag_lists[i].is_empty() {
                continue;
            }
            for j in (i + 1)..records.len() {
                let shared = shared_tags(&tag_lists[i], &tag_lists[j]).len();
                if shared == 0 {
                    continue;
                }
                let denominator = tag_lists[i].len().max(tag_lists[j].len());
                edges.push(GraphEdge {
                    source: records[i].id.clone(),
                    target: records[j].id.clone(),
                    weight: shared as f64 / denominator as f64,
                    shared_tags: shared,
                });
                connections[i] += 1;
                connections[j] += 1;
            }
        }

        let nodes = records
            .iter()
            .zip(connections)
            .map(|(record, connections)| GraphNode {
                id: record.id.clone(),
                label: record.label(),
                category: record.category_key().to_string(),
                connections,
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Neighbors of `id` with edge weights, strongest first.
    pub fn neighbors(&self, id: &str) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self
            .edges
            .iter()
            .filter_map(|e| {
                if e.source == id {
                    Some((e.target.as_str(), e.weight))
                } else if e.target == id {
                    Some((e.source.as_str(), e.weight))
                } else {
                    None
                }
            })
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }

    /// Nodes without any edge.
    pub fn isolated(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.connections == 0)
    }

    /// Edges present over edges possible.
    pub fn density(&self) -> f64 {
        let n = self.nodes.len();
        if n < 2 {
            return 0.0;
        }
        self.edges.len() as f64 / (n * (n - 1) / 2) as f64
    }

    /// Edges sorted by weight (then shared tag count), strongest first.
    pub fn strongest_edges(&self, limit: usize) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self.edges.iter().collect();
        edges.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then(b.shared_tags.cmp(&a.shared_tags))
        });
        edges.truncate(limit);
        edges
    }

    pub fn stats(&self) -> GraphStats {
        let mean_weight = if self.edges.is_empty() {
            0.0
        } else {
            self.edges.iter().map(|e| e.weight).sum::<f64>() / self.edges.len() as f64
        };
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            isolated: self.isolated().count(),
            mean_weight,
            max_connections: self.nodes.iter().map(|n| n.connections).max().unwrap_or(0),
            density: self.density(),
        }
    }
}
