//! Hybrid strategy: category partition, with large categories refined into
//! tag or content sub-clusters.
//!
//! Two flat passes rather than recursion. The outer pass partitions by
//! category; the inner pass ([`refine`]) decides per category whether to
//! emit sub-clusters or the category as a whole. Output is always a flat
//! list mixing both levels.

use crate::cluster::{Cluster, ClusterEngine, Strategy};
use crate::constants::SMART_REFINE_MIN_MEMBERS;
use crate::partition::{category_cluster, category_groups};
use crate::record::Record;

/// Outcome of refining one category.
#[derive(Clone, Debug, PartialEq)]
pub enum Refinement {
    /// Two or more qualifying sub-clusters, already renamed and recolored.
    Subclusters(Vec<Cluster>),
    /// The category stays a single cluster.
    WholeCategory(Cluster),
}

pub fn by_smart(records: &[&Record], min_size: usize) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    for (index, (category, members)) in category_groups(records).iter().enumerate() {
        let parent = category_cluster(category, members, index);
        match refine(parent, members, min_size) {
            Refinement::Subclusters(subs) => clusters.extend(subs),
            Refinement::WholeCategory(whole) => clusters.push(whole),
        }
    }
    clusters
}

/// Refine a category: try tag sub-clusters, then content sub-clusters; each
/// is accepted only if it yields more than one cluster of at least
/// `min_size` members.
pub fn refine(parent: Cluster, members: &[&Record], min_size: usize) -> Refinement {
    if members.len() < SMART_REFINE_MIN_MEMBERS {
        return Refinement::WholeCategory(parent);
    }

    for strategy in [Strategy::Tag, Strategy::Content] {
        let qualifying: Vec<Cluster> = ClusterEngine::run(members, strategy, min_size, 0)
            .into_iter()
            .filter(|c| c.len() >= min_size)
            .collect();
        if qualifying.len() > 1 {
            let subs = qualifying
                .into_iter()
                .map(|sub| adopt(&parent, sub))
                .collect();
            return Refinement::Subclusters(subs);
        }
    }
    Refinement::WholeCategory(parent)
}

/// Re-home a sub-cluster under its category: prefixed name, parent color.
fn adopt(parent: &Cluster, sub: Cluster) -> Cluster {
    Cluster {
        id: format!("{}/{}", parent.id, sub.id),
        name: format!("{} - {}", parent.name, sub.name),
        color: parent.color.clone(),
        ..sub
    }
}
