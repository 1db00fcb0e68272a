//! Strategies that partition the input: every record lands in exactly one
//! group (category, project, recency window).

use crate::cluster::{Cluster, ClusterType};
use crate::constants::{SECS_PER_DAY, TEMPORAL_STRENGTH, UNASSIGNED};
use crate::record::Record;

/// Group records by a key, keeping first-seen key order and input order
/// within each group.
fn group_by<'a, F>(records: &[&'a Record], key: F) -> Vec<(String, Vec<&'a Record>)>
where
    F: Fn(&Record) -> String,
{
    let mut groups: Vec<(String, Vec<&'a Record>)> = Vec::new();
    for &record in records {
        let k = key(record);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(record),
            None => groups.push((k, vec![record])),
        }
    }
    groups
}

/// Records grouped by category key, first-seen order.
pub(crate) fn category_groups<'a>(records: &[&'a Record]) -> Vec<(String, Vec<&'a Record>)> {
    group_by(records, |r| r.category_key().to_string())
}

/// The cluster for the `index`-th category group.
pub(crate) fn category_cluster(category: &str, members: &[&Record], index: usize) -> Cluster {
    Cluster::from_members(
        format!("category:{category}"),
        category.to_string(),
        ClusterType::Category,
        members,
        1.0,
        index,
    )
}

/// One cluster per category (absent → `uncategorized`). Membership is
/// categorical, so strength is always 1.0.
pub fn by_category(records: &[&Record]) -> Vec<Cluster> {
    category_groups(records)
        .iter()
        .enumerate()
        .map(|(index, (category, members))| category_cluster(category, members, index))
        .collect()
}

/// One cluster per project label (absent or blank → `unassigned`).
pub fn by_project(records: &[&Record]) -> Vec<Cluster> {
    let project_key = |r: &Record| {
        r.project
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(UNASSIGNED)
            .to_string()
    };
    group_by(records, project_key)
        .into_iter()
        .enumerate()
        .map(|(index, (project, members))| {
            Cluster::from_members(
                format!("project:{project}"),
                project,
                ClusterType::Project,
                &members,
                1.0,
                index,
            )
        })
        .collect()
}

/// Recency windows, evaluated in order against the not-yet-claimed pool.
/// `None` is unbounded.
const WINDOWS: [(&str, &str, Option<i64>); 4] = [
    ("today", "Today", Some(SECS_PER_DAY)),
    ("week", "This Week", Some(7 * SECS_PER_DAY)),
    ("month", "This Month", Some(30 * SECS_PER_DAY)),
    ("earlier", "Earlier", None),
];

/// Partition by age relative to `now`. Each window claims every remaining
/// record within its cutoff, so the first matching window wins. Records with
/// unparsable timestamps match no window. Empty windows yield no cluster.
pub fn by_time(records: &[&Record], now: i64) -> Vec<Cluster> {
    let mut pool: Vec<(&Record, i64)> = records
        .iter()
        .filter_map(|r| r.timestamp_secs().map(|ts| (*r, ts)))
        .collect();
    pool.sort_by(|a, b| b.1.cmp(&a.1));

    let mut clusters = Vec::new();
    for (slug, name, cutoff) in WINDOWS {
        let (claimed, remaining): (Vec<_>, Vec<_>) = pool
            .into_iter()
            .partition(|(_, ts)| cutoff.is_none_or(|limit| now - ts <= limit));
        pool = remaining;

        if claimed.is_empty() {
            continue;
        }
        let members: Vec<&Record> = claimed.into_iter().map(|(r, _)| r).collect();
        let index = clusters.len();
        clusters.push(Cluster::from_members(
            format!("temporal:{slug}"),
            name.to_string(),
            ClusterType::Temporal,
            &members,
            TEMPORAL_STRENGTH,
            index,
        ));
    }
    clusters
}
