use std::collections::HashSet;

use crate::cluster::{Cluster, ClusterType};
use crate::constants::{CONTENT_COHESION_SCALE, CONTENT_SIMILARITY_THRESHOLD};
use crate::record::Record;
use crate::similarity::ContentProfile;
use crate::tokenizer::content_tokens;

/// Greedy lexical grouping.
///
/// Walks unprocessed records in input order. Each one gathers itself plus
/// every other unprocessed record it is similar to (directional, target =
/// current record). A group of at least `min_size` becomes a cluster and its
/// members are marked processed; a smaller group is discarded and the
/// current record stays available to later groups.
pub fn by_content(records: &[&Record], min_size: usize) -> Vec<Cluster> {
    let profiles: Vec<ContentProfile> = records
        .iter()
        .map(|r| ContentProfile::new(&r.content))
        .collect();
    let mut processed = vec![false; records.len()];
    let mut clusters = Vec::new();

    for current in 0..records.len() {
        if processed[current] {
            continue;
        }

        let group: Vec<usize> = (0..records.len())
            .filter(|&other| {
                other == current
                    || (!processed[other]
                        && profiles[current].similarity_to(&profiles[other])
                            >= CONTENT_SIMILARITY_THRESHOLD)
            })
            .collect();
        if group.len() < min_size {
            continue;
        }

        for &member in &group {
            processed[member] = true;
        }
        let members: Vec<&Record> = group.iter().map(|&i| records[i]).collect();
        let index = clusters.len();
        let mut cluster = Cluster::from_members(
            format!("content:{index}"),
            String::new(),
            ClusterType::Content,
            &members,
            content_cohesion(&members),
            index,
        );
        cluster.name = cluster_name(&cluster.keywords);
        clusters.push(cluster);
    }
    clusters
}

/// Top two keywords joined with " + ".
fn cluster_name(keywords: &[String]) -> String {
    if keywords.is_empty() {
        return "Content Cluster".to_string();
    }
    keywords
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Duplicate-token ratio over all member tokens, scaled by 5 and capped at 1.
/// Zero for fewer than two members.
pub fn content_cohesion(members: &[&Record]) -> f64 {
    if members.len() < 2 {
        return 0.0;
    }
    let tokens: Vec<String> = members
        .iter()
        .flat_map(|r| content_tokens(&r.content))
        .collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&String> = tokens.iter().collect();
    let ratio = (tokens.len() - unique.len()) as f64 / tokens.len() as f64;
    (ratio * CONTENT_COHESION_SCALE).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rec(id: &str, content: &str) -> Record {
        Record::new(id, content)
    }

    fn run(records: &[Record], min_size: usize) -> Vec<Cluster> {
        let refs: Vec<&Record> = records.iter().collect();
        by_content(&refs, min_size)
    }

    #[test]
    fn test_groups_similar_records() {
        let records = vec![
            rec("1", "rust borrow checker lifetimes"),
            rec("2", "sourdough bread hydration"),
            rec("3", "lifetimes and the borrow checker in rust"),
            rec("4", "bread baking hydration levels"),
        ];
        let clusters = run(&records, 2);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec!["1", "3"]);
        assert_eq!(clusters[1].members, vec!["2", "4"]);
        assert_eq!(clusters[0].cluster_type, ClusterType::Content);
        assert_eq!(clusters[0].id, "content:0");
    }

    #[test]
    fn test_name_from_top_keywords() {
        let records = vec![
            rec("1", "garden tomatoes garden"),
            rec("2", "garden tomatoes watering"),
        ];
        let clusters = run(&records, 2);
        assert_eq!(clusters[0].name, "garden + tomatoes");
    }

    #[test]
    fn test_fallback_name_without_keywords() {
        let records = vec![rec("1", "a b c"), rec("2", "d e f")];
        let clusters = run(&records, 1);
        assert_eq!(clusters[0].name, "Content Cluster");
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_self_inclusion_even_without_tokens() {
        let records = vec![rec("solo", "ok")];
        let clusters = run(&records, 1);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec!["solo"]);
    }

    #[test]
    fn test_small_group_leaves_record_available() {
        // Record 1 alone is too small; record 2 later gathers 1 and 3.
        let records = vec![
            rec("1", "alpha"),
            rec("2", "alpha beta gamma"),
            rec("3", "beta gamma"),
        ];
        let clusters = run(&records, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_repeated_words_do_not_inflate_similarity() {
        // 1 vs 2 is 1/6 distinct target tokens, 2 vs 1 is 1/4.
        let records = vec![
            rec("1", "alpha alpha alpha beta gamma delta epsilon zeta"),
            rec("2", "alpha omega sigma kappa"),
        ];
        assert!(run(&records, 2).is_empty());
    }

    #[test]
    fn test_processed_records_not_reused() {
        let records = vec![
            rec("1", "deploy pipeline"),
            rec("2", "deploy pipeline"),
            rec("3", "deploy pipeline"),
        ];
        let clusters = run(&records, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_cohesion() {
        let a = rec("1", "deploy pipeline");
        let b = rec("2", "deploy pipeline");
        assert_relative_eq!(content_cohesion(&[&a, &b]), 1.0);
        assert_eq!(content_cohesion(&[&a]), 0.0);

        let c = rec("3", "alpha beta gamma delta epsilon");
        let d = rec("4", "zeta theta iota kappa alpha");
        // 10 tokens, 9 unique → 0.1 * 5
        assert_relative_eq!(content_cohesion(&[&c, &d]), 0.5);
    }
}
