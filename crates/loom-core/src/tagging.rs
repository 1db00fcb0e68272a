use crate::cluster::{Cluster, ClusterType};
use crate::constants::UNTAGGED;
use crate::record::Record;
use crate::similarity::tag_strength;

/// One cluster per non-reserved tag, in first-seen tag order, holding every
/// record that carries it. Records without qualifying tags share a single
/// `untagged` cluster at the end. Strength is the tag's engagement score
/// over `records`.
pub fn by_tag(records: &[&Record]) -> Vec<Cluster> {
    let mut groups: Vec<(&str, Vec<&Record>)> = Vec::new();
    let mut untagged: Vec<&Record> = Vec::new();

    for &record in records {
        let tags = record.relation_tags();
        if tags.is_empty() {
            untagged.push(record);
            continue;
        }
        for tag in tags {
            match groups.iter_mut().find(|(existing, _)| *existing == tag) {
                Some((_, members)) => members.push(record),
                None => groups.push((tag, vec![record])),
            }
        }
    }

    let mut clusters: Vec<Cluster> = groups
        .into_iter()
        .enumerate()
        .map(|(index, (tag, members))| {
            Cluster::from_members(
                format!("tag:{tag}"),
                tag.to_string(),
                ClusterType::Tag,
                &members,
                tag_strength(tag, records),
                index,
            )
        })
        .collect();

    if !untagged.is_empty() {
        let strength = untagged.len() as f64 / records.len() as f64;
        let index = clusters.len();
        clusters.push(Cluster::from_members(
            format!("tag:{UNTAGGED}"),
            UNTAGGED.to_string(),
            ClusterType::Tag,
            &untagged,
            strength,
            index,
        ));
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, tags: &[&str]) -> Record {
        Record::new(id, format!("entry {id}")).with_tags(tags.iter().copied())
    }

    #[test]
    fn test_record_joins_every_tag() {
        let records = vec![rec("1", &["a", "b"]), rec("2", &["b"]), rec("3", &["c", "a"])];
        let refs: Vec<&Record> = records.iter().collect();
        let clusters = by_tag(&refs);
        let names: Vec<&str> = clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(clusters[0].members, vec!["1", "3"]);
        assert_eq!(clusters[1].members, vec!["1", "2"]);
        assert_eq!(clusters[2].members, vec!["3"]);
        assert_eq!(clusters[0].id, "tag:a");
    }

    #[test]
    fn test_untagged_bucket_last() {
        let records = vec![
            rec("1", &["title:Only metadata"]),
            rec("2", &["x"]),
            rec("3", &[]),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let clusters = by_tag(&refs);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].name, "untagged");
        assert_eq!(clusters[1].members, vec!["1", "3"]);
    }

    #[test]
    fn test_strength_is_tag_engagement() {
        let records: Vec<Record> = (0..40)
            .map(|i| rec(&i.to_string(), if i < 2 { &["rare"] } else { &["common"] }))
            .collect();
        let refs: Vec<&Record> = records.iter().collect();
        let clusters = by_tag(&refs);
        let rare = clusters.iter().find(|c| c.name == "rare").unwrap();
        let common = clusters.iter().find(|c| c.name == "common").unwrap();
        assert!((rare.strength - 0.5).abs() < 1e-12);
        assert_eq!(common.strength, 1.0);
    }

    #[test]
    fn test_duplicate_tags_count_once() {
        let records = vec![rec("1", &["a", "a"]), rec("2", &["a"])];
        let refs: Vec<&Record> = records.iter().collect();
        let clusters = by_tag(&refs);
        assert_eq!(clusters[0].members, vec!["1", "2"]);
    }
}
