//! Similarity primitives shared by the relationship graph and the clustering
//! strategies. Every function here is pure and total.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

use crate::constants::{CONTENT_TOKEN_CAP, TAG_STRENGTH_SCALE};
use crate::record::{Record, is_reserved_tag};
use crate::tokenizer::{content_tokens, keyword_tokens};

fn relation_set<S: AsRef<str>>(tags: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.is_empty() && !is_reserved_tag(t))
        .filter(|t| seen.insert(*t))
        .collect()
}

/// Non-reserved tags present in both lists, in the order they appear in `a`.
pub fn shared_tags<'a, A, B>(a: &'a [A], b: &[B]) -> Vec<&'a str>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let other: HashSet<&str> = relation_set(b).into_iter().collect();
    relation_set(a)
        .into_iter()
        .filter(|t| other.contains(t))
        .collect()
}

/// `|shared| / max(|a|, |b|)` over non-reserved, deduplicated tags.
/// Symmetric, in [0, 1], and 0 when either side has no qualifying tags.
pub fn tag_overlap_weight<A, B>(a: &[A], b: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let len_a = relation_set(a).len();
    let len_b = relation_set(b).len();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    shared_tags(a, b).len() as f64 / len_a.max(len_b) as f64
}

/// Precomputed token view of one text for repeated similarity checks.
///
/// `reference` holds the distinct tokens among the first 20 qualifying ones,
/// in order of appearance (the side used when this text is the target);
/// `vocabulary` holds every qualifying token (the candidate side).
#[derive(Clone, Debug, Default)]
pub struct ContentProfile {
    reference: Vec<String>,
    vocabulary: HashSet<String>,
}

impl ContentProfile {
    pub fn new(text: &str) -> Self {
        let tokens = content_tokens(text);
        let mut seen: HashSet<&str> = HashSet::new();
        let reference = tokens
            .iter()
            .take(CONTENT_TOKEN_CAP)
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();
        Self {
            reference,
            vocabulary: tokens.iter().cloned().collect(),
        }
    }

    /// Directional similarity of `self` (target) against `candidate`.
    /// The denominator only ever depends on the target.
    pub fn similarity_to(&self, candidate: &ContentProfile) -> f64 {
        let matches = self
            .reference
            .iter()
            .filter(|t| candidate.vocabulary.contains(*t))
            .count();
        matches as f64 / self.reference.len().max(1) as f64
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }
}

/// Asymmetric lexical overlap: share of the target's first 20 long tokens
/// that also occur anywhere in the candidate.
pub fn content_similarity(target: &str, candidate: &str) -> f64 {
    ContentProfile::new(target).similarity_to(&ContentProfile::new(candidate))
}

/// Most frequent keywords in `text`, ties broken by first appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, token) in keyword_tokens(text).into_iter().enumerate() {
        counts.entry(token).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(token, _, _)| token)
        .collect()
}

/// Engagement score of a tag: `min(1, share_of_records_with_tag * 10)`.
pub fn tag_strength<R: Borrow<Record>>(tag: &str, records: &[R]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let count = records
        .iter()
        .filter(|r| {
            let record: &Record = (*r).borrow();
            record.has_tag(tag)
        })
        .count();
    ((count as f64 / records.len() as f64) * TAG_STRENGTH_SCALE).min(1.0)
}
