//! Greedy cross-source story clustering.
//!
//! Records are walked in input order. Every record not yet assigned seeds a
//! new cluster, and later unassigned records join it when they come from a
//! source the cluster does not contain yet and their title is similar enough
//! to the seed's. Matching is against the seed only, never against members
//! added afterwards, so a chain `A ~ B ~ C` with `A !~ C` does not pull `C`
//! into `A`'s cluster.

use std::collections::HashSet;

use crate::store::models::Record;

use super::normalize::normalize_title;
use super::similarity::{key_ratio, token_sort_key};

/// Partitions `records` into clusters.
///
/// Clusters come back in seed order and members in insertion order. Every
/// input record ends up in exactly one cluster and no cluster holds two
/// records from the same source.
#[must_use]
pub fn cluster_records(records: Vec<Record>, similarity_threshold: u8) -> Vec<Vec<Record>> {
    let groups = cluster_indices(&records, similarity_threshold);
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();

    groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .filter_map(|index| slots.get_mut(index).and_then(Option::take))
                .collect()
        })
        .collect()
}

/// Same as [`cluster_records`] but returns indices into `records`.
#[must_use]
pub fn cluster_indices(records: &[Record], similarity_threshold: u8) -> Vec<Vec<usize>> {
    // タイトルは1回だけ正規化してキャッシュする
    let keys: Vec<String> = records
        .iter()
        .map(|record| token_sort_key(&normalize_title(&record.title)))
        .collect();
    let mut assigned = vec![false; records.len()];
    let mut clusters = Vec::new();

    for (seed, seed_record) in records.iter().enumerate() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;

        let mut members = vec![seed];
        let mut sources: HashSet<&str> = HashSet::from([seed_record.source.as_str()]);

        for (candidate, candidate_record) in records.iter().enumerate().skip(seed + 1) {
            if assigned[candidate] || sources.contains(candidate_record.source.as_str()) {
                continue;
            }

            if is_match(&keys[seed], &keys[candidate], similarity_threshold) {
                assigned[candidate] = true;
                sources.insert(candidate_record.source.as_str());
                members.push(candidate);
            }
        }

        clusters.push(members);
    }

    clusters
}

// 空のキーは閾値に関係なく何ともマッチしない
fn is_match(seed_key: &str, candidate_key: &str, similarity_threshold: u8) -> bool {
    !seed_key.is_empty()
        && !candidate_key.is_empty()
        && key_ratio(seed_key, candidate_key) >= similarity_threshold
}

/// Number of distinct sources in a cluster.
#[must_use]
pub fn unique_sources(cluster: &[Record]) -> usize {
    cluster
        .iter()
        .map(|record| record.source.as_str())
        .collect::<HashSet<_>>()
        .len()
}
