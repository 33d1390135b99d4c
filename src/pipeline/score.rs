//! Cluster scoring: source diversity decayed by age.
//!
//! ```text
//! base       = unique_sources * points_per_source
//! multiplier = exp(-age_hours / decay_hours)
//! score      = round(base * multiplier, 2)   (0 when unique_sources == 1)
//! ```
//!
//! Age is measured from the oldest member. Undated members and members dated
//! in the future count as published at `now`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::models::{ClusterUpdate, Record};

use super::cluster::unique_sources;
use super::config::ClusterParams;

/// Hours between `now` and the oldest known timestamp in the cluster.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cluster_age_hours(cluster: &[Record], now: DateTime<Utc>) -> f64 {
    let oldest = cluster
        .iter()
        .map(|record| record.published_at.map_or(now, |published| published.min(now)))
        .min()
        .unwrap_or(now);

    (now - oldest).num_milliseconds() as f64 / 3_600_000.0
}

#[must_use]
pub fn recency_multiplier(age_hours: f64, decay_hours: f64) -> f64 {
    (-age_hours / decay_hours).exp()
}

/// Score of one cluster at `now`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_cluster(cluster: &[Record], now: DateTime<Utc>, params: &ClusterParams) -> f64 {
    let sources = unique_sources(cluster);
    if sources <= 1 {
        return 0.0;
    }

    let base = sources as f64 * params.points_per_source;
    let multiplier = recency_multiplier(cluster_age_hours(cluster, now), params.decay_hours);
    round_to_cents(base * multiplier)
}

/// Gives every member of each cluster the cluster's score and a fresh,
/// globally unique cluster id.
#[must_use]
pub fn build_updates(
    clusters: &[Vec<Record>],
    now: DateTime<Utc>,
    params: &ClusterParams,
) -> Vec<ClusterUpdate> {
    let mut updates = Vec::with_capacity(clusters.iter().map(Vec::len).sum());

    for cluster in clusters {
        let cluster_id = Uuid::now_v7();
        let score = score_cluster(cluster, now, params);
        updates.extend(cluster.iter().map(|record| ClusterUpdate {
            record_id: record.id,
            cluster_id,
            score,
        }));
    }

    updates
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
