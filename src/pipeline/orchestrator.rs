//! Single entry point of a clustering pass: fetch window → cluster → score → write.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::dao::RecordStore;

use super::cluster::{cluster_records, unique_sources};
use super::config::ClusterParams;
use super::score::build_updates;

/// 1回のクラスタリング実行の結果サマリ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Records read from the window.
    pub window_records: usize,
    pub clusters: usize,
    /// Clusters backed by at least two distinct sources.
    pub multi_source: usize,
    /// Records whose cluster id and score were written.
    pub scored: usize,
}

impl RunSummary {
    fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            window_records: 0,
            clusters: 0,
            multi_source: 0,
            scored: 0,
        }
    }
}

pub struct StoryPipeline {
    store: Arc<dyn RecordStore>,
}

impl StoryPipeline {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Runs one clustering pass over the records of the window ending at `now`.
    ///
    /// An empty window is a successful no-op. Store failures abort the pass
    /// before anything is partially applied.
    ///
    /// # Errors
    /// Invalid parameters, a failed fetch or a rejected update batch.
    pub async fn run(&self, params: &ClusterParams, now: DateTime<Utc>) -> Result<RunSummary> {
        params.validate().context("invalid cluster parameters")?;
        let run_id = Uuid::now_v7();

        let records = self
            .store
            .fetch_recent(params.window_hours, now)
            .await
            .context("failed to fetch recent records")?;

        if records.is_empty() {
            info!(%run_id, window_hours = params.window_hours, "no records in window, nothing to cluster");
            return Ok(RunSummary::empty(run_id));
        }

        let window_records = records.len();
        debug!(%run_id, window_records, "clustering window");

        let clusters = cluster_records(records, params.similarity_threshold);
        let multi_source = clusters
            .iter()
            .filter(|cluster| unique_sources(cluster) > 1)
            .count();
        let updates = build_updates(&clusters, now, params);

        self.store
            .apply_cluster_updates(&updates)
            .await
            .context("failed to apply cluster updates")?;

        let summary = RunSummary {
            run_id,
            window_records,
            clusters: clusters.len(),
            multi_source,
            scored: updates.len(),
        };

        info!(
            %run_id,
            clusters = summary.clusters,
            multi_source = summary.multi_source,
            scored = summary.scored,
            "cluster run completed"
        );

        Ok(summary)
    }
}
