//! Prometheusメトリクス定義。
use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

use crate::pipeline::RunSummary;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub runs_completed: Counter,
    pub runs_failed: Counter,
    pub clusters_found: Counter,
    pub cross_source_clusters: Counter,
    pub records_scored: Counter,

    // ヒストグラム
    pub run_duration: Histogram,

    // ゲージ
    pub last_window_records: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    ///
    /// # Errors
    /// 同名のメトリクスが既に登録されている場合はエラーを返す。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            runs_completed: register_counter_with_registry!(
                "story_runs_completed_total",
                "Total number of clustering runs completed",
                registry
            )?,
            runs_failed: register_counter_with_registry!(
                "story_runs_failed_total",
                "Total number of clustering runs failed",
                registry
            )?,
            clusters_found: register_counter_with_registry!(
                "story_clusters_found_total",
                "Total number of clusters found across runs",
                registry
            )?,
            cross_source_clusters: register_counter_with_registry!(
                "story_cross_source_clusters_total",
                "Total number of clusters backed by two or more sources",
                registry
            )?,
            records_scored: register_counter_with_registry!(
                "story_records_scored_total",
                "Total number of records written with a cluster id and score",
                registry
            )?,
            run_duration: register_histogram_with_registry!(
                "story_run_duration_seconds",
                "Duration of a full clustering run",
                registry
            )?,
            last_window_records: register_gauge_with_registry!(
                "story_last_window_records",
                "Number of records in the window of the last successful run",
                registry
            )?,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_run(&self, summary: &RunSummary) {
        self.runs_completed.inc();
        self.clusters_found.inc_by(summary.clusters as f64);
        self.cross_source_clusters.inc_by(summary.multi_source as f64);
        self.records_scored.inc_by(summary.scored as f64);
        self.last_window_records.set(summary.window_records as f64);
    }
}
