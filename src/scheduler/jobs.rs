use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    observability::metrics::Metrics,
    pipeline::{ClusterParams, RunSummary, StoryPipeline},
};

#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: Uuid,
    pub params: ClusterParams,
    pub trigger: &'static str,
    /// Fixed clock for the run; `None` reads the wall clock when the job starts.
    pub now: Option<DateTime<Utc>>,
}

impl JobContext {
    #[must_use]
    pub fn new(params: ClusterParams, trigger: &'static str) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            params,
            trigger,
            now: None,
        }
    }

    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

#[derive(Clone)]
pub struct Scheduler {
    pipeline: Arc<StoryPipeline>,
    metrics: Arc<Metrics>,
}

impl Scheduler {
    #[must_use]
    pub fn new(pipeline: Arc<StoryPipeline>, metrics: Arc<Metrics>) -> Self {
        Self { pipeline, metrics }
    }

    /// Runs one clustering pass. The caller owns retry policy.
    ///
    /// # Errors
    /// Propagates the pipeline error after counting and logging it.
    pub async fn run_job(&self, context: JobContext) -> Result<RunSummary> {
        tracing::info!(
            job_id = %context.job_id,
            trigger = context.trigger,
            window_hours = context.params.window_hours,
            similarity_threshold = context.params.similarity_threshold,
            "running cluster job"
        );

        let started = Instant::now();
        let now = context.now.unwrap_or_else(Utc::now);
        let result = self.pipeline.run(&context.params, now).await;
        self.metrics
            .run_duration
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(summary) => {
                self.metrics.record_run(&summary);
                Ok(summary)
            }
            Err(e) => {
                self.metrics.runs_failed.inc();
                let message = format!("{e:#}");
                tracing::error!(job_id = %context.job_id, error = %message, "cluster job failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryRecordStore;
    use crate::store::models::Record;
    use chrono::TimeZone;
    use prometheus::Registry;

    fn scheduler(store: Arc<InMemoryRecordStore>) -> (Scheduler, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new(Arc::new(Registry::new())).expect("metrics"));
        let pipeline = Arc::new(StoryPipeline::new(store));
        (Scheduler::new(pipeline, Arc::clone(&metrics)), metrics)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn successful_job_updates_metrics() {
        let store = Arc::new(InMemoryRecordStore::new(vec![
            Record::new(1, "Senate passes budget bill", "a", Some(now())),
            Record::new(2, "Budget bill passed by Senate", "b", Some(now())),
        ]));
        let (scheduler, metrics) = scheduler(store);

        let summary = scheduler
            .run_job(JobContext::new(ClusterParams::default(), "test").at(now()))
            .await
            .expect("job succeeds");

        assert_eq!(summary.multi_source, 1);
        assert!((metrics.runs_completed.get() - 1.0).abs() < f64::EPSILON);
        assert!((metrics.records_scored.get() - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_job_is_counted_and_returned() {
        let store = Arc::new(InMemoryRecordStore::new(vec![Record::new(
            1,
            "t",
            "a",
            Some(now()),
        )]));
        store.fail_next_apply();
        let (scheduler, metrics) = scheduler(store);

        let result = scheduler
            .run_job(JobContext::new(ClusterParams::default(), "test").at(now()))
            .await;

        assert!(result.is_err());
        assert!((metrics.runs_failed.get() - 1.0).abs() < f64::EPSILON);
        assert!(metrics.runs_completed.get().abs() < f64::EPSILON);
    }
}
