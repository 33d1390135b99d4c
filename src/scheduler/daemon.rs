use std::time::Duration;

use chrono::Utc;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info};

use crate::pipeline::ClusterParams;
use crate::scheduler::{JobContext, Scheduler, cadence::IntervalCadence};

/// Spawns the background loop that runs a clustering pass on every cadence tick.
pub fn spawn_cluster_daemon(
    scheduler: Scheduler,
    cadence: IntervalCadence,
    params: ClusterParams,
) -> JoinHandle<()> {
    ClusterDaemon::new(scheduler, cadence, params).spawn()
}

struct ClusterDaemon {
    scheduler: Scheduler,
    cadence: IntervalCadence,
    params: ClusterParams,
}

impl ClusterDaemon {
    fn new(scheduler: Scheduler, cadence: IntervalCadence, params: ClusterParams) -> Self {
        Self {
            scheduler,
            cadence,
            params,
        }
    }

    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let state = self;
        loop {
            let now = Utc::now();
            let next = state.cadence.next_run_from(now);
            let wait = duration_until(next, now);
            info!(
                next_run_utc = %next.to_rfc3339(),
                wait_seconds = wait.as_secs(),
                "scheduled automatic cluster run"
            );
            sleep(wait).await;

            let job = JobContext::new(state.params, "daemon");
            let job_id = job.job_id;
            match state.scheduler.run_job(job).await {
                Ok(summary) => info!(
                    %job_id,
                    clusters = summary.clusters,
                    scored = summary.scored,
                    "automatic cluster run completed"
                ),
                Err(err) => error!(%job_id, error = %err, "automatic cluster run failed"),
            }

            // 境界ちょうどに終わった場合に同じ tick で再実行しない
            sleep(Duration::from_millis(1)).await;
        }
    }
}

fn duration_until(next: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> Duration {
    match (next - now).to_std() {
        Ok(duration) => duration,
        Err(_) => Duration::from_secs(0),
    }
}
