pub mod cadence;
pub mod daemon;
pub mod jobs;

pub use cadence::IntervalCadence;
pub use daemon::spawn_cluster_daemon;
pub use jobs::{JobContext, Scheduler};
