pub mod cluster;
pub mod config;
pub mod normalize;
pub mod orchestrator;
pub mod score;
pub mod similarity;

pub use cluster::cluster_records;
pub use config::{ClusterParams, ParamsError};
pub use normalize::normalize_title;
pub use orchestrator::{RunSummary, StoryPipeline};
pub use score::score_cluster;
pub use similarity::similarity;
