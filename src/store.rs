pub mod dao;
pub mod memory;
pub mod models;

pub use dao::{NewsDao, RecordStore};
pub use memory::InMemoryRecordStore;
pub use models::{ClusterUpdate, NewRecord, Record};
