//! Process-local `RecordStore`, used for dry runs and tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::dao::RecordStore;
use super::models::{ClusterUpdate, Record};

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<Record>>,
    fail_next_apply: AtomicBool,
    apply_calls: Mutex<usize>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Makes the next `apply_cluster_updates` call fail without touching any record.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn record(&self, id: i64) -> Option<Record> {
        self.records().into_iter().find(|record| record.id == id)
    }

    #[must_use]
    pub fn apply_calls(&self) -> usize {
        self.apply_calls.lock().map(|calls| *calls).unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_recent(&self, window_hours: u32, now: DateTime<Utc>) -> Result<Vec<Record>> {
        let cutoff = now - Duration::hours(i64::from(window_hours));
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("record store mutex poisoned"))?;

        let mut recent: Vec<Record> = records
            .iter()
            .filter(|record| record.published_at.is_none_or(|published| published > cutoff))
            .cloned()
            .collect();
        // published_at 降順、NULL は末尾
        recent.sort_by(|a, b| {
            b.published_at
                .is_some()
                .cmp(&a.published_at.is_some())
                .then_with(|| b.published_at.cmp(&a.published_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(recent)
    }

    async fn apply_cluster_updates(&self, updates: &[ClusterUpdate]) -> Result<()> {
        if let Ok(mut calls) = self.apply_calls.lock() {
            *calls += 1;
        }
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            bail!("record store rejected cluster update batch");
        }

        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("record store mutex poisoned"))?;

        // 全件の存在を先に確認してから書き込む（部分適用を避ける）
        for update in updates {
            if !records.iter().any(|record| record.id == update.record_id) {
                bail!("record {} does not exist", update.record_id);
            }
        }
        for update in updates {
            if let Some(record) = records.iter_mut().find(|record| record.id == update.record_id) {
                record.cluster_id = Some(update.cluster_id.to_string());
                record.score = update.score;
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
