use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 1件の記事タイトル（フィードから取得したもの）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub cluster_id: Option<String>,
    pub score: f64,
}

impl Record {
    #[must_use]
    pub fn new(
        id: i64,
        title: impl Into<String>,
        source: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            source: source.into(),
            published_at,
            cluster_id: None,
            score: 0.0,
        }
    }
}

/// Ingestion-side payload. The store assigns `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub title: String,
    pub url: String,
    pub source: String,
    pub country: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewRecord {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            country: "cl".to_string(),
            published_at,
        }
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }
}

/// クラスタリング結果として書き戻す (record, cluster, score) の三つ組。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterUpdate {
    pub record_id: i64,
    pub cluster_id: Uuid,
    pub score: f64,
}
