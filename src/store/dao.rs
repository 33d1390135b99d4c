use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Executor, Row, SqlitePool, sqlite::SqliteRow};

use super::models::{ClusterUpdate, NewRecord, Record};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    country TEXT NOT NULL DEFAULT 'cl',
    published_at DATETIME,
    fetched_at DATETIME NOT NULL DEFAULT (datetime('now')),
    cluster_id TEXT,
    score REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_news_published_at ON news(published_at DESC);
CREATE INDEX IF NOT EXISTS idx_news_source ON news(source);
CREATE INDEX IF NOT EXISTS idx_news_cluster_id ON news(cluster_id);
CREATE INDEX IF NOT EXISTS idx_news_score ON news(score DESC);
CREATE INDEX IF NOT EXISTS idx_news_country ON news(country);
";

/// Record store seam used by the clustering pipeline.
///
/// `fetch_recent` must include records without `published_at`, and
/// `apply_cluster_updates` must be all-or-nothing for the whole batch.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// ウィンドウ内（`published_at > now - window_hours`、または NULL）の記事を新しい順に取得する。
    async fn fetch_recent(&self, window_hours: u32, now: DateTime<Utc>) -> Result<Vec<Record>>;

    /// クラスタ割り当てとスコアを1トランザクションで書き戻す。
    ///
    /// 存在しない `record_id` が1件でも含まれていればバッチ全体を拒否する。
    async fn apply_cluster_updates(&self, updates: &[ClusterUpdate]) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct NewsDao {
    pool: SqlitePool,
}

impl NewsDao {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// `news` テーブルとインデックスを作成する（既存の場合は何もしない）。
    ///
    /// # Errors
    /// DDL の実行に失敗した場合はエラーを返す。
    pub async fn ensure_schema(&self) -> Result<()> {
        self.pool
            .execute(SCHEMA)
            .await
            .context("failed to create news schema")?;
        Ok(())
    }

    /// Inserts fetched records, ignoring urls that already exist. Returns the
    /// number of rows actually inserted.
    ///
    /// # Errors
    /// Fails if the transaction cannot be opened, an insert fails or the commit fails.
    pub async fn insert_records(&self, records: &[NewRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(
                r"
                INSERT OR IGNORE INTO news (title, url, source, country, published_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(&record.title)
            .bind(&record.url)
            .bind(&record.source)
            .bind(&record.country)
            .bind(record.published_at)
            .execute(&mut *tx)
            .await
            .context("failed to insert news record")?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await.context("failed to commit news records")?;

        Ok(inserted)
    }

    /// クラスタIDに紐づく出典の一覧（重複なし、昇順）。
    ///
    /// # Errors
    /// クエリの実行に失敗した場合はエラーを返す。
    pub async fn cluster_sources(&self, cluster_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT source FROM news WHERE cluster_id = ?1 ORDER BY source",
        )
        .bind(cluster_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load cluster sources")?;

        rows.iter()
            .map(|row| row.try_get("source").context("failed to read source column"))
            .collect()
    }

    /// Loads a single record by id, mainly for inspection after a run.
    ///
    /// # Errors
    /// Fails if the query fails or the row cannot be decoded.
    pub async fn find_record(&self, id: i64) -> Result<Option<Record>> {
        let row = sqlx::query(
            r"
            SELECT id, title, source, published_at, CAST(cluster_id AS TEXT) AS cluster_id, score
            FROM news
            WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load news record")?;

        row.as_ref().map(record_from_row).transpose()
    }
}

#[async_trait]
impl RecordStore for NewsDao {
    async fn fetch_recent(&self, window_hours: u32, now: DateTime<Utc>) -> Result<Vec<Record>> {
        let cutoff = now - Duration::hours(i64::from(window_hours));

        // julianday() で比較し、保存フォーマットの揺れ（'T' 区切り / 空白区切り）を吸収する
        let rows = sqlx::query(
            r"
            SELECT id, title, source, published_at, CAST(cluster_id AS TEXT) AS cluster_id, score
            FROM news
            WHERE published_at IS NULL
               OR julianday(published_at) > julianday(?1)
            ORDER BY published_at IS NULL, julianday(published_at) DESC, id DESC
            ",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch recent news records")?;

        rows.iter().map(record_from_row).collect()
    }

    async fn apply_cluster_updates(&self, updates: &[ClusterUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        for update in updates {
            let result =
                sqlx::query("UPDATE news SET cluster_id = ?1, score = ?2 WHERE id = ?3")
                    .bind(update.cluster_id.to_string())
                    .bind(update.score)
                    .bind(update.record_id)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| {
                        format!("failed to update cluster for record {}", update.record_id)
                    })?;

            if result.rows_affected() == 0 {
                bail!("record {} does not exist", update.record_id);
            }
        }

        // 途中で失敗した場合は tx が drop されてロールバックされる
        tx.commit()
            .await
            .context("failed to commit cluster updates")?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("record store ping failed")?;
        Ok(())
    }
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    Ok(Record {
        id: row.try_get("id").context("failed to read id")?,
        title: row.try_get("title").context("failed to read title")?,
        source: row.try_get("source").context("failed to read source")?,
        published_at: row
            .try_get("published_at")
            .context("failed to read published_at")?,
        cluster_id: row
            .try_get("cluster_id")
            .context("failed to read cluster_id")?,
        score: row
            .try_get::<Option<f64>, _>("score")
            .context("failed to read score")?
            .unwrap_or(0.0),
    })
}
