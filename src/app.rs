use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::{
    api,
    config::Config,
    observability::Telemetry,
    pipeline::StoryPipeline,
    scheduler::Scheduler,
    store::dao::{NewsDao, RecordStore},
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    scheduler: Scheduler,
    store: Arc<dyn RecordStore>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.registry.scheduler
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn store(&self) -> &Arc<dyn RecordStore> {
        &self.registry.store
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// # Errors
    /// Telemetry の初期化、`SQLite` への接続、スキーマ作成のいずれかが失敗した場合はエラーを返す。
    pub async fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let pool = connect_pool(&config).await?;
        let dao = NewsDao::new(pool);
        dao.ensure_schema()
            .await
            .context("failed to prepare news schema")?;

        Ok(Self::from_parts(config, Arc::new(dao), telemetry))
    }

    /// Wires the pipeline and scheduler around an already constructed store.
    #[must_use]
    pub fn from_parts(config: Config, store: Arc<dyn RecordStore>, telemetry: Telemetry) -> Self {
        let pipeline = Arc::new(StoryPipeline::new(Arc::clone(&store)));
        let scheduler = Scheduler::new(pipeline, telemetry.metrics_arc());

        Self {
            config: Arc::new(config),
            telemetry,
            scheduler,
            store,
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

async fn connect_pool(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(config.db_dsn())
        .context("failed to parse STORY_DB_DSN")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    // sqlite はファイルは作るがディレクトリは作らない
    if let Some(parent) = options
        .get_filename()
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    SqlitePoolOptions::new()
        .max_connections(config.db_max_connections())
        .min_connections(1)
        .acquire_timeout(config.db_acquire_timeout())
        .connect_with(options)
        .await
        .context("failed to open news database")
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::store::memory::InMemoryRecordStore;

    fn memory_config() -> Config {
        let vars = HashMap::from([
            ("STORY_DB_DSN", "sqlite::memory:"),
            ("STORY_DB_MAX_CONNECTIONS", "1"),
            ("STORY_CLUSTER_INTERVAL_MINUTES", "0"),
        ]);
        Config::from_lookup(|name| vars.get(name).map(|v| (*v).to_string())).expect("config")
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn component_registry_builds_against_sqlite() {
        let registry = ComponentRegistry::build(memory_config())
            .await
            .expect("registry builds");
        let (status, body) = get(build_router(registry), "/health/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ready"));
    }

    #[tokio::test]
    async fn liveness_and_metrics_are_served() {
        let registry = ComponentRegistry::from_parts(
            memory_config(),
            Arc::new(InMemoryRecordStore::default()),
            Telemetry::without_tracing().expect("telemetry"),
        );
        let router = build_router(registry);

        let (status, body) = get(router.clone(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("live"));

        let (status, body) = get(router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("story_runs_completed_total"));
    }

    #[tokio::test]
    async fn unreachable_store_reports_degraded() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("pool");
        pool.close().await;

        let registry = ComponentRegistry::from_parts(
            memory_config(),
            Arc::new(NewsDao::new(pool)),
            Telemetry::without_tracing().expect("telemetry"),
        );
        let (status, body) = get(build_router(registry), "/health/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("degraded"));
    }
}
