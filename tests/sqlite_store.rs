// SQLite ストアに対するクラスタリング実行のエンドツーエンドテスト。
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use story_worker::pipeline::{ClusterParams, StoryPipeline};
use story_worker::store::{NewRecord, NewsDao};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

async fn seeded_dao() -> NewsDao {
    // :memory: はコネクションごとに別DBになるので1本に絞る
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let dao = NewsDao::new(pool);
    dao.ensure_schema().await.expect("schema");

    let hour_ago = now() - Duration::hours(1);
    let inserted = dao
        .insert_records(&[
            NewRecord::new(
                "Senate passes budget bill",
                "https://a.example/1",
                "a",
                Some(hour_ago),
            ),
            NewRecord::new(
                "BREAKING: Budget bill passed by Senate",
                "https://b.example/1",
                "b",
                Some(hour_ago),
            ),
            NewRecord::new(
                "Local team wins championship",
                "https://c.example/1",
                "c",
                None,
            ),
            NewRecord::new(
                "Senate passes budget bill",
                "https://d.example/1",
                "d",
                Some(now() - Duration::hours(100)),
            ),
        ])
        .await
        .expect("insert");
    assert_eq!(inserted, 4);

    dao
}

#[tokio::test]
async fn run_writes_clusters_and_scores_for_the_window() {
    let dao = Arc::new(seeded_dao().await);
    let pipeline = StoryPipeline::new(dao.clone());

    let summary = pipeline
        .run(&ClusterParams::default(), now())
        .await
        .expect("run succeeds");

    assert_eq!(summary.window_records, 3);
    assert_eq!(summary.clusters, 2);
    assert_eq!(summary.multi_source, 1);
    assert_eq!(summary.scored, 3);

    let first = dao.find_record(1).await.unwrap().unwrap();
    let second = dao.find_record(2).await.unwrap().unwrap();
    let undated = dao.find_record(3).await.unwrap().unwrap();
    let stale = dao.find_record(4).await.unwrap().unwrap();

    let cluster_id = first.cluster_id.clone().expect("cluster assigned");
    assert_eq!(second.cluster_id.as_deref(), Some(cluster_id.as_str()));
    assert!((first.score - 57.55).abs() < 1e-9);
    assert!((second.score - 57.55).abs() < 1e-9);

    assert!(undated.cluster_id.is_some());
    assert_ne!(undated.cluster_id, first.cluster_id);
    assert!(undated.score.abs() < f64::EPSILON);

    assert_eq!(stale.cluster_id, None);
    assert!(stale.score.abs() < f64::EPSILON);

    assert_eq!(
        dao.cluster_sources(&cluster_id).await.unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[tokio::test]
async fn rerun_reassigns_ids_with_the_same_grouping() {
    let dao = Arc::new(seeded_dao().await);
    let pipeline = StoryPipeline::new(dao.clone());

    pipeline
        .run(&ClusterParams::default(), now())
        .await
        .expect("first run");
    let before = dao.find_record(1).await.unwrap().unwrap();

    pipeline
        .run(&ClusterParams::default(), now())
        .await
        .expect("second run");
    let after = dao.find_record(1).await.unwrap().unwrap();
    let partner = dao.find_record(2).await.unwrap().unwrap();

    assert_ne!(before.cluster_id, after.cluster_id);
    assert_eq!(after.cluster_id, partner.cluster_id);
    assert!((before.score - after.score).abs() < f64::EPSILON);
}

#[tokio::test]
async fn wider_window_pulls_in_older_records() {
    let dao = Arc::new(seeded_dao().await);
    let pipeline = StoryPipeline::new(dao.clone());

    let summary = pipeline
        .run(&ClusterParams::default().with_window_hours(200), now())
        .await
        .expect("run succeeds");

    assert_eq!(summary.window_records, 4);
    let stale = dao.find_record(4).await.unwrap().unwrap();
    assert!(stale.cluster_id.is_some());
}
