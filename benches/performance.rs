//! 72時間ウィンドウ相当の記事数でのクラスタリング性能ベンチマーク。
use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use story_worker::pipeline::{ClusterParams, cluster_records, normalize_title};
use story_worker::store::Record;

const WORDS: [&str; 12] = [
    "senate", "budget", "bill", "storm", "coast", "election", "minister", "court", "ruling",
    "strike", "market", "vote",
];

fn synthetic_records(count: usize, sources: usize) -> Vec<Record> {
    let now = Utc::now();
    (0..count)
        .map(|i| {
            let title = (0..5)
                .map(|offset| WORDS[(i * 7 + offset * 3) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ");
            Record::new(
                i64::try_from(i).unwrap_or(i64::MAX),
                format!("BREAKING: {title}"),
                format!("source-{}", i % sources),
                Some(now),
            )
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let records = synthetic_records(1024, 8);
    c.bench_function("normalize_titles_1k", |b| {
        b.iter(|| {
            for record in &records {
                black_box(normalize_title(&record.title));
            }
        });
    });
}

fn bench_clustering(c: &mut Criterion) {
    let records = synthetic_records(500, 12);
    let threshold = ClusterParams::default().similarity_threshold;

    c.bench_function("cluster_records_500", |b| {
        b.iter(|| {
            let clusters = cluster_records(records.clone(), threshold);
            black_box(clusters.len());
        });
    });
}

criterion_group!(benches, bench_normalize, bench_clustering);
criterion_main!(benches);
