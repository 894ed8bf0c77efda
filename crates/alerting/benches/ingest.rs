use alerting::AlertManager;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use signal_policy::{SignalType, Tier};

/// Benchmark ingest on a key that already has an open alert (hot path)
fn bench_ingest_open_alert(c: &mut Criterion) {
    let manager = AlertManager::default();
    manager.ingest("model-a", &SignalType::DataDrift, Tier::High);

    c.bench_function("ingest_open_alert", |b| {
        b.iter(|| manager.ingest(black_box("model-a"), &SignalType::DataDrift, black_box(Tier::High)));
    });
}

/// Benchmark queries with a growing number of subjects
fn bench_query_by_subject_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_by_subject_count");

    for subjects in [10usize, 100, 1000].iter() {
        let manager = AlertManager::default();
        for i in 0..*subjects {
            manager.ingest(&format!("model-{}", i), &SignalType::BiasScore, Tier::High);
        }
        group.bench_with_input(BenchmarkId::from_parameter(subjects), subjects, |b, _| {
            b.iter(|| manager.query(black_box(&Default::default())));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ingest_open_alert, bench_query_by_subject_count);
criterion_main!(benches);
