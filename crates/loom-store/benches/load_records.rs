use criterion::{Criterion, black_box, criterion_group, criterion_main};
use loom_core::{Record, RecordFilter};
use loom_store::Store;

fn seeded(n: usize) -> Store {
    let store = Store::open_in_memory().unwrap();
    let records: Vec<Record> = (0..n)
        .map(|i| {
            Record::new(format!("r{i}"), format!("note number {i} about topic {}", i % 17))
                .with_project(if i % 2 == 0 { "alpha" } else { "beta" })
                .with_tags([format!("t{}", i % 9), format!("t{}", i % 4)])
                .with_timestamp(loom_core::unix_to_iso8601(1_771_632_000 - i as i64 * 600))
        })
        .collect();
    store.upsert_records(&records).unwrap();
    store
}

fn bench_upsert(c: &mut Criterion) {
    c.bench_function("upsert_1000", |b| b.iter(|| seeded(black_box(1000))));
}

fn bench_load(c: &mut Criterion) {
    let store = seeded(2000);
    let all = RecordFilter::default();
    let narrowed = RecordFilter {
        project: Some("alpha".into()),
        tags: vec!["t3".into()],
        limit: Some(500),
        ..Default::default()
    };
    c.bench_function("load_all_2000", |b| {
        b.iter(|| store.load_records(black_box(&all)).unwrap())
    });
    c.bench_function("load_filtered_2000", |b| {
        b.iter(|| store.load_records(black_box(&narrowed)).unwrap())
    });
}

criterion_group!(benches, bench_upsert, bench_load);
criterion_main!(benches);
