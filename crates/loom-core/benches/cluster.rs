use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use loom_core::{Category, ClusterEngine, ClusterRequest, Record, RelationGraph, Strategy};

const WORDS: [&str; 12] = [
    "runtime", "deploy", "garden", "recipe", "invoice", "sprint", "borrow", "kernel", "travel",
    "budget", "paper", "review",
];
const TAGS: [&str; 6] = ["rust", "ops", "home", "food", "work", "ideas"];

fn corpus(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let content: Vec<&str> = (0..8).map(|k| WORDS[(i * 7 + k * 3) % WORDS.len()]).collect();
            Record::new(format!("r{i}"), content.join(" "))
                .with_category(Category::ALL[i % Category::ALL.len()])
                .with_tags([TAGS[i % TAGS.len()], TAGS[(i / 3) % TAGS.len()]])
                .with_timestamp(loom_core::unix_to_iso8601(1_771_632_000 - (i as i64) * 3600))
        })
        .collect()
}

fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster");
    for n in [100, 500] {
        let records = corpus(n);
        for strategy in [Strategy::Tag, Strategy::Content, Strategy::Smart] {
            let request = ClusterRequest::new(strategy).with_now(1_771_632_000);
            group.bench_with_input(BenchmarkId::new(strategy.as_str(), n), &records, |b, r| {
                b.iter(|| ClusterEngine::cluster(black_box(r), &request))
            });
        }
    }
    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let records = corpus(500);
    c.bench_function("graph_500", |b| {
        b.iter(|| RelationGraph::build(black_box(&records)))
    });
}

criterion_group!(benches, bench_cluster, bench_graph);
criterion_main!(benches);
