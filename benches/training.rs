use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use wbpe::{CountingStrategy, Trainer, TrainerConfig};

const STEMS: &[&str] = &[
    "low", "new", "wid", "strong", "read", "play", "walk", "talk", "build", "train",
];
const SUFFIXES: &[&str] = &["", "er", "est", "ing", "ed", "s", "ness", "ly"];

fn build_corpus() -> String {
    let mut corpus = String::with_capacity(1 << 20);
    let mut line = 0usize;
    while corpus.len() < (1 << 20) {
        for (i, stem) in STEMS.iter().enumerate() {
            let suffix = SUFFIXES[(i + line) % SUFFIXES.len()];
            corpus.push_str(stem);
            corpus.push_str(suffix);
            corpus.push(' ');
        }
        corpus.push('\n');
        line += 1;
    }
    corpus
}

fn bench_training(c: &mut Criterion) {
    let corpus = build_corpus();

    let mut group = c.benchmark_group("train_text_corpus");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.sampling_mode(SamplingMode::Flat);
    for (label, counting) in [
        ("incremental", CountingStrategy::Incremental),
        ("recount", CountingStrategy::Recount),
    ] {
        let cfg = TrainerConfig::builder()
            .num_merges(200)
            .counting(counting)
            .show_progress(false)
            .build()
            .expect("configuration");
        group.bench_function(BenchmarkId::new("MiB_1", label), |b| {
            b.iter(|| {
                let trainer = Trainer::new(cfg.clone());
                let artifacts = trainer.train_from_text(&corpus).expect("training");
                let _ = black_box(artifacts);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_training);
criterion_main!(benches);
