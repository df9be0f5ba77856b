use criterion::{black_box, criterion_group, criterion_main, Criterion};
use orfeval_ml::{split, Classifier, Dataset, FeedForward, TrainConfig};

fn random_dataset(n: usize, d: usize, seed: u64) -> Dataset {
    let mut state = seed;
    let embeddings: Vec<f64> = (0..n * d)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect();
    let labels = (0..n).map(|i| i % 2).collect();
    let index = (0..n).map(|i| format!("g{i}")).collect();
    Dataset::new(embeddings, d, index, Some(labels), None).unwrap()
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");

    let net = FeedForward::new([1024, 512, 2], 42).unwrap();
    let batch = random_dataset(16, 1024, 1);

    group.bench_function("batch16_1024x512x2", |b| {
        b.iter(|| net.forward(black_box(batch.embeddings())).unwrap())
    });

    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    let data = random_dataset(500, 64, 7);
    let config = TrainConfig {
        epochs: 2,
        lr: 1e-3,
        progress: false,
        ..Default::default()
    };

    group.bench_function("500x64_2_epochs", |b| {
        b.iter(|| {
            let mut datasets = split(&data, 0.2, 42).unwrap();
            let mut model = Classifier::new([64, 32, 2], 42).unwrap();
            model.scale(&mut datasets.train, true).unwrap();
            model.scale(&mut datasets.test, false).unwrap();
            model.fit(black_box(&datasets), &config).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_forward, bench_fit);
criterion_main!(benches);
