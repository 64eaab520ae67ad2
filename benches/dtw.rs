use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tracklib::comparison::{dtw, fast_dtw, DtwParams};
use tracklib::Track;

/// Random walk with unit-bounded steps.
fn walk(rng: &mut StdRng, n: usize) -> Track {
    let (mut x, mut y) = (0.0, 0.0);
    let pts: Vec<(f64, f64)> = (0..n)
        .map(|_| {
            x += rng.random_range(-1.0..1.0);
            y += rng.random_range(-1.0..1.0);
            (x, y)
        })
        .collect();
    Track::from_xy(&pts)
}

fn bench_dtw(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let mut group = c.benchmark_group("dtw");
    for n in [100usize, 500, 1000] {
        let a = walk(&mut rng, n);
        let b = walk(&mut rng, n + n / 3);
        let params = DtwParams::default();

        group.bench_with_input(BenchmarkId::new("full", n), &n, |bch, _| {
            bch.iter(|| dtw(black_box(&a), black_box(&b), &params).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("band_20", n), &n, |bch, _| {
            bch.iter(|| fast_dtw(black_box(&a), black_box(&b), 20, 2.0).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dtw);
criterion_main!(benches);
