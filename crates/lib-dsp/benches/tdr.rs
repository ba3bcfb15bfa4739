//! TDR transform performance benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lib_dsp::tdr::{MirroredIfft, Radix2Legacy, TdrParams, TdrStrategy};
use lib_types::SamplePoint;

fn sweep(n: usize, stop_khz: f64) -> Vec<SamplePoint> {
    (0..n)
        .map(|i| {
            let f = stop_khz * i as f64 / (n - 1) as f64;
            // Open stub a few meters down the line
            let phase = f * 1e-4;
            SamplePoint::new(f, 50.0 + 40.0 * phase.cos(), 30.0 * phase.sin())
        })
        .collect()
}

fn bench_tdr(c: &mut Criterion) {
    let mut group = c.benchmark_group("tdr");
    let params = TdrParams::default();

    for n in [501usize, 1000, 4000, 8000].iter() {
        let samples = sweep(*n, 30_000.0);

        group.bench_with_input(BenchmarkId::new("mirrored", n), &samples, |b, s| {
            b.iter(|| MirroredIfft.transform(black_box(s), &params));
        });

        group.bench_with_input(BenchmarkId::new("legacy", n), &samples, |b, s| {
            b.iter(|| Radix2Legacy.transform(black_box(s), &params));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tdr);
criterion_main!(benches);
