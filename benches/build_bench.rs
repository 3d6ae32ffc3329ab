use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mphkit::{
    BdzBuilder, BdzMinimalSettings, BmzBuilder, BmzMinimalSettings, ChdBuilder,
    ChdMinimalSettings, ChmBuilder, ChmMinimalSettings, HashState,
};

fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("key-{i:08}")).collect()
}

fn bench_build(c: &mut Criterion) {
    let keys = keys(10_000);
    let mut group = c.benchmark_group("build_10k");

    group.bench_function("bdz_minimal", |b| {
        b.iter(|| {
            let mut builder = BdzBuilder::with_seed(42);
            black_box(builder.try_create_minimal(&keys, &BdzMinimalSettings::default()))
        })
    });

    group.bench_function("bmz_minimal", |b| {
        b.iter(|| {
            let mut builder = BmzBuilder::with_seed(42);
            black_box(builder.try_create_minimal(&keys, &BmzMinimalSettings::default()))
        })
    });

    group.bench_function("chm_minimal", |b| {
        b.iter(|| {
            let mut builder = ChmBuilder::with_seed(42);
            black_box(builder.try_create_minimal(&keys, &ChmMinimalSettings::default()))
        })
    });

    group.bench_function("chd_minimal", |b| {
        b.iter(|| {
            let mut builder = ChdBuilder::with_seed(42);
            black_box(builder.try_create_minimal(&keys, &ChdMinimalSettings::default()))
        })
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let keys = keys(10_000);
    let mut group = c.benchmark_group("search_10k");

    let mut builder = BdzBuilder::with_seed(42);
    let bdz = builder
        .try_create_minimal(&keys, &BdzMinimalSettings::default())
        .unwrap();
    group.bench_function("bdz_minimal", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(bdz.search(key));
            }
        })
    });

    let mut builder = ChdBuilder::with_seed(42);
    let chd = builder
        .try_create_minimal(&keys, &ChdMinimalSettings::default())
        .unwrap();
    group.bench_function("chd_minimal", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(chd.search(key));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
