//! Benchmarks for hot arithmetic paths and MODEXP backends

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keel_evm::precompile::{ModExp, ModExpBackend};
use keel_evm::word;
use keel_evm::U256;

fn bench_mod(c: &mut Criterion) {
    let a = U256::from_big_endian(&[0xab; 32]);
    let b = U256::from(0x1234_5678u64);
    c.bench_function("mod", |bench| {
        bench.iter(|| word::modulo(black_box(a), black_box(b)))
    });
    c.bench_function("smod", |bench| {
        bench.iter(|| word::smod(black_box(a), black_box(b)))
    });
}

fn bench_clz(c: &mut Criterion) {
    let mut group = c.benchmark_group("clz");
    for shift in [0usize, 100, 255] {
        let value = U256::MAX >> shift;
        group.bench_with_input(BenchmarkId::new("scan", shift), &value, |bench, v| {
            bench.iter(|| word::leading_zeros_scan(black_box(*v)))
        });
        group.bench_with_input(BenchmarkId::new("trimmed", shift), &value, |bench, v| {
            bench.iter(|| word::leading_zeros_trimmed(black_box(*v)))
        });
    }
    group.finish();
}

fn modexp_input(len: usize) -> Vec<u8> {
    let mut input = Vec::new();
    for _ in 0..3 {
        input.extend_from_slice(&keel_primitives::word_to_bytes(U256::from(len)));
    }
    input.extend((0..len).map(|i| (i * 7 + 3) as u8));
    input.extend((0..len).map(|i| (i * 13 + 1) as u8));
    input.extend((0..len).map(|i| (i * 31 + 5) as u8 | 1));
    input
}

fn bench_modexp(c: &mut Criterion) {
    let mut group = c.benchmark_group("modexp");
    for len in [32usize, 128, 512] {
        let input = modexp_input(len);
        for backend in [ModExpBackend::Portable, ModExpBackend::Accelerated] {
            let modexp = ModExp::new(u64::MAX, backend);
            group.bench_with_input(
                BenchmarkId::new(format!("{backend:?}"), len),
                &input,
                |bench, input| bench.iter(|| modexp.compute(black_box(input))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_mod, bench_clz, bench_modexp);
criterion_main!(benches);
