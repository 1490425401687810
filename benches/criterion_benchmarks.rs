use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use romdelta::delta;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn mutate(base: &[u8], stride: usize) -> Vec<u8> {
    let mut out = base.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] = out[i].wrapping_add(1);
    }
    out
}

fn bench_encode(c: &mut Criterion) {
    let mut g = c.benchmark_group("encode");
    for size in [1024usize, 4096] {
        let reference = gen_data(size, 123);
        let target = mutate(&reference, 64);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| delta::encode(black_box(&reference), black_box(&target)).unwrap());
        });
    }
    g.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode");
    for size in [1024usize, 4096, 16 * 1024] {
        let reference = gen_data(size, 7);
        let target = mutate(&reference, 64);
        let stream = delta::encode(&reference, &target).unwrap();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| delta::decode(black_box(&reference), black_box(&stream)).unwrap());
        });
    }
    g.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
