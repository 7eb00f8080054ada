//! Benchmarks for sparse matrix multiplication

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hetspgemm::{multiply_cpu, CpuStrategy, CsrMatrix, EngineConfig, HostDevice, SpGemmEngine};

/// Banded `n × n` matrix with `band` diagonals on each side
fn create_banded_matrix(n: usize, band: usize) -> CsrMatrix {
    let mut triples = Vec::new();
    for i in 0..n {
        let lo = i.saturating_sub(band);
        let hi = (i + band + 1).min(n);
        for j in lo..hi {
            triples.push((i, j, 1.0 + (i + j) as f32 % 3.0));
        }
    }
    CsrMatrix::from_coo(&triples, n, n).unwrap()
}

/// Pseudo-random binary matrix, about `per_row` entries per row
fn create_scattered_binary(n: usize, per_row: usize) -> CsrMatrix {
    let mut triples = Vec::new();
    let mut state = 0x2545_f491_u64;
    for i in 0..n {
        for _ in 0..per_row {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            triples.push((i, (state % n as u64) as usize, 1.0));
        }
    }
    // Duplicates are summed; fold them back to ones
    let summed = CsrMatrix::from_coo(&triples, n, n).unwrap();
    CsrMatrix::new_binary(n, n, summed.row_ptr().to_vec(), summed.col_idx().to_vec()).unwrap()
}

fn bench_cpu_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu");
    for &n in &[64, 256] {
        let a = create_banded_matrix(n, 3);
        for strategy in [CpuStrategy::Merge, CpuStrategy::Dense, CpuStrategy::RowAccumulate] {
            group.bench_with_input(BenchmarkId::new(strategy.to_string(), n), &a, |bench, a| {
                bench.iter(|| multiply_cpu(black_box(a), black_box(a), strategy).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_host_device(c: &mut Criterion) {
    let mut group = c.benchmark_group("host-device");
    group.sample_size(20);

    let a = create_scattered_binary(128, 4);
    let dense = EngineConfig {
        nnz_weight: usize::MAX,
        ..EngineConfig::default()
    };
    let coo = EngineConfig {
        use_coo_always: true,
        ..EngineConfig::default()
    };

    for (name, config) in [("dense", dense), ("coo", coo)] {
        let engine = SpGemmEngine::new(HostDevice::new(), config).unwrap();
        group.bench_function(name, |bench| bench.iter(|| engine.multiply(black_box(&a), black_box(&a)).unwrap()));
    }
    group.finish();
}

criterion_group!(benches, bench_cpu_strategies, bench_host_device);
criterion_main!(benches);
