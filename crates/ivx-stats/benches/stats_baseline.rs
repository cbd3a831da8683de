use criterion::{Criterion, criterion_group, criterion_main};
use ivx_backend::CpuBackend;
use ivx_core::{DType, Tensor};
use ivx_stats::{ReduceOptions, ScanOptions, Stats};

fn matrix_64x64() -> Tensor {
    let data: Vec<f64> = (0..64 * 64).map(|i| i as f64 * 0.001).collect();
    Tensor::from_f64(DType::F32, &[64, 64], &data).unwrap()
}

fn bench_sum_all(c: &mut Criterion) {
    let backend = CpuBackend::default();
    let stats = Stats::new(&backend);
    let input = matrix_64x64();
    let options = ReduceOptions::new();
    c.bench_function("reduce/sum_all_64x64_f32", |bencher| {
        bencher.iter(|| stats.sum(&input, &options))
    });
}

fn bench_prod_per_axis(c: &mut Criterion) {
    let backend = CpuBackend::default();
    let stats = Stats::new(&backend);
    let input = matrix_64x64();
    let options = ReduceOptions::new().axis([0, 1]);
    c.bench_function("reduce/prod_two_axes_64x64_f32", |bencher| {
        bencher.iter(|| stats.prod(&input, &options))
    });
}

fn bench_var_custom_correction(c: &mut Criterion) {
    let backend = CpuBackend::default();
    let stats = Stats::new(&backend);
    let input = matrix_64x64();
    let options = ReduceOptions::new().axis(0).correction(2.5);
    c.bench_function("reduce/var_correction_2_5_64x64_f32", |bencher| {
        bencher.iter(|| stats.var(&input, &options))
    });
}

fn bench_cumsum_inclusive(c: &mut Criterion) {
    let backend = CpuBackend::default();
    let stats = Stats::new(&backend);
    let input = matrix_64x64();
    let options = ScanOptions::new().axis(1);
    c.bench_function("scan/cumsum_inclusive_64x64_f32", |bencher| {
        bencher.iter(|| stats.cumsum(&input, &options))
    });
}

fn bench_cumsum_exclusive_reverse(c: &mut Criterion) {
    let backend = CpuBackend::default();
    let stats = Stats::new(&backend);
    let input = matrix_64x64();
    let options = ScanOptions::new().axis(0).exclusive(true).reverse(true);
    c.bench_function("scan/cumsum_exclusive_reverse_64x64_f32", |bencher| {
        bencher.iter(|| stats.cumsum(&input, &options))
    });
}

criterion_group!(
    benches,
    bench_sum_all,
    bench_prod_per_axis,
    bench_var_custom_correction,
    bench_cumsum_inclusive,
    bench_cumsum_exclusive_reverse,
);
criterion_main!(benches);
