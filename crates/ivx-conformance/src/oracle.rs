//! Direct-definition reference implementations.
//!
//! Everything here works on plain `f64` buffers and computes each output
//! element straight from its definition, with no shared kernels, so the
//! backend and the emulation layers can be checked against it.

use ivx_stats::{ReduceKind, ScanOp};

fn unravel(mut flat: usize, dims: &[u32]) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    for axis in (0..dims.len()).rev() {
        let extent = dims[axis] as usize;
        coords[axis] = flat % extent;
        flat /= extent;
    }
    coords
}

fn element_count(dims: &[u32]) -> usize {
    dims.iter().map(|&d| d as usize).product()
}

/// Dims left after reducing `axes` (dropped, not kept as 1).
#[must_use]
pub fn reduced_dims(dims: &[u32], axes: &[usize]) -> Vec<u32> {
    dims.iter()
        .enumerate()
        .filter(|(axis, _)| !axes.contains(axis))
        .map(|(_, &d)| d)
        .collect()
}

/// Reduce a row-major buffer. `correction` is only read by var and std.
#[must_use]
pub fn reduce(
    kind: ReduceKind,
    values: &[f64],
    dims: &[u32],
    axes: &[usize],
    correction: f64,
) -> Vec<f64> {
    let out_dims = reduced_dims(dims, axes);
    let total = element_count(dims);

    (0..element_count(&out_dims))
        .map(|out_flat| {
            let out_coords = unravel(out_flat, &out_dims);
            let group: Vec<f64> = (0..total)
                .filter(|&flat| {
                    let coords = unravel(flat, dims);
                    let kept: Vec<usize> = coords
                        .iter()
                        .enumerate()
                        .filter(|(axis, _)| !axes.contains(axis))
                        .map(|(_, &c)| c)
                        .collect();
                    kept == out_coords
                })
                .map(|flat| values[flat])
                .collect();
            reduce_group(kind, &group, correction)
        })
        .collect()
}

fn reduce_group(kind: ReduceKind, group: &[f64], correction: f64) -> f64 {
    let n = group.len() as f64;
    match kind {
        ReduceKind::Sum => group.iter().sum(),
        ReduceKind::NanSum => group.iter().filter(|v| !v.is_nan()).sum(),
        ReduceKind::Prod => group.iter().product(),
        ReduceKind::Mean => group.iter().sum::<f64>() / n,
        ReduceKind::Min => {
            if group.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                group.iter().copied().fold(f64::INFINITY, f64::min)
            }
        }
        ReduceKind::Max => {
            if group.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                group.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        }
        ReduceKind::Var | ReduceKind::Std => {
            if n - correction <= 0.0 {
                return f64::NAN;
            }
            let mean = group.iter().sum::<f64>() / n;
            let squares: f64 = group.iter().map(|v| (v - mean) * (v - mean)).sum();
            let var = squares / (n - correction);
            if kind == ReduceKind::Std { var.sqrt() } else { var }
        }
    }
}

/// Cumulative `op` along `axis`: each output combines the elements of its
/// line that precede it (follow it, when `reverse`), itself included unless
/// `exclusive`.
#[must_use]
pub fn scan(
    op: ScanOp,
    values: &[f64],
    dims: &[u32],
    axis: usize,
    exclusive: bool,
    reverse: bool,
) -> Vec<f64> {
    let total = element_count(dims);
    (0..total)
        .map(|flat| {
            let coords = unravel(flat, dims);
            let position = coords[axis];
            let mut acc = op.identity();
            for other in 0..dims[axis] as usize {
                let included = match (reverse, exclusive) {
                    (false, false) => other <= position,
                    (false, true) => other < position,
                    (true, false) => other >= position,
                    (true, true) => other > position,
                };
                if !included {
                    continue;
                }
                let mut source = coords.clone();
                source[axis] = other;
                let index = source
                    .iter()
                    .zip(dims)
                    .fold(0_usize, |idx, (&c, &d)| idx * d as usize + c);
                acc = match op {
                    ScanOp::CumSum => acc + values[index],
                    ScanOp::CumProd => acc * values[index],
                };
            }
            acc
        })
        .collect()
}
