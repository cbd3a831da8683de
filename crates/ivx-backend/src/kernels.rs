//! Host kernels behind [`CpuBackend`](crate::CpuBackend).
//!
//! Every kernel allocates its output; inputs are never written.

use ivx_core::{DType, Literal, Shape, Tensor, promote_types};

use crate::BackendError;

/// Step `coords` to the next row-major position inside `dims`.
#[inline]
fn advance(coords: &mut [usize], dims: &[u32]) {
    for axis in (0..coords.len()).rev() {
        coords[axis] += 1;
        if coords[axis] < dims[axis] as usize {
            return;
        }
        coords[axis] = 0;
    }
}

fn check_axis(op: &'static str, axis: usize, rank: usize) -> Result<(), BackendError> {
    if axis >= rank {
        return Err(BackendError::InvalidArgument {
            op,
            detail: format!("axis {axis} out of bounds for rank {rank}"),
        });
    }
    Ok(())
}

/// Check reduction targets: in range and pairwise distinct.
pub(crate) fn check_axes(op: &'static str, axes: &[usize], rank: usize) -> Result<(), BackendError> {
    let mut seen = vec![false; rank];
    for &axis in axes {
        check_axis(op, axis, rank)?;
        if seen[axis] {
            return Err(BackendError::InvalidArgument {
                op,
                detail: format!("axis {axis} repeated in {axes:?}"),
            });
        }
        seen[axis] = true;
    }
    Ok(())
}

/// Permute the axes of a tensor. `permutation[i]` is the input axis that
/// becomes output axis `i`.
pub(crate) fn permute(tensor: &Tensor, permutation: &[usize]) -> Result<Tensor, BackendError> {
    let op = "transpose";
    let rank = tensor.rank();
    if permutation.len() != rank {
        return Err(BackendError::InvalidArgument {
            op,
            detail: format!(
                "permutation length {} does not match rank {}",
                permutation.len(),
                rank
            ),
        });
    }
    check_axes(op, permutation, rank)?;

    let old_strides = tensor.shape.strides();
    let new_dims: Vec<u32> = permutation.iter().map(|&p| tensor.dims()[p]).collect();

    let mut elements = Vec::with_capacity(tensor.len());
    let mut coords = vec![0_usize; rank];
    for _ in 0..tensor.len() {
        let old_flat: usize = coords
            .iter()
            .zip(permutation)
            .map(|(&coord, &axis)| coord * old_strides[axis])
            .sum();
        elements.push(tensor.elements[old_flat]);
        advance(&mut coords, &new_dims);
    }

    Ok(Tensor::new(tensor.dtype, Shape::new(new_dims), elements)?)
}

/// Exchange two axes.
pub(crate) fn swap_axes(tensor: &Tensor, a: usize, b: usize) -> Result<Tensor, BackendError> {
    let rank = tensor.rank();
    check_axis("transpose", a, rank)?;
    check_axis("transpose", b, rank)?;
    if a == b {
        return Ok(tensor.clone());
    }
    let mut permutation: Vec<usize> = (0..rank).collect();
    permutation.swap(a, b);
    permute(tensor, &permutation)
}

/// Reverse element order along each of `axes`.
pub(crate) fn flip(tensor: &Tensor, axes: &[usize]) -> Result<Tensor, BackendError> {
    let rank = tensor.rank();
    for &axis in axes {
        check_axis("flip", axis, rank)?;
    }

    let dims = tensor.dims();
    let strides = tensor.shape.strides();
    let mut flipped = vec![false; rank];
    for &axis in axes {
        flipped[axis] = true;
    }

    let mut elements = Vec::with_capacity(tensor.len());
    let mut coords = vec![0_usize; rank];
    for _ in 0..tensor.len() {
        let mut in_flat = 0_usize;
        for axis in 0..rank {
            let coord = if flipped[axis] {
                dims[axis] as usize - 1 - coords[axis]
            } else {
                coords[axis]
            };
            in_flat += coord * strides[axis];
        }
        elements.push(tensor.elements[in_flat]);
        advance(&mut coords, dims);
    }

    Ok(Tensor::new(tensor.dtype, tensor.shape.clone(), elements)?)
}

/// Join tensors along `axis`. Mixed dtypes meet at their promoted dtype.
pub(crate) fn concat(tensors: &[Tensor], axis: usize) -> Result<Tensor, BackendError> {
    let op = "concat";
    let Some(first) = tensors.first() else {
        return Err(BackendError::InvalidArgument {
            op,
            detail: "nothing to concatenate".to_owned(),
        });
    };

    let rank = first.rank();
    check_axis(op, axis, rank)?;

    for tensor in &tensors[1..] {
        if tensor.rank() != rank {
            return Err(BackendError::ShapeMismatch {
                op,
                left: first.shape.clone(),
                right: tensor.shape.clone(),
            });
        }
        for (ax, (d0, di)) in first.dims().iter().zip(tensor.dims()).enumerate() {
            if ax != axis && d0 != di {
                return Err(BackendError::ShapeMismatch {
                    op,
                    left: first.shape.clone(),
                    right: tensor.shape.clone(),
                });
            }
        }
    }

    let dtype = tensors
        .iter()
        .map(|tensor| tensor.dtype)
        .reduce(promote_types)
        .unwrap_or(first.dtype);

    let mut out_dims = first.dims().to_vec();
    out_dims[axis] = tensors.iter().map(|tensor| tensor.dims()[axis]).sum();
    let out_shape = Shape::new(out_dims);
    let total = out_shape.element_count().unwrap_or(0) as usize;

    let strides: Vec<Vec<usize>> = tensors.iter().map(|t| t.shape.strides()).collect();
    let mut elements = Vec::with_capacity(total);
    let mut coords = vec![0_usize; rank];
    for _ in 0..total {
        let mut local = coords[axis];
        let mut source = 0;
        for (index, tensor) in tensors.iter().enumerate() {
            let extent = tensor.dims()[axis] as usize;
            if local < extent {
                source = index;
                break;
            }
            local -= extent;
        }

        let flat: usize = coords
            .iter()
            .enumerate()
            .map(|(ax, &coord)| {
                let coord = if ax == axis { local } else { coord };
                coord * strides[source][ax]
            })
            .sum();
        elements.push(tensors[source].elements[flat]);
        advance(&mut coords, &out_shape.dims);
    }

    Ok(Tensor::new(dtype, out_shape, elements)?)
}

/// Take positions `start..end` along `axis`. An empty range is allowed.
pub(crate) fn slice_axis(
    tensor: &Tensor,
    axis: usize,
    start: u32,
    end: u32,
) -> Result<Tensor, BackendError> {
    let op = "slice";
    check_axis(op, axis, tensor.rank())?;
    let extent = tensor.dims()[axis];
    if start > end || end > extent {
        return Err(BackendError::InvalidArgument {
            op,
            detail: format!("invalid slice on axis {axis}: start={start} end={end} dim={extent}"),
        });
    }

    let mut out_dims = tensor.dims().to_vec();
    out_dims[axis] = end - start;
    let out_shape = Shape::new(out_dims);
    let total = out_shape.element_count().unwrap_or(0) as usize;
    let strides = tensor.shape.strides();

    let mut elements = Vec::with_capacity(total);
    let mut coords = vec![0_usize; tensor.rank()];
    for _ in 0..total {
        let in_flat: usize = coords
            .iter()
            .enumerate()
            .map(|(ax, &coord)| {
                let coord = if ax == axis {
                    coord + start as usize
                } else {
                    coord
                };
                coord * strides[ax]
            })
            .sum();
        elements.push(tensor.elements[in_flat]);
        advance(&mut coords, &out_shape.dims);
    }

    Ok(Tensor::new(tensor.dtype, out_shape, elements)?)
}

pub(crate) fn reshape(tensor: &Tensor, dims: &[u32]) -> Result<Tensor, BackendError> {
    let shape = Shape::new(dims.to_vec());
    if shape.element_count() != Some(tensor.len() as u64) {
        return Err(BackendError::ShapeMismatch {
            op: "reshape",
            left: tensor.shape.clone(),
            right: shape,
        });
    }
    Ok(Tensor::new(tensor.dtype, shape, tensor.elements.clone())?)
}

/// Multiply every element by `factor`, keeping the dtype.
pub(crate) fn scale(tensor: &Tensor, factor: f64) -> Result<Tensor, BackendError> {
    let elements = tensor
        .to_f64_vec()
        .into_iter()
        .map(|value| Literal::from_f64(value * factor))
        .collect();
    Ok(Tensor::new(tensor.dtype, tensor.shape.clone(), elements)?)
}

/// For each input element (row-major), the flat index of the output element
/// it reduces into. Also returns the number of outputs.
fn reduction_groups(shape: &Shape, axes: &[usize]) -> (Vec<usize>, usize) {
    let kept = shape.reduced(axes, false);
    let kept_strides = kept.strides();
    let outputs = kept.element_count().unwrap_or(0) as usize;
    let total = shape.element_count().unwrap_or(0) as usize;

    let mut groups = Vec::with_capacity(total);
    let mut coords = vec![0_usize; shape.rank()];
    for _ in 0..total {
        let mut out_flat = 0_usize;
        let mut kept_axis = 0_usize;
        for (axis, &coord) in coords.iter().enumerate() {
            if !axes.contains(&axis) {
                out_flat += coord * kept_strides[kept_axis];
                kept_axis += 1;
            }
        }
        groups.push(out_flat);
        advance(&mut coords, &shape.dims);
    }
    (groups, outputs)
}

/// Fold every reduction group of `tensor` (already cast to its compute dtype)
/// into one literal. Integer and boolean tensors fold in `i64`, floating
/// tensors in `f64`.
pub(crate) fn fold_axes(
    tensor: &Tensor,
    axes: &[usize],
    int_init: i64,
    float_init: f64,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Vec<Literal> {
    let (groups, outputs) = reduction_groups(&tensor.shape, axes);

    if tensor.dtype.is_floating() {
        let mut acc = vec![float_init; outputs];
        for (literal, &group) in tensor.elements.iter().zip(&groups) {
            let value = literal.as_f64().unwrap_or(f64::NAN);
            acc[group] = float_op(acc[group], value);
        }
        acc.into_iter().map(Literal::from_f64).collect()
    } else {
        let mut acc = vec![int_init; outputs];
        for (literal, &group) in tensor.elements.iter().zip(&groups) {
            let value = literal.as_i64().unwrap_or_default();
            acc[group] = int_op(acc[group], value);
        }
        acc.into_iter().map(Literal::I64).collect()
    }
}

/// Per-group mean and, when `ddof` is given, the variance with that
/// delta degrees of freedom. `count` is the group size. Computed in `f64`;
/// the variance is NaN once `count - ddof` reaches zero.
pub(crate) fn moments(
    tensor: &Tensor,
    axes: &[usize],
    count: u64,
    ddof: Option<f64>,
) -> Vec<f64> {
    let (groups, outputs) = reduction_groups(&tensor.shape, axes);
    let count = count as f64;
    let values = tensor.to_f64_vec();

    let mut sums = vec![0.0_f64; outputs];
    for (value, &group) in values.iter().zip(&groups) {
        sums[group] += value;
    }
    let means: Vec<f64> = sums.into_iter().map(|sum| sum / count).collect();

    let Some(ddof) = ddof else {
        return means;
    };
    if count - ddof <= 0.0 {
        return vec![f64::NAN; outputs];
    }

    let mut squares = vec![0.0_f64; outputs];
    for (value, &group) in values.iter().zip(&groups) {
        let diff = value - means[group];
        squares[group] += diff * diff;
    }
    squares
        .into_iter()
        .map(|square| square / (count - ddof))
        .collect()
}

/// Inclusive forward scan along `axis` of a tensor already cast to its
/// compute dtype. Partial results are rounded to the dtype after every step.
pub(crate) fn inclusive_scan(
    tensor: &Tensor,
    axis: usize,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Tensor, BackendError> {
    check_axis("scan", axis, tensor.rank())?;
    let dims = tensor.dims();
    let axis_size = dims[axis] as usize;
    let inner: usize = dims[axis + 1..].iter().map(|&d| d as usize).product();
    let outer: usize = dims[..axis].iter().map(|&d| d as usize).product();
    let dtype: DType = tensor.dtype;

    let mut elements = tensor.elements.clone();
    for outer_idx in 0..outer {
        for inner_idx in 0..inner {
            let base = outer_idx * axis_size * inner + inner_idx;
            for step in 1..axis_size {
                let current = base + step * inner;
                let previous = current - inner;
                let combined = if dtype.is_floating() {
                    let lhs = elements[previous].as_f64().unwrap_or(f64::NAN);
                    let rhs = elements[current].as_f64().unwrap_or(f64::NAN);
                    Literal::from_f64(float_op(lhs, rhs))
                } else {
                    let lhs = elements[previous].as_i64().unwrap_or_default();
                    let rhs = elements[current].as_i64().unwrap_or_default();
                    Literal::I64(int_op(lhs, rhs))
                };
                elements[current] = dtype.cast_literal(combined);
            }
        }
    }

    Ok(Tensor::new(dtype, tensor.shape.clone(), elements)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_2x3() -> Tensor {
        Tensor::from_i64(DType::I64, &[2, 3], &[1, 2, 3, 4, 5, 6]).expect("matrix")
    }

    #[test]
    fn swap_axes_transposes_matrix() {
        let out = swap_axes(&matrix_2x3(), 0, 1).expect("transpose");
        assert_eq!(out.dims(), &[3, 2]);
        assert_eq!(out.to_i64_vec(), Some(vec![1, 4, 2, 5, 3, 6]));
    }

    #[test]
    fn permute_rank3_moves_leading_axis_last() {
        let tensor =
            Tensor::from_i64(DType::I64, &[2, 1, 3], &[1, 2, 3, 4, 5, 6]).expect("tensor");
        let out = permute(&tensor, &[1, 2, 0]).expect("permute");
        assert_eq!(out.dims(), &[1, 3, 2]);
        assert_eq!(out.to_i64_vec(), Some(vec![1, 4, 2, 5, 3, 6]));
    }

    #[test]
    fn permute_rejects_repeated_axis() {
        let err = permute(&matrix_2x3(), &[0, 0]).expect_err("invalid permutation");
        assert!(matches!(err, BackendError::InvalidArgument { op: "transpose", .. }));
    }

    #[test]
    fn flip_reverses_selected_axis_only() {
        let out = flip(&matrix_2x3(), &[1]).expect("flip");
        assert_eq!(out.to_i64_vec(), Some(vec![3, 2, 1, 6, 5, 4]));
        let out = flip(&matrix_2x3(), &[0, 1]).expect("flip");
        assert_eq!(out.to_i64_vec(), Some(vec![6, 5, 4, 3, 2, 1]));
    }

    #[test]
    fn concat_along_inner_axis() {
        let left = Tensor::from_i64(DType::I64, &[2, 1], &[0, 0]).expect("left");
        let out = concat(&[left, matrix_2x3()], 1).expect("concat");
        assert_eq!(out.dims(), &[2, 4]);
        assert_eq!(out.to_i64_vec(), Some(vec![0, 1, 2, 3, 0, 4, 5, 6]));
    }

    #[test]
    fn concat_promotes_mixed_dtypes() {
        let ints = Tensor::from_i64(DType::I8, &[1], &[3]).expect("ints");
        let floats = Tensor::from_f64(DType::F32, &[1], &[0.5]).expect("floats");
        let out = concat(&[ints, floats], 0).expect("concat");
        assert_eq!(out.dtype, DType::F32);
        assert_eq!(out.to_f64_vec(), vec![3.0, 0.5]);
    }

    #[test]
    fn concat_rejects_mismatched_off_axis_dims() {
        let other = Tensor::from_i64(DType::I64, &[3, 1], &[0, 0, 0]).expect("other");
        let err = concat(&[matrix_2x3(), other], 1).expect_err("mismatch");
        assert!(matches!(err, BackendError::ShapeMismatch { op: "concat", .. }));
    }

    #[test]
    fn concat_skips_empty_operands() {
        let empty = Tensor::from_i64(DType::I64, &[2, 0], &[]).expect("empty");
        let out = concat(&[empty, matrix_2x3()], 1).expect("concat");
        assert_eq!(out, matrix_2x3());
    }

    #[test]
    fn slice_axis_supports_empty_range() {
        let out = slice_axis(&matrix_2x3(), 1, 1, 3).expect("slice");
        assert_eq!(out.to_i64_vec(), Some(vec![2, 3, 5, 6]));
        let out = slice_axis(&matrix_2x3(), 1, 0, 0).expect("empty slice");
        assert_eq!(out.dims(), &[2, 0]);
        assert!(out.is_empty());
    }

    #[test]
    fn slice_axis_rejects_out_of_range_end() {
        assert!(slice_axis(&matrix_2x3(), 0, 0, 3).is_err());
    }

    #[test]
    fn fold_axes_sums_rows_and_columns() {
        let rows = fold_axes(&matrix_2x3(), &[1], 0, 0.0, |a, b| a + b, |a, b| a + b);
        assert_eq!(rows, vec![Literal::I64(6), Literal::I64(15)]);
        let all = fold_axes(&matrix_2x3(), &[0, 1], 0, 0.0, |a, b| a + b, |a, b| a + b);
        assert_eq!(all, vec![Literal::I64(21)]);
        let none = fold_axes(&matrix_2x3(), &[], 0, 0.0, |a, b| a + b, |a, b| a + b);
        assert_eq!(none.len(), 6);
    }

    #[test]
    fn moments_match_textbook_values() {
        let tensor = Tensor::vector_f64(&[1.0, 2.0, 3.0, 4.0]).expect("vector");
        assert_eq!(moments(&tensor, &[0], 4, None), vec![2.5]);
        assert_eq!(moments(&tensor, &[0], 4, Some(0.0)), vec![1.25]);
        let sample = moments(&tensor, &[0], 4, Some(1.0))[0];
        assert!((sample - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn moments_without_degrees_of_freedom_are_nan() {
        let single = Tensor::vector_f64(&[7.0]).expect("vector");
        assert!(moments(&single, &[0], 1, Some(1.0))[0].is_nan());
        assert_eq!(moments(&single, &[0], 1, Some(0.0)), vec![0.0]);

        let empty = Tensor::from_f64(DType::F64, &[0, 2], &[]).expect("empty");
        let out = moments(&empty, &[0], 0, Some(1.0));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_nan()));
        assert!(moments(&empty, &[0], 0, Some(0.0)).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn inclusive_scan_runs_along_axis() {
        let out = inclusive_scan(&matrix_2x3(), 0, |a, b| a + b, |a, b| a + b).expect("scan");
        assert_eq!(out.to_i64_vec(), Some(vec![1, 2, 3, 5, 7, 9]));
        let out = inclusive_scan(&matrix_2x3(), 1, |a, b| a * b, |a, b| a * b).expect("scan");
        assert_eq!(out.to_i64_vec(), Some(vec![1, 2, 6, 4, 20, 120]));
    }

    #[test]
    fn inclusive_scan_wraps_in_narrow_dtype() {
        let tensor = Tensor::from_i64(DType::I8, &[3], &[100, 100, 100]).expect("tensor");
        let out = inclusive_scan(&tensor, 0, |a, b| a + b, |a, b| a + b).expect("scan");
        assert_eq!(out.to_i64_vec(), Some(vec![100, -56, 44]));
    }
}
