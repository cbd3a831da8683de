//! Scan emulator.
//!
//! Backends only provide an inclusive forward scan. Reverse scans wrap the
//! pipeline in a flip along the scan axis; exclusive scans shift the input
//! one position along the axis, padding with the identity element, before the
//! native scan runs. The two transforms are independent.

use ivx_backend::{BackendCapability, BackendError, ScanOp};
use ivx_core::{DType, Shape, Tensor};
use log::{debug, trace};

use crate::axes::normalize_scan_axis;
use crate::dtypes::{ensure_supported, infer_accumulator_dtype};
use crate::{StatsError, write_out};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub axis: i64,
    pub exclusive: bool,
    pub reverse: bool,
    /// Accumulator dtype. Inferred from the input when absent.
    pub dtype: Option<DType>,
}

impl ScanOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn axis(mut self, axis: i64) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    #[must_use]
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    #[must_use]
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }
}

/// Cumulative `op` of `tensor` along `options.axis`.
///
/// When `out` is given the full result is copied into it after the
/// computation succeeds; on error it is left untouched.
pub fn scan(
    backend: &dyn BackendCapability,
    op: ScanOp,
    tensor: &Tensor,
    options: &ScanOptions,
    out: Option<&mut Tensor>,
) -> Result<Tensor, StatsError> {
    let result = scan_value(backend, op, tensor, options)?;
    write_out(out, &result);
    Ok(result)
}

fn scan_value(
    backend: &dyn BackendCapability,
    op: ScanOp,
    tensor: &Tensor,
    options: &ScanOptions,
) -> Result<Tensor, StatsError> {
    let name = op.as_str();
    let input_dtype = backend.dtype_of(tensor);
    ensure_supported(backend, name, input_dtype)?;

    let axis = normalize_scan_axis(name, options.axis, tensor.rank())?;
    let dtype = options
        .dtype
        .unwrap_or_else(|| infer_accumulator_dtype(backend, input_dtype));
    trace!(
        "{name}: axis={axis} dtype={dtype} exclusive={} reverse={}",
        options.exclusive, options.reverse
    );

    if tensor.rank() == 0 {
        let lifted = backend.reshape(tensor, &[1])?;
        let scanned = scan_along(backend, op, &lifted, axis, dtype, options)?;
        return Ok(backend.reshape(&scanned, &[])?);
    }
    Ok(scan_along(backend, op, tensor, axis, dtype, options)?)
}

fn scan_along(
    backend: &dyn BackendCapability,
    op: ScanOp,
    tensor: &Tensor,
    axis: usize,
    dtype: DType,
    options: &ScanOptions,
) -> Result<Tensor, BackendError> {
    if !options.exclusive && !options.reverse {
        return backend.native_scan(op, tensor, axis, dtype);
    }
    debug!(
        "{}: emulating exclusive={} reverse={} along axis {axis}",
        op.as_str(),
        options.exclusive,
        options.reverse
    );

    let flipped;
    let input = if options.reverse {
        flipped = backend.flip(tensor, &[axis])?;
        &flipped
    } else {
        tensor
    };

    let shifted;
    let input = if options.exclusive {
        shifted = shift_in_identity(backend, input, axis, op.identity())?;
        &shifted
    } else {
        input
    };

    let scanned = backend.native_scan(op, input, axis, dtype)?;
    if options.reverse {
        backend.flip(&scanned, &[axis])
    } else {
        Ok(scanned)
    }
}

/// Move every slice along `axis` one position forward, dropping the last and
/// filling the first with `identity`. The axis is swapped to the last
/// position for the shift and swapped back afterwards.
fn shift_in_identity(
    backend: &dyn BackendCapability,
    tensor: &Tensor,
    axis: usize,
    identity: f64,
) -> Result<Tensor, BackendError> {
    let extent = tensor.dims()[axis];
    if extent == 0 {
        return Ok(tensor.clone());
    }

    let last = tensor.rank() - 1;
    let moved = backend.transpose(tensor, axis, last)?;
    let mut pad_dims = moved.dims().to_vec();
    pad_dims[last] = 1;
    let pad = backend.full(&Shape::new(pad_dims), identity, backend.dtype_of(&moved))?;
    let body = backend.slice_axis(&moved, last, 0, extent - 1)?;
    let joined = backend.concat(&[pad, body], last)?;
    backend.transpose(&joined, axis, last)
}
