//! Reduction normalizer.
//!
//! Resolves the axis list and output dtype of a reduction, short-circuits the
//! degenerate cases, and hands everything else to the backend. Variance
//! corrections other than 0 and 1 are built from the biased estimator.

use ivx_backend::{BackendCapability, ReduceOp};
use ivx_core::{AxisSpec, CompatibilityMode, Correction, DType, Tensor, ValueError};
use log::{debug, trace};

use crate::axes::normalize_axes;
use crate::dtypes::{ensure_supported, infer_accumulator_dtype};
use crate::{StatsError, write_out};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceKind {
    Sum,
    Prod,
    Mean,
    Min,
    Max,
    NanSum,
    Var,
    Std,
}

impl ReduceKind {
    pub const ALL: [Self; 8] = [
        Self::Sum,
        Self::Prod,
        Self::Mean,
        Self::Min,
        Self::Max,
        Self::NanSum,
        Self::Var,
        Self::Std,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Prod => "prod",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::NanSum => "nansum",
            Self::Var => "var",
            Self::Std => "std",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether an absent dtype widens to the backend's default accumulator.
    #[must_use]
    pub fn widens_dtype(self) -> bool {
        matches!(self, Self::Sum | Self::Prod | Self::NanSum)
    }

    /// Whether the dtype refusals also apply to the explicit empty axis set.
    /// Kinds without them hand back the input whatever its dtype.
    fn checks_dtype_on_identity(self) -> bool {
        !matches!(self, Self::Mean | Self::Min | Self::Max | Self::Var)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReduceOptions {
    pub axis: AxisSpec,
    /// Output dtype. Inferred from the input when absent.
    pub dtype: Option<DType>,
    pub keepdims: bool,
    /// Only read by `var` and `std`.
    pub correction: Correction,
}

impl ReduceOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn axis(mut self, axis: impl Into<AxisSpec>) -> Self {
        self.axis = axis.into();
        self
    }

    #[must_use]
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    #[must_use]
    pub fn keepdims(mut self, keepdims: bool) -> Self {
        self.keepdims = keepdims;
        self
    }

    #[must_use]
    pub fn correction(mut self, correction: impl Into<Correction>) -> Self {
        self.correction = correction.into();
        self
    }
}

/// Reduce `tensor` with `kind`.
///
/// When `out` is given the full result is copied into it after the
/// computation succeeds; on error it is left untouched.
pub fn reduce(
    backend: &dyn BackendCapability,
    mode: CompatibilityMode,
    kind: ReduceKind,
    tensor: &Tensor,
    options: &ReduceOptions,
    out: Option<&mut Tensor>,
) -> Result<Tensor, StatsError> {
    let result = reduce_value(backend, mode, kind, tensor, options)?;
    write_out(out, &result);
    Ok(result)
}

fn reduce_value(
    backend: &dyn BackendCapability,
    mode: CompatibilityMode,
    kind: ReduceKind,
    tensor: &Tensor,
    options: &ReduceOptions,
) -> Result<Tensor, StatsError> {
    let op = kind.as_str();
    let input_dtype = backend.dtype_of(tensor);
    let identity = options.axis.is_explicit_empty();
    if !identity || kind.checks_dtype_on_identity() {
        ensure_supported(backend, op, input_dtype)?;
    }

    let axes = normalize_axes(op, &options.axis, tensor.rank(), mode)?;
    let dtype = options.dtype.unwrap_or_else(|| {
        if kind.widens_dtype() {
            infer_accumulator_dtype(backend, input_dtype)
        } else {
            input_dtype
        }
    });
    trace!(
        "{op}: axes={axes:?} dtype={dtype} keepdims={}",
        options.keepdims
    );

    if identity {
        debug!("{op}: empty axis set, returning the input as {dtype}");
        return Ok(backend.cast(tensor, dtype)?);
    }

    let keepdims = options.keepdims;
    let native = match kind {
        ReduceKind::Var | ReduceKind::Std => {
            return moment(backend, kind, tensor, &axes, dtype, options);
        }
        ReduceKind::Sum => ReduceOp::Sum,
        ReduceKind::Prod => ReduceOp::Prod,
        ReduceKind::Mean => ReduceOp::Mean,
        ReduceKind::Min => ReduceOp::Min,
        ReduceKind::Max => ReduceOp::Max,
        ReduceKind::NanSum => ReduceOp::NanSum,
    };

    if axes.len() > 1 && !backend.supports_multi_axis(native) {
        debug!(
            "{op}: {} reduces one axis per call, folding {axes:?} in descending order",
            backend.name()
        );
        let mut descending = axes.iter().rev().copied();
        let Some(first) = descending.next() else {
            return Ok(backend.cast(tensor, dtype)?);
        };
        let mut current = backend.native_reduce(native, tensor, &[first], dtype, keepdims)?;
        for axis in descending {
            current = backend.native_reduce(native, &current, &[axis], dtype, keepdims)?;
        }
        return Ok(current);
    }

    Ok(backend.native_reduce(native, tensor, &axes, dtype, keepdims)?)
}

/// Variance and standard deviation for any correction.
fn moment(
    backend: &dyn BackendCapability,
    kind: ReduceKind,
    tensor: &Tensor,
    axes: &[usize],
    dtype: DType,
    options: &ReduceOptions,
) -> Result<Tensor, StatsError> {
    let is_std = kind == ReduceKind::Std;
    let native = |unbiased| {
        if is_std {
            ReduceOp::Std { unbiased }
        } else {
            ReduceOp::Var { unbiased }
        }
    };

    let correction = options.correction.value();
    let input_dtype = backend.dtype_of(tensor);
    let size = tensor
        .shape
        .extent_product(axes)
        .ok_or_else(|| ValueError::ShapeOverflow {
            shape: tensor.shape.clone(),
        })? as f64;
    if size - correction <= 0.0 {
        debug!(
            "{}: correction {correction} leaves no degrees of freedom over {size} samples",
            kind.as_str()
        );
        let shape = tensor.shape.reduced(axes, options.keepdims);
        return Ok(backend.full(&shape, f64::NAN, dtype)?);
    }

    if correction == 0.0 || correction == 1.0 {
        let unbiased = correction == 1.0;
        return Ok(backend.native_reduce(native(unbiased), tensor, axes, dtype, options.keepdims)?);
    }

    let factor = size / (size - correction);
    let factor = if is_std { factor.sqrt() } else { factor };
    debug!(
        "{}: rescaling biased estimate by {factor} for correction {correction}",
        kind.as_str()
    );
    let biased = backend.native_reduce(native(false), tensor, axes, dtype, options.keepdims)?;
    let scaled = backend.scale(&biased, factor)?;
    if is_std {
        Ok(scaled)
    } else {
        Ok(backend.cast(&scaled, input_dtype)?)
    }
}
