//! Reference host backend.
//!
//! Reproduces the native surface of the emulated engine, limitations
//! included: scans are inclusive and forward only, the product reduction
//! takes one axis per call, and variance knows only the biased and unbiased
//! estimators.

use ivx_core::{DType, Shape, Tensor, ValueError};

use crate::kernels;
use crate::policy::DTypePolicy;
use crate::{BackendCapabilities, BackendCapability, BackendError, ReduceOp, ScanOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuBackendConfig {
    /// Default dtype for boolean and integer families.
    pub default_int: DType,
    /// Default dtype for the floating family.
    pub default_float: DType,
    /// `prod` accepts a single axis per call.
    pub single_axis_prod: bool,
    pub policy: DTypePolicy,
}

impl Default for CpuBackendConfig {
    fn default() -> Self {
        Self {
            default_int: DType::I64,
            default_float: DType::F32,
            single_axis_prod: true,
            policy: DTypePolicy::reference(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    config: CpuBackendConfig,
}

impl CpuBackend {
    #[must_use]
    pub fn new(config: CpuBackendConfig) -> Self {
        Self { config }
    }

    /// Backend with no dtype exclusions and multi-axis products.
    #[must_use]
    pub fn permissive() -> Self {
        Self::new(CpuBackendConfig {
            single_axis_prod: false,
            policy: DTypePolicy::permissive(),
            ..CpuBackendConfig::default()
        })
    }

    #[must_use]
    pub fn config(&self) -> &CpuBackendConfig {
        &self.config
    }

    fn admit(&self, op: &'static str, dtype: DType) -> Result<(), BackendError> {
        if self.config.policy.allows(op, dtype) {
            Ok(())
        } else {
            Err(BackendError::UnsupportedDtype { op, dtype })
        }
    }
}

fn nan_aware(op: impl Fn(f64, f64) -> f64) -> impl Fn(f64, f64) -> f64 {
    move |a, b| {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            op(a, b)
        }
    }
}

impl BackendCapability for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn native_reduce(
        &self,
        op: ReduceOp,
        tensor: &Tensor,
        axes: &[usize],
        dtype: DType,
        keepdims: bool,
    ) -> Result<Tensor, BackendError> {
        let name = op.as_str();
        self.admit(name, tensor.dtype)?;
        kernels::check_axes(name, axes, tensor.rank())?;
        if axes.len() > 1 && !self.supports_multi_axis(op) {
            return Err(BackendError::InvalidArgument {
                op: name,
                detail: format!("expects a single axis, got {axes:?}"),
            });
        }

        let input = tensor.cast(dtype);
        let out_shape = input.shape.reduced(axes, keepdims);
        let count = input.shape.extent_product(axes).ok_or_else(|| {
            BackendError::InvalidTensor(ValueError::ShapeOverflow {
                shape: input.shape.clone(),
            })
        })?;

        let literals = match op {
            ReduceOp::Sum => {
                kernels::fold_axes(&input, axes, 0, 0.0, i64::wrapping_add, |a, b| a + b)
            }
            ReduceOp::NanSum => kernels::fold_axes(
                &input,
                axes,
                0,
                0.0,
                i64::wrapping_add,
                |a, b| if b.is_nan() { a } else { a + b },
            ),
            ReduceOp::Prod => {
                kernels::fold_axes(&input, axes, 1, 1.0, i64::wrapping_mul, |a, b| a * b)
            }
            ReduceOp::Min | ReduceOp::Max => {
                if count == 0 {
                    return Err(BackendError::ExecutionFailed {
                        op: name,
                        detail: "reduction over a zero-size axis has no identity".to_owned(),
                    });
                }
                if op == ReduceOp::Min {
                    kernels::fold_axes(
                        &input,
                        axes,
                        i64::MAX,
                        f64::INFINITY,
                        i64::min,
                        nan_aware(f64::min),
                    )
                } else {
                    kernels::fold_axes(
                        &input,
                        axes,
                        i64::MIN,
                        f64::NEG_INFINITY,
                        i64::max,
                        nan_aware(f64::max),
                    )
                }
            }
            ReduceOp::Mean | ReduceOp::Var { .. } | ReduceOp::Std { .. } => {
                if !dtype.is_floating() {
                    return Err(BackendError::UnsupportedDtype { op: name, dtype });
                }
                let ddof = match op {
                    ReduceOp::Var { unbiased } | ReduceOp::Std { unbiased } => {
                        Some(if unbiased { 1.0 } else { 0.0 })
                    }
                    _ => None,
                };
                let values = kernels::moments(&input, axes, count, ddof);
                let values = if matches!(op, ReduceOp::Std { .. }) {
                    values.into_iter().map(f64::sqrt).collect()
                } else {
                    values
                };
                values.into_iter().map(ivx_core::Literal::from_f64).collect()
            }
        };

        Ok(Tensor::new(dtype, out_shape, literals)?)
    }

    fn supports_multi_axis(&self, op: ReduceOp) -> bool {
        !(self.config.single_axis_prod && op == ReduceOp::Prod)
    }

    fn native_scan(
        &self,
        op: ScanOp,
        tensor: &Tensor,
        axis: usize,
        dtype: DType,
    ) -> Result<Tensor, BackendError> {
        self.admit(op.as_str(), tensor.dtype)?;
        let input = tensor.cast(dtype);
        match op {
            ScanOp::CumSum => {
                kernels::inclusive_scan(&input, axis, i64::wrapping_add, |a, b| a + b)
            }
            ScanOp::CumProd => {
                kernels::inclusive_scan(&input, axis, i64::wrapping_mul, |a, b| a * b)
            }
        }
    }

    fn flip(&self, tensor: &Tensor, axes: &[usize]) -> Result<Tensor, BackendError> {
        kernels::flip(tensor, axes)
    }

    fn transpose(&self, tensor: &Tensor, a: usize, b: usize) -> Result<Tensor, BackendError> {
        kernels::swap_axes(tensor, a, b)
    }

    fn concat(&self, tensors: &[Tensor], axis: usize) -> Result<Tensor, BackendError> {
        kernels::concat(tensors, axis)
    }

    fn slice_axis(
        &self,
        tensor: &Tensor,
        axis: usize,
        start: u32,
        end: u32,
    ) -> Result<Tensor, BackendError> {
        kernels::slice_axis(tensor, axis, start, end)
    }

    fn reshape(&self, tensor: &Tensor, dims: &[u32]) -> Result<Tensor, BackendError> {
        kernels::reshape(tensor, dims)
    }

    fn full(&self, shape: &Shape, value: f64, dtype: DType) -> Result<Tensor, BackendError> {
        Ok(Tensor::full(dtype, shape.clone(), value)?)
    }

    fn cast(&self, tensor: &Tensor, dtype: DType) -> Result<Tensor, BackendError> {
        Ok(tensor.cast(dtype))
    }

    fn scale(&self, tensor: &Tensor, factor: f64) -> Result<Tensor, BackendError> {
        kernels::scale(tensor, factor)
    }

    fn default_dtype_for(&self, dtype: DType) -> DType {
        if dtype.is_floating() {
            self.config.default_float
        } else {
            self.config.default_int
        }
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supported_dtypes: DType::ALL.to_vec(),
            max_tensor_rank: u8::MAX as usize,
            unsupported: self.config.policy.denied_pairs(),
        }
    }
}
