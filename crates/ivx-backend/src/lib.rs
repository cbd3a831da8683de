//! Capability interface implemented by every tensor engine, plus a reference
//! host implementation.
//!
//! The statistical layer only ever talks to [`BackendCapability`]. A backend
//! exposes a deliberately small surface: native reductions, an inclusive
//! forward scan, shape primitives, and dtype metadata. Anything richer
//! (exclusive or reverse scans, arbitrary variance corrections) is composed
//! on top by the caller.

#![forbid(unsafe_code)]

pub mod cpu;
mod kernels;
pub mod policy;
pub mod registry;

pub use cpu::{CpuBackend, CpuBackendConfig};
pub use policy::DTypePolicy;
pub use registry::BackendRegistry;

use ivx_core::{DType, Shape, Tensor, ValueError};

// ── Operations ─────────────────────────────────────────────────────

/// Reductions a backend evaluates natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Prod,
    Mean,
    Min,
    Max,
    /// Sum that skips NaN elements.
    NanSum,
    Var { unbiased: bool },
    Std { unbiased: bool },
}

impl ReduceOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Prod => "prod",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::NanSum => "nansum",
            Self::Var { .. } => "var",
            Self::Std { .. } => "std",
        }
    }
}

/// Inclusive, forward cumulative operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanOp {
    CumSum,
    CumProd,
}

impl ScanOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CumSum => "cumsum",
            Self::CumProd => "cumprod",
        }
    }

    /// Value that leaves the combining operator unchanged.
    #[must_use]
    pub fn identity(self) -> f64 {
        match self {
            Self::CumSum => 0.0,
            Self::CumProd => 1.0,
        }
    }
}

// ── Backend Errors ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Requested backend is not registered.
    Unavailable { backend: String },
    /// The operation does not accept this dtype.
    UnsupportedDtype { op: &'static str, dtype: DType },
    /// Malformed axis, slice, or permutation argument.
    InvalidArgument { op: &'static str, detail: String },
    ShapeMismatch {
        op: &'static str,
        left: Shape,
        right: Shape,
    },
    /// The kernel could not produce a result.
    ExecutionFailed { op: &'static str, detail: String },
    InvalidTensor(ValueError),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { backend } => write!(f, "backend unavailable: {backend}"),
            Self::UnsupportedDtype { op, dtype } => {
                write!(f, "{op} does not support dtype {dtype}")
            }
            Self::InvalidArgument { op, detail } => {
                write!(f, "invalid argument to {op}: {detail}")
            }
            Self::ShapeMismatch { op, left, right } => {
                write!(
                    f,
                    "shape mismatch for {op}: left={:?} right={:?}",
                    left.dims, right.dims
                )
            }
            Self::ExecutionFailed { op, detail } => write!(f, "{op} failed: {detail}"),
            Self::InvalidTensor(err) => write!(f, "invalid tensor: {err}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<ValueError> for BackendError {
    fn from(value: ValueError) -> Self {
        Self::InvalidTensor(value)
    }
}

// ── Backend Trait ──────────────────────────────────────────────────

/// Uniform interface over tensor engines.
///
/// Axis arguments are already normalized into `0..rank` by the caller;
/// implementations reject anything else with
/// [`BackendError::InvalidArgument`] instead of guessing.
pub trait BackendCapability: Send + Sync {
    /// Human-readable backend name (e.g. "cpu").
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Reduce `tensor` over `axes` after casting it to `dtype`.
    fn native_reduce(
        &self,
        op: ReduceOp,
        tensor: &Tensor,
        axes: &[usize],
        dtype: DType,
        keepdims: bool,
    ) -> Result<Tensor, BackendError>;

    /// Whether `native_reduce(op, ..)` accepts more than one axis per call.
    fn supports_multi_axis(&self, _op: ReduceOp) -> bool {
        true
    }

    /// Inclusive forward scan of `tensor` cast to `dtype` along `axis`.
    fn native_scan(
        &self,
        op: ScanOp,
        tensor: &Tensor,
        axis: usize,
        dtype: DType,
    ) -> Result<Tensor, BackendError>;

    fn flip(&self, tensor: &Tensor, axes: &[usize]) -> Result<Tensor, BackendError>;

    /// Exchange axes `a` and `b`.
    fn transpose(&self, tensor: &Tensor, a: usize, b: usize) -> Result<Tensor, BackendError>;

    fn concat(&self, tensors: &[Tensor], axis: usize) -> Result<Tensor, BackendError>;

    /// Positions `start..end` along `axis`.
    fn slice_axis(
        &self,
        tensor: &Tensor,
        axis: usize,
        start: u32,
        end: u32,
    ) -> Result<Tensor, BackendError>;

    fn reshape(&self, tensor: &Tensor, dims: &[u32]) -> Result<Tensor, BackendError>;

    fn full(&self, shape: &Shape, value: f64, dtype: DType) -> Result<Tensor, BackendError>;

    fn cast(&self, tensor: &Tensor, dtype: DType) -> Result<Tensor, BackendError>;

    /// Elementwise multiply by a host scalar, keeping the dtype.
    fn scale(&self, tensor: &Tensor, factor: f64) -> Result<Tensor, BackendError>;

    fn dtype_of(&self, tensor: &Tensor) -> DType {
        tensor.dtype
    }

    /// The engine's default dtype of the same family as `dtype`.
    fn default_dtype_for(&self, dtype: DType) -> DType;

    fn bit_width(&self, dtype: DType) -> u32 {
        dtype.bit_width()
    }

    fn capabilities(&self) -> BackendCapabilities;
}

// ── Backend Capabilities ───────────────────────────────────────────

/// What a backend supports: dtypes, rank limit, per-op dtype exclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub supported_dtypes: Vec<DType>,
    pub max_tensor_rank: usize,
    /// `(op, dtype)` pairs rejected with [`BackendError::UnsupportedDtype`].
    pub unsupported: Vec<(String, DType)>,
}

impl BackendCapabilities {
    #[must_use]
    pub fn supports(&self, op: &str, dtype: DType) -> bool {
        self.supported_dtypes.contains(&dtype)
            && !self
                .unsupported
                .iter()
                .any(|(name, denied)| name == op && *denied == dtype)
    }
}
