//! Statistical operations over any [`BackendCapability`].
//!
//! Two components do the work: the reduction normalizer in [`reduce`], which
//! resolves axes and output dtypes and builds arbitrary variance corrections,
//! and the scan emulator in [`scan`], which derives exclusive and reverse
//! cumulative operations from a backend's inclusive forward scan.
//! [`Stats`] bundles a backend and a [`CompatibilityMode`] behind one
//! method per operation.

#![forbid(unsafe_code)]

pub mod axes;
pub mod dtypes;
mod error;
pub mod reduce;
pub mod scan;

pub use axes::{AxisList, normalize_axes, normalize_scan_axis};
pub use dtypes::infer_accumulator_dtype;
pub use error::StatsError;
pub use ivx_backend::ScanOp;
pub use reduce::{ReduceKind, ReduceOptions, reduce};
pub use scan::{ScanOptions, scan};

use ivx_backend::BackendCapability;
use ivx_core::{CompatibilityMode, Tensor};

/// Overwrite a caller-supplied output buffer with the finished result.
fn write_out(out: Option<&mut Tensor>, result: &Tensor) {
    if let Some(out) = out {
        out.clone_from(result);
    }
}

/// A backend paired with the argument-checking mode used for every call.
#[derive(Clone, Copy)]
pub struct Stats<'a> {
    backend: &'a dyn BackendCapability,
    mode: CompatibilityMode,
}

impl std::fmt::Debug for Stats<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stats")
            .field("backend", &self.backend.name())
            .field("mode", &self.mode)
            .finish()
    }
}

impl<'a> Stats<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn BackendCapability) -> Self {
        Self {
            backend,
            mode: CompatibilityMode::Strict,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: CompatibilityMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn backend(&self) -> &'a dyn BackendCapability {
        self.backend
    }

    #[must_use]
    pub fn mode(&self) -> CompatibilityMode {
        self.mode
    }

    // ── Reductions ─────────────────────────────────────────────────

    pub fn reduce(
        &self,
        kind: ReduceKind,
        tensor: &Tensor,
        options: &ReduceOptions,
    ) -> Result<Tensor, StatsError> {
        reduce::reduce(self.backend, self.mode, kind, tensor, options, None)
    }

    /// Like [`Stats::reduce`], also writing the result into `out`.
    pub fn reduce_into(
        &self,
        kind: ReduceKind,
        tensor: &Tensor,
        options: &ReduceOptions,
        out: &mut Tensor,
    ) -> Result<Tensor, StatsError> {
        reduce::reduce(self.backend, self.mode, kind, tensor, options, Some(out))
    }

    pub fn sum(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Sum, tensor, options)
    }

    pub fn prod(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Prod, tensor, options)
    }

    pub fn mean(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Mean, tensor, options)
    }

    pub fn min(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Min, tensor, options)
    }

    pub fn max(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Max, tensor, options)
    }

    pub fn nansum(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::NanSum, tensor, options)
    }

    pub fn var(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Var, tensor, options)
    }

    pub fn std(&self, tensor: &Tensor, options: &ReduceOptions) -> Result<Tensor, StatsError> {
        self.reduce(ReduceKind::Std, tensor, options)
    }

    // ── Scans ──────────────────────────────────────────────────────

    pub fn scan(
        &self,
        op: ScanOp,
        tensor: &Tensor,
        options: &ScanOptions,
    ) -> Result<Tensor, StatsError> {
        scan::scan(self.backend, op, tensor, options, None)
    }

    /// Like [`Stats::scan`], also writing the result into `out`.
    pub fn scan_into(
        &self,
        op: ScanOp,
        tensor: &Tensor,
        options: &ScanOptions,
        out: &mut Tensor,
    ) -> Result<Tensor, StatsError> {
        scan::scan(self.backend, op, tensor, options, Some(out))
    }

    pub fn cumsum(&self, tensor: &Tensor, options: &ScanOptions) -> Result<Tensor, StatsError> {
        self.scan(ScanOp::CumSum, tensor, options)
    }

    pub fn cumprod(&self, tensor: &Tensor, options: &ScanOptions) -> Result<Tensor, StatsError> {
        self.scan(ScanOp::CumProd, tensor, options)
    }
}
