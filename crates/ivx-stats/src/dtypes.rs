//! Output dtype resolution.

use ivx_backend::BackendCapability;
use ivx_core::DType;

use crate::StatsError;

/// Accumulator dtype for sums, products, and scans.
///
/// Narrow types widen to the backend's default dtype of the same family
/// (`int8` → `int64`, `float16` → `float32` on the host backend); types at
/// least as wide as that default are kept.
#[must_use]
pub fn infer_accumulator_dtype(backend: &dyn BackendCapability, dtype: DType) -> DType {
    let default = backend.default_dtype_for(dtype);
    if backend.bit_width(dtype) < backend.bit_width(default) {
        default
    } else {
        dtype
    }
}

/// Fail early when the backend declares `op` unsupported for `dtype`.
pub(crate) fn ensure_supported(
    backend: &dyn BackendCapability,
    op: &'static str,
    dtype: DType,
) -> Result<(), StatsError> {
    if backend.capabilities().supports(op, dtype) {
        Ok(())
    } else {
        Err(StatsError::UnsupportedDtype { op, dtype })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivx_backend::{CpuBackend, CpuBackendConfig};

    #[test]
    fn narrow_types_widen_to_defaults() {
        let backend = CpuBackend::default();
        assert_eq!(infer_accumulator_dtype(&backend, DType::Bool), DType::I64);
        assert_eq!(infer_accumulator_dtype(&backend, DType::I8), DType::I64);
        assert_eq!(infer_accumulator_dtype(&backend, DType::I32), DType::I64);
        assert_eq!(infer_accumulator_dtype(&backend, DType::F16), DType::F32);
        assert_eq!(infer_accumulator_dtype(&backend, DType::BF16), DType::F32);
    }

    #[test]
    fn wide_types_are_kept() {
        let backend = CpuBackend::default();
        assert_eq!(infer_accumulator_dtype(&backend, DType::I64), DType::I64);
        assert_eq!(infer_accumulator_dtype(&backend, DType::F32), DType::F32);
        assert_eq!(infer_accumulator_dtype(&backend, DType::F64), DType::F64);
    }

    #[test]
    fn defaults_follow_backend_config() {
        let backend = CpuBackend::new(CpuBackendConfig {
            default_int: DType::I32,
            default_float: DType::F64,
            ..CpuBackendConfig::default()
        });
        assert_eq!(infer_accumulator_dtype(&backend, DType::I16), DType::I32);
        assert_eq!(infer_accumulator_dtype(&backend, DType::I64), DType::I64);
        assert_eq!(infer_accumulator_dtype(&backend, DType::F32), DType::F64);
    }

    #[test]
    fn unsupported_pairs_fail_early() {
        let backend = CpuBackend::default();
        assert!(ensure_supported(&backend, "sum", DType::I8).is_ok());
        assert_eq!(
            ensure_supported(&backend, "sum", DType::U8),
            Err(StatsError::UnsupportedDtype {
                op: "sum",
                dtype: DType::U8
            })
        );
    }
}
