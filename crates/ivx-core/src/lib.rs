#![forbid(unsafe_code)]

pub mod axis;
pub mod dtype;
#[cfg(test)]
pub mod proptest_strategies;

pub use axis::{AxisSpec, Correction, normalize_axis};
pub use dtype::{DType, DTypeKind, promote_types};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityMode {
    /// Reject malformed arguments such as duplicate axes.
    #[default]
    Strict,
    /// Repair malformed arguments where the repair is unambiguous.
    Hardened,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub dims: Vec<u32>,
}

impl Shape {
    #[must_use]
    pub fn new(dims: Vec<u32>) -> Self {
        Self { dims }
    }

    #[must_use]
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    #[must_use]
    pub fn vector(len: u32) -> Self {
        Self { dims: vec![len] }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    #[must_use]
    pub fn element_count(&self) -> Option<u64> {
        self.dims
            .iter()
            .try_fold(1_u64, |acc, dim| acc.checked_mul(u64::from(*dim)))
    }

    /// Product of the extents along `axes`. The empty product is 1.
    /// `None` on overflow, which a zero-size tensor can still reach.
    #[must_use]
    pub fn extent_product(&self, axes: &[usize]) -> Option<u64> {
        axes.iter()
            .filter_map(|&axis| self.dims.get(axis))
            .try_fold(1_u64, |acc, &dim| acc.checked_mul(u64::from(dim)))
    }

    /// Shape left after reducing over `axes`.
    #[must_use]
    pub fn reduced(&self, axes: &[usize], keepdims: bool) -> Self {
        let dims = self
            .dims
            .iter()
            .enumerate()
            .filter_map(|(axis, &dim)| match (axes.contains(&axis), keepdims) {
                (false, _) => Some(dim),
                (true, true) => Some(1),
                (true, false) => None,
            })
            .collect();
        Self { dims }
    }

    /// Row-major strides in elements.
    #[must_use]
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.rank();
        let mut strides = vec![1_usize; rank];
        for i in (0..rank.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1].saturating_mul(self.dims[i + 1] as usize);
        }
        strides
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    I64(i64),
    Bool(bool),
    F64Bits(u64),
}

impl Literal {
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self::F64Bits(value.to_bits())
    }

    /// Numeric view of the literal. Booleans read as 0 and 1.
    #[must_use]
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Self::F64Bits(bits) => Some(f64::from_bits(bits)),
            Self::I64(value) => Some(value as f64),
            Self::Bool(value) => Some(f64::from(u8::from(value))),
        }
    }

    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::I64(value) => Some(value),
            Self::Bool(value) => Some(i64::from(value)),
            Self::F64Bits(_) => None,
        }
    }

    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(self, Self::I64(_))
    }
}

/// Host-resident n-dimensional array.
///
/// Elements are stored row-major and are always canonical for `dtype`
/// (see [`DType::cast_literal`]), so two tensors holding the same values
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: Shape,
    pub elements: Vec<Literal>,
}

impl Tensor {
    pub fn new(dtype: DType, shape: Shape, elements: Vec<Literal>) -> Result<Self, ValueError> {
        let expected_count = shape.element_count().ok_or(ValueError::ShapeOverflow {
            shape: shape.clone(),
        })?;

        if expected_count != elements.len() as u64 {
            return Err(ValueError::ElementCountMismatch {
                shape,
                expected_count,
                actual_count: elements.len(),
            });
        }

        let elements = elements
            .into_iter()
            .map(|literal| dtype.cast_literal(literal))
            .collect();

        Ok(Self {
            dtype,
            shape,
            elements,
        })
    }

    pub fn from_f64(dtype: DType, dims: &[u32], values: &[f64]) -> Result<Self, ValueError> {
        let elements = values.iter().copied().map(Literal::from_f64).collect();
        Self::new(dtype, Shape::new(dims.to_vec()), elements)
    }

    pub fn from_i64(dtype: DType, dims: &[u32], values: &[i64]) -> Result<Self, ValueError> {
        let elements = values.iter().copied().map(Literal::I64).collect();
        Self::new(dtype, Shape::new(dims.to_vec()), elements)
    }

    pub fn from_bool(dims: &[u32], values: &[bool]) -> Result<Self, ValueError> {
        let elements = values.iter().copied().map(Literal::Bool).collect();
        Self::new(DType::Bool, Shape::new(dims.to_vec()), elements)
    }

    pub fn vector_f64(values: &[f64]) -> Result<Self, ValueError> {
        Self::from_f64(DType::F64, &[values.len() as u32], values)
    }

    pub fn vector_i64(values: &[i64]) -> Result<Self, ValueError> {
        Self::from_i64(DType::I64, &[values.len() as u32], values)
    }

    #[must_use]
    pub fn scalar(dtype: DType, value: f64) -> Self {
        Self {
            dtype,
            shape: Shape::scalar(),
            elements: vec![dtype.cast_literal(Literal::from_f64(value))],
        }
    }

    /// Tensor of `shape` with every element set to `value`.
    pub fn full(dtype: DType, shape: Shape, value: f64) -> Result<Self, ValueError> {
        let count = shape.element_count().ok_or(ValueError::ShapeOverflow {
            shape: shape.clone(),
        })?;
        let literal = dtype.cast_literal(Literal::from_f64(value));
        Ok(Self {
            dtype,
            shape,
            elements: vec![literal; count as usize],
        })
    }

    #[must_use]
    pub fn cast(&self, dtype: DType) -> Self {
        if dtype == self.dtype {
            return self.clone();
        }
        Self {
            dtype,
            shape: self.shape.clone(),
            elements: self
                .elements
                .iter()
                .map(|&literal| dtype.cast_literal(literal))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    #[must_use]
    pub fn dims(&self) -> &[u32] {
        &self.shape.dims
    }

    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.elements
            .iter()
            .map(|literal| literal.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Integer view of the elements; `None` for floating tensors.
    #[must_use]
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        self.elements.iter().copied().map(Literal::as_i64).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    ShapeOverflow {
        shape: Shape,
    },
    ElementCountMismatch {
        shape: Shape,
        expected_count: u64,
        actual_count: usize,
    },
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeOverflow { shape } => {
                write!(f, "shape element count overflowed: {:?}", shape.dims)
            }
            Self::ElementCountMismatch {
                shape,
                expected_count,
                actual_count,
            } => {
                write!(
                    f,
                    "tensor element count mismatch for shape {:?}: expected {}, got {}",
                    shape.dims, expected_count, actual_count
                )
            }
        }
    }
}

impl std::error::Error for ValueError {}
