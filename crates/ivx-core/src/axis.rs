//! Axis and correction arguments as they arrive from callers.

use serde::{Deserialize, Serialize};

/// Which dimensions an operation applies to.
///
/// `All` is the absent argument. `Many(vec![])` is the explicit empty set and
/// means "reduce nothing", which is not the same thing as `All`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisSpec {
    #[default]
    All,
    Single(i64),
    Many(Vec<i64>),
}

impl AxisSpec {
    #[must_use]
    pub fn none() -> Self {
        Self::Many(Vec::new())
    }

    #[must_use]
    pub fn is_explicit_empty(&self) -> bool {
        matches!(self, Self::Many(axes) if axes.is_empty())
    }
}

impl From<i64> for AxisSpec {
    fn from(axis: i64) -> Self {
        Self::Single(axis)
    }
}

impl From<Vec<i64>> for AxisSpec {
    fn from(axes: Vec<i64>) -> Self {
        Self::Many(axes)
    }
}

impl From<&[i64]> for AxisSpec {
    fn from(axes: &[i64]) -> Self {
        Self::Many(axes.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for AxisSpec {
    fn from(axes: [i64; N]) -> Self {
        Self::Many(axes.to_vec())
    }
}

impl From<Option<i64>> for AxisSpec {
    fn from(axis: Option<i64>) -> Self {
        axis.map_or(Self::All, Self::Single)
    }
}

/// Map a possibly negative axis index into `0..rank`.
///
/// Negative indices count from the end, so the accepted range is
/// `-rank..rank`. Anything else yields `None`.
#[must_use]
pub fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = i64::try_from(rank).ok()?;
    let normalized = if axis < 0 { axis + rank } else { axis };
    if (0..rank).contains(&normalized) {
        usize::try_from(normalized).ok()
    } else {
        None
    }
}

/// Bias term for variance and standard deviation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Divide by the sample count.
    #[default]
    Population,
    /// Divide by the sample count minus one.
    Sample,
    Custom(f64),
}

impl Correction {
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Self::Population => 0.0,
            Self::Sample => 1.0,
            Self::Custom(value) => value,
        }
    }
}

impl From<f64> for Correction {
    fn from(value: f64) -> Self {
        if value == 0.0 {
            Self::Population
        } else if value == 1.0 {
            Self::Sample
        } else {
            Self::Custom(value)
        }
    }
}

impl From<i64> for Correction {
    fn from(value: i64) -> Self {
        Self::from(value as f64)
    }
}
