use ivx_backend::BackendError;
use ivx_core::{DType, ValueError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// Axis outside `-rank..rank`, or repeated in strict mode.
    InvalidAxis {
        op: &'static str,
        axis: i64,
        rank: usize,
        duplicate: bool,
    },
    /// The backend refuses this dtype for the operation.
    UnsupportedDtype { op: &'static str, dtype: DType },
    Backend(BackendError),
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAxis {
                op,
                axis,
                rank,
                duplicate: false,
            } => write!(f, "{op}: axis {axis} out of range for rank {rank}"),
            Self::InvalidAxis {
                op,
                axis,
                duplicate: true,
                ..
            } => write!(f, "{op}: axis {axis} given more than once"),
            Self::UnsupportedDtype { op, dtype } => {
                write!(f, "{op} does not support dtype {dtype}")
            }
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for StatsError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UnsupportedDtype { op, dtype } => Self::UnsupportedDtype { op, dtype },
            other => Self::Backend(other),
        }
    }
}

impl From<ValueError> for StatsError {
    fn from(err: ValueError) -> Self {
        Self::Backend(BackendError::InvalidTensor(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_dtype_refusal_surfaces_unchanged() {
        let err = StatsError::from(BackendError::UnsupportedDtype {
            op: "cumsum",
            dtype: DType::U8,
        });
        assert_eq!(
            err,
            StatsError::UnsupportedDtype {
                op: "cumsum",
                dtype: DType::U8
            }
        );
    }

    #[test]
    fn other_backend_errors_are_wrapped() {
        let inner = BackendError::Unavailable {
            backend: "tpu".to_owned(),
        };
        let err = StatsError::from(inner.clone());
        assert_eq!(err, StatsError::Backend(inner));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_axis_display() {
        let err = StatsError::InvalidAxis {
            op: "sum",
            axis: 3,
            rank: 2,
            duplicate: false,
        };
        assert_eq!(err.to_string(), "sum: axis 3 out of range for rank 2");
        let err = StatsError::InvalidAxis {
            op: "var",
            axis: -1,
            rank: 2,
            duplicate: true,
        };
        assert_eq!(err.to_string(), "var: axis -1 given more than once");
    }
}
