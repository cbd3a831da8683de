//! Axis normalization at the call boundary.

use ivx_core::{AxisSpec, CompatibilityMode, normalize_axis};
use log::warn;
use smallvec::SmallVec;

use crate::StatsError;

/// Normalized, ascending, duplicate-free reduction axes.
pub type AxisList = SmallVec<[usize; 4]>;

fn normalize_one(op: &'static str, axis: i64, rank: usize) -> Result<usize, StatsError> {
    normalize_axis(axis, rank).ok_or(StatsError::InvalidAxis {
        op,
        axis,
        rank,
        duplicate: false,
    })
}

/// Resolve `spec` against a tensor of `rank` dimensions.
///
/// `All` expands to every axis. Duplicates (after normalization, so `-1` and
/// `rank - 1` collide) are rejected in strict mode and dropped in hardened
/// mode.
pub fn normalize_axes(
    op: &'static str,
    spec: &AxisSpec,
    rank: usize,
    mode: CompatibilityMode,
) -> Result<AxisList, StatsError> {
    let raw: &[i64] = match spec {
        AxisSpec::All => return Ok((0..rank).collect()),
        AxisSpec::Single(axis) => std::slice::from_ref(axis),
        AxisSpec::Many(axes) => axes,
    };

    let mut axes = AxisList::with_capacity(raw.len());
    for &axis in raw {
        let normalized = normalize_one(op, axis, rank)?;
        if axes.contains(&normalized) {
            match mode {
                CompatibilityMode::Strict => {
                    return Err(StatsError::InvalidAxis {
                        op,
                        axis,
                        rank,
                        duplicate: true,
                    });
                }
                CompatibilityMode::Hardened => {
                    warn!("{op}: dropping repeated axis {axis} (normalized {normalized})");
                    continue;
                }
            }
        }
        axes.push(normalized);
    }
    axes.sort_unstable();
    Ok(axes)
}

/// Resolve the single scan axis. A rank-0 input is scanned as a length-1
/// vector, so `0` and `-1` are both accepted for it.
pub fn normalize_scan_axis(op: &'static str, axis: i64, rank: usize) -> Result<usize, StatsError> {
    normalize_one(op, axis, rank.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_axis_expands_to_all() {
        let axes = normalize_axes("sum", &AxisSpec::All, 3, CompatibilityMode::Strict)
            .expect("all axes");
        assert_eq!(axes.as_slice(), &[0, 1, 2]);
        let axes = normalize_axes("sum", &AxisSpec::All, 0, CompatibilityMode::Strict)
            .expect("scalar");
        assert!(axes.is_empty());
    }

    #[test]
    fn negative_axes_count_from_end_and_sort() {
        let axes = normalize_axes(
            "prod",
            &AxisSpec::from([-1, 0]),
            3,
            CompatibilityMode::Strict,
        )
        .expect("axes");
        assert_eq!(axes.as_slice(), &[0, 2]);
    }

    #[test]
    fn out_of_range_axis_is_rejected() {
        let err = normalize_axes("sum", &AxisSpec::Single(2), 2, CompatibilityMode::Hardened)
            .expect_err("out of range");
        assert_eq!(
            err,
            StatsError::InvalidAxis {
                op: "sum",
                axis: 2,
                rank: 2,
                duplicate: false
            }
        );
        assert!(normalize_axes("sum", &AxisSpec::Single(-3), 2, CompatibilityMode::Strict).is_err());
    }

    #[test]
    fn duplicates_depend_on_mode() {
        let spec = AxisSpec::from([1, -1]);
        let err = normalize_axes("var", &spec, 2, CompatibilityMode::Strict)
            .expect_err("strict rejects");
        assert!(matches!(err, StatsError::InvalidAxis { duplicate: true, .. }));

        let _ = env_logger::builder().is_test(true).try_init();
        let axes = normalize_axes("var", &spec, 2, CompatibilityMode::Hardened)
            .expect("hardened dedupes");
        assert_eq!(axes.as_slice(), &[1]);
    }

    #[test]
    fn explicit_empty_set_stays_empty() {
        let axes = normalize_axes("sum", &AxisSpec::none(), 2, CompatibilityMode::Strict)
            .expect("empty");
        assert!(axes.is_empty());
    }

    #[test]
    fn scan_axis_on_scalar() {
        assert_eq!(normalize_scan_axis("cumsum", 0, 0), Ok(0));
        assert_eq!(normalize_scan_axis("cumsum", -1, 0), Ok(0));
        assert!(normalize_scan_axis("cumsum", 1, 0).is_err());
    }
}
