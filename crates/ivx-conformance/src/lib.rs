#![forbid(unsafe_code)]

pub mod oracle;

use ivx_backend::BackendCapability;
use ivx_core::{AxisSpec, CompatibilityMode, DType, Tensor};
use ivx_stats::{ReduceKind, ReduceOptions, ScanOp, ScanOptions, StatsError, reduce, scan};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PARITY_REPORT_SCHEMA: &str = "ivx.stats-parity-report.v1";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    pub strict_mode: bool,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            strict_mode: true,
        }
    }

    #[must_use]
    pub fn mode(&self) -> CompatibilityMode {
        if self.strict_mode {
            CompatibilityMode::Strict
        } else {
            CompatibilityMode::Hardened
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub suite: &'static str,
    pub fixture_count: usize,
    pub strict_mode: bool,
}

#[must_use]
pub fn run_smoke(config: &HarnessConfig) -> HarnessReport {
    HarnessReport {
        suite: "smoke",
        fixture_count: collect_json_fixtures(&config.fixture_root).len(),
        strict_mode: config.strict_mode,
    }
}

#[must_use]
pub fn collect_json_fixtures(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect_json_fixtures_recursive(root, &mut out);
    out.sort();
    out
}

fn collect_json_fixtures_recursive(root: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_json_fixtures_recursive(&path, out);
            continue;
        }

        if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
}

// ── Fixture Schema ─────────────────────────────────────────────────

/// Tensor as written in a fixture. JSON has no NaN, so `null` stands for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureTensor {
    pub dtype: DType,
    pub dims: Vec<u32>,
    pub values: Vec<Option<f64>>,
}

impl FixtureTensor {
    pub fn to_tensor(&self) -> Result<Tensor, String> {
        let values: Vec<f64> = self
            .values
            .iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect();
        Tensor::from_f64(self.dtype, &self.dims, &values)
            .map_err(|err| format!("fixture tensor conversion failed: {err}"))
    }

    #[must_use]
    pub fn from_tensor(tensor: &Tensor) -> Self {
        Self {
            dtype: tensor.dtype,
            dims: tensor.dims().to_vec(),
            values: tensor
                .to_f64_vec()
                .into_iter()
                .map(|value| (!value.is_nan()).then_some(value))
                .collect(),
        }
    }

    /// Same dtype and dims; integral values exact, floating values within
    /// tolerance, NaN only where `null` is expected.
    #[must_use]
    pub fn approx_matches(&self, actual: &Tensor, atol: f64, rtol: f64) -> bool {
        if actual.dtype != self.dtype || actual.dims() != self.dims.as_slice() {
            return false;
        }
        let actual_values = actual.to_f64_vec();
        actual_values.len() == self.values.len()
            && self
                .values
                .iter()
                .zip(&actual_values)
                .all(|(expected, &actual)| match expected {
                    None => actual.is_nan(),
                    Some(expected) if self.dtype.is_floating() => {
                        approx_equal(*expected, actual, atol, rtol)
                    }
                    Some(expected) => *expected == actual,
                })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixtureOp {
    Reduce {
        op: String,
        #[serde(default)]
        axis: AxisSpec,
        #[serde(default)]
        dtype: Option<DType>,
        #[serde(default)]
        keepdims: bool,
        #[serde(default)]
        correction: Option<f64>,
    },
    Scan {
        op: String,
        #[serde(default)]
        axis: i64,
        #[serde(default)]
        exclusive: bool,
        #[serde(default)]
        reverse: bool,
        #[serde(default)]
        dtype: Option<DType>,
    },
}

/// Error classes a fixture may expect instead of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    InvalidAxis,
    UnsupportedDtype,
    Backend,
}

impl ErrorClass {
    #[must_use]
    pub fn of(err: &StatsError) -> Self {
        match err {
            StatsError::InvalidAxis { .. } => Self::InvalidAxis,
            StatsError::UnsupportedDtype { .. } => Self::UnsupportedDtype,
            StatsError::Backend(_) => Self::Backend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixtureExpected {
    Tensor(FixtureTensor),
    Error { error: ErrorClass },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFixtureCase {
    pub case_id: String,
    #[serde(default)]
    pub mode: CompatibilityMode,
    pub op: FixtureOp,
    pub input: FixtureTensor,
    pub expected: FixtureExpected,
    #[serde(default = "default_tolerance")]
    pub atol: f64,
    #[serde(default = "default_tolerance")]
    pub rtol: f64,
}

fn default_tolerance() -> f64 {
    1e-6
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFixtureBundle {
    pub schema_version: String,
    pub generated_by: String,
    pub cases: Vec<StatsFixtureCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub case_id: String,
    pub mode: CompatibilityMode,
    pub matched: bool,
    pub expected_json: String,
    pub actual_json: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsParityReport {
    pub schema_version: String,
    pub backend: String,
    pub total_cases: usize,
    pub matched_cases: usize,
    pub mismatched_cases: usize,
    pub reports: Vec<CaseReport>,
}

impl StatsParityReport {
    #[must_use]
    pub fn mismatches(&self) -> Vec<&CaseReport> {
        self.reports.iter().filter(|report| !report.matched).collect()
    }
}

pub fn read_fixture_bundle(path: &Path) -> Result<StatsFixtureBundle, std::io::Error> {
    let raw = fs::read_to_string(path)?;
    let parsed = serde_json::from_str::<StatsFixtureBundle>(&raw).map_err(std::io::Error::other)?;
    Ok(parsed)
}

// ── Parity Runner ──────────────────────────────────────────────────

#[must_use]
pub fn run_fixture_bundle(
    config: &HarnessConfig,
    backend: &dyn BackendCapability,
    bundle: &StatsFixtureBundle,
) -> StatsParityReport {
    let reports: Vec<CaseReport> = bundle
        .cases
        .iter()
        .map(|case| run_fixture_case(config, backend, case))
        .collect();
    let matched_cases = reports.iter().filter(|report| report.matched).count();
    debug!(
        "fixture bundle from {}: {matched_cases}/{} cases matched on {}",
        bundle.generated_by,
        reports.len(),
        backend.name()
    );

    StatsParityReport {
        schema_version: PARITY_REPORT_SCHEMA.to_owned(),
        backend: backend.name().to_owned(),
        total_cases: reports.len(),
        matched_cases,
        mismatched_cases: reports.len().saturating_sub(matched_cases),
        reports,
    }
}

/// Evaluate one fixture operation.
pub fn execute_fixture_op(
    backend: &dyn BackendCapability,
    mode: CompatibilityMode,
    op: &FixtureOp,
    input: &Tensor,
) -> Result<Result<Tensor, StatsError>, String> {
    match op {
        FixtureOp::Reduce {
            op,
            axis,
            dtype,
            keepdims,
            correction,
        } => {
            let kind =
                ReduceKind::from_name(op).ok_or_else(|| format!("unknown reduction `{op}`"))?;
            let mut options = ReduceOptions::new().axis(axis.clone()).keepdims(*keepdims);
            if let Some(dtype) = dtype {
                options = options.dtype(*dtype);
            }
            if let Some(correction) = correction {
                options = options.correction(*correction);
            }
            Ok(reduce(backend, mode, kind, input, &options, None))
        }
        FixtureOp::Scan {
            op,
            axis,
            exclusive,
            reverse,
            dtype,
        } => {
            let op = match op.as_str() {
                "cumsum" => ScanOp::CumSum,
                "cumprod" => ScanOp::CumProd,
                other => return Err(format!("unknown scan `{other}`")),
            };
            let mut options = ScanOptions::new()
                .axis(*axis)
                .exclusive(*exclusive)
                .reverse(*reverse);
            if let Some(dtype) = dtype {
                options = options.dtype(*dtype);
            }
            Ok(scan(backend, op, input, &options, None))
        }
    }
}

fn run_fixture_case(
    config: &HarnessConfig,
    backend: &dyn BackendCapability,
    case: &StatsFixtureCase,
) -> CaseReport {
    // A hardened harness upgrades every case; strict runs keep the fixture's mode.
    let mode = match config.mode() {
        CompatibilityMode::Strict => case.mode,
        CompatibilityMode::Hardened => CompatibilityMode::Hardened,
    };
    let expected_json = serde_json::to_string(&case.expected)
        .unwrap_or_else(|err| format!("<expected serialization error: {err}>"));
    let report = |matched: bool, actual_json: Option<String>, error: Option<String>| CaseReport {
        case_id: case.case_id.clone(),
        mode,
        matched,
        expected_json: expected_json.clone(),
        actual_json,
        error,
    };

    let input = match case.input.to_tensor() {
        Ok(input) => input,
        Err(err) => return report(false, None, Some(err)),
    };

    let outcome = match execute_fixture_op(backend, mode, &case.op, &input) {
        Ok(outcome) => outcome,
        Err(err) => return report(false, None, Some(err)),
    };

    match (outcome, &case.expected) {
        (Ok(actual), FixtureExpected::Tensor(expected)) => {
            let matched = expected.approx_matches(&actual, case.atol, case.rtol);
            let actual_json = serde_json::to_string(&FixtureTensor::from_tensor(&actual))
                .unwrap_or_else(|err| format!("<actual serialization error: {err}>"));
            if !matched {
                warn!("{}: output mismatch", case.case_id);
            }
            report(
                matched,
                Some(actual_json),
                (!matched).then(|| "output mismatch".to_owned()),
            )
        }
        (Ok(actual), FixtureExpected::Error { error }) => report(
            false,
            serde_json::to_string(&FixtureTensor::from_tensor(&actual)).ok(),
            Some(format!("expected {error:?} error, got a tensor")),
        ),
        (Err(err), FixtureExpected::Error { error }) => {
            let matched = ErrorClass::of(&err) == *error;
            report(matched, None, (!matched).then(|| err.to_string()))
        }
        (Err(err), FixtureExpected::Tensor(_)) => report(false, None, Some(err.to_string())),
    }
}

fn approx_equal(expected: f64, actual: f64, atol: f64, rtol: f64) -> bool {
    let tolerance = atol + rtol * expected.abs();
    (expected - actual).abs() <= tolerance
}
