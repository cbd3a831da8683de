//! Parity against the hand-verified fixture bundles under `fixtures/`.

use ivx_backend::{BackendRegistry, CpuBackend};
use ivx_conformance::{
    HarnessConfig, StatsParityReport, collect_json_fixtures, read_fixture_bundle,
    run_fixture_bundle,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run_all(config: &HarnessConfig) -> Vec<StatsParityReport> {
    let backend = CpuBackend::default();
    collect_json_fixtures(&config.fixture_root)
        .iter()
        .map(|path| {
            let bundle = read_fixture_bundle(path)
                .unwrap_or_else(|err| panic!("{} should parse: {err}", path.display()));
            run_fixture_bundle(config, &backend, &bundle)
        })
        .collect()
}

#[test]
fn every_fixture_case_matches() {
    init_logging();
    let reports = run_all(&HarnessConfig::default_paths());
    assert!(!reports.is_empty(), "expected at least one fixture bundle");

    for report in &reports {
        assert!(report.total_cases > 0);
        assert_eq!(
            report.mismatched_cases,
            0,
            "mismatches: {:#?}",
            report.mismatches()
        );
    }
}

#[test]
fn parity_report_serializes() {
    let reports = run_all(&HarnessConfig::default_paths());
    let json = serde_json::to_string_pretty(&reports).expect("report should serialize");
    let back: Vec<StatsParityReport> = serde_json::from_str(&json).expect("report should parse");
    assert_eq!(back, reports);
}

#[test]
fn hardened_run_only_changes_duplicate_axis_cases() {
    init_logging();
    let hardened = HarnessConfig {
        strict_mode: false,
        ..HarnessConfig::default_paths()
    };
    for report in run_all(&hardened) {
        let mismatched: Vec<&str> = report
            .mismatches()
            .iter()
            .map(|case| case.case_id.as_str())
            .collect();
        assert_eq!(mismatched, vec!["sum_duplicate_axis_strict"]);
    }
}

#[test]
fn fixtures_run_on_registry_default() {
    let registry = BackendRegistry::default();
    let backend = registry.resolve(None).expect("default backend");
    let config = HarnessConfig::default_paths();
    for path in collect_json_fixtures(&config.fixture_root) {
        let bundle = read_fixture_bundle(&path).expect("bundle");
        let report = run_fixture_bundle(&config, backend, &bundle);
        assert_eq!(report.matched_cases, report.total_cases);
        assert_eq!(report.backend, backend.name());
    }
}
