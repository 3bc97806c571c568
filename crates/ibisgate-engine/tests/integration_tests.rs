//! Integration tests for the checking pipeline
//!
//! These tests push the JSON fixtures under `fixtures/` through the full
//! pipeline and check outcomes per record.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ibisgate-engine --test integration_tests
//! ```

use std::path::PathBuf;

use ibisgate_core::{
    Config, DiagnosticCode, ModelRecord, RecordStatus, Report, Severity, Stage,
};
use ibisgate_engine::{Pipeline, ProcessedRecord, RegistryError, RuleRegistry};
use pretty_assertions::assert_eq;

// =============================================================================
// Helper Functions
// =============================================================================

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn load_batch() -> Vec<ModelRecord> {
    let json = std::fs::read_to_string(fixture_path("mixed_batch.json")).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn by_name<'a>(
    results: &'a [Result<ProcessedRecord, RegistryError>],
    name: &str,
) -> &'a ProcessedRecord {
    results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .find(|p| p.record.name == name)
        .unwrap_or_else(|| panic!("no processed record named {}", name))
}

fn codes(processed: &ProcessedRecord) -> Vec<DiagnosticCode> {
    processed.diagnostics().iter().map(|d| d.code).collect()
}

// =============================================================================
// Batch Outcomes
// =============================================================================

#[test]
fn test_mixed_batch_outcomes() {
    let results = Pipeline::builtin().process_batch(load_batch());
    assert_eq!(results.len(), 9);

    let dq = by_name(&results, "DQ");
    assert_eq!(dq.status, RecordStatus::Finalized);
    assert_eq!(dq.record.vinl, Some(0.8));
    assert_eq!(dq.record.vinh, Some(2.0));
    assert_eq!(codes(dq), vec![DiagnosticCode::DefaultsApplied]);

    let clk = by_name(&results, "CLK_OUT");
    assert_eq!(clk.status, RecordStatus::Finalized);
    assert_eq!(clk.record.vinl, None);
    assert_eq!(
        codes(clk),
        vec![DiagnosticCode::IgnoredField, DiagnosticCode::ReorderedTable]
    );
    assert!(clk.record.pulldown.as_ref().unwrap().is_sorted());

    let alert = by_name(&results, "ALERT_N");
    assert_eq!(alert.status, RecordStatus::Finalized);
    assert!(alert.record.pullup.as_ref().unwrap().is_zeroed());
    assert_eq!(codes(alert), vec![DiagnosticCode::SuppressedSection]);

    let odt = by_name(&results, "ODT");
    assert_eq!(odt.status, RecordStatus::Rejected);
    assert_eq!(odt.rejected_at, Some(Stage::Validate));
    assert_eq!(
        codes(odt),
        vec![DiagnosticCode::IgnoredField, DiagnosticCode::DisallowedSection]
    );

    let series = by_name(&results, "RS33");
    assert!(series.is_finalized());
    assert!(series.diagnostics().is_empty());

    let rx = by_name(&results, "LVDS_RX");
    assert!(rx.is_finalized());
    assert!(rx.diagnostics().is_empty());

    let tx = by_name(&results, "LVDS_TX");
    assert_eq!(tx.rejected_at, Some(Stage::Validate));
    assert_eq!(codes(tx), vec![DiagnosticCode::InvalidConverterRange]);

    let en = by_name(&results, "EN");
    assert_eq!(en.rejected_at, Some(Stage::Finalize));
    assert_eq!(en.diagnostics()[0].field.as_deref(), Some("test_load.cref"));

    assert_eq!(
        results[8],
        Err(RegistryError::UnknownModelType { tag: "Schmitt".to_string() })
    );
}

#[test]
fn test_diagnostics_carry_model_name() {
    let results = Pipeline::builtin().process_batch(load_batch());

    for processed in results.iter().filter_map(|r| r.as_ref().ok()) {
        for diagnostic in processed.diagnostics() {
            assert_eq!(diagnostic.model.as_deref(), Some(processed.record.name.as_str()));
        }
    }
}

#[test]
fn test_rejected_records_hold_first_error_stage() {
    let results = Pipeline::builtin().process_batch(load_batch());

    for processed in results.iter().filter_map(|r| r.as_ref().ok()) {
        match processed.status {
            RecordStatus::Finalized => {
                assert!(processed.rejected_at.is_none());
                assert!(!processed.diagnostics.has_errors());
            }
            RecordStatus::Rejected => {
                assert!(processed.rejected_at.is_some());
                assert!(processed.diagnostics.has_errors());
            }
            other => panic!("non-terminal status {} for {}", other, processed.record.name),
        }
    }
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_finalized_records_are_fixed_points() {
    let pipeline = Pipeline::builtin();
    let finalized: Vec<ProcessedRecord> = pipeline
        .process_batch(load_batch())
        .into_iter()
        .filter_map(Result::ok)
        .filter(ProcessedRecord::is_finalized)
        .collect();
    assert_eq!(finalized.len(), 5);

    for first in finalized {
        let second = pipeline.process(first.record.clone()).unwrap();
        assert!(second.is_finalized(), "{} not finalized on rerun", first.record.name);
        assert!(second.diagnostics().is_empty(), "{} emitted on rerun", first.record.name);
        assert_eq!(second.record, first.record);
    }
}

#[test]
fn test_single_record_fixture() {
    let json = std::fs::read_to_string(fixture_path("single_input.json")).unwrap();
    let record: ModelRecord = serde_json::from_str(&json).unwrap();

    let processed = Pipeline::builtin().process(record).unwrap();

    assert!(processed.is_finalized());
    assert_eq!(processed.diagnostics.count_code(DiagnosticCode::DefaultsApplied), 2);
    assert!(processed.diagnostics().iter().all(|d| d.severity == Severity::Warning));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_fixture_config_applies() {
    let config = Config::from_file(&fixture_path("ibisgate.toml")).unwrap();
    let registry = RuleRegistry::from_config(&config);
    let pipeline = Pipeline::with_config(&registry, &config);

    let results = pipeline.process_batch(load_batch());

    let dq = by_name(&results, "DQ");
    assert_eq!(dq.record.vinh, Some(0.85));

    let alert = by_name(&results, "ALERT_N");
    assert!(alert.is_finalized());
    assert_eq!(alert.record.pullup, None);
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn test_report_summary_and_json() {
    let report = Pipeline::builtin().check(load_batch());

    assert_eq!(report.summary.records_checked, 8);
    assert_eq!(report.summary.finalized, 5);
    assert_eq!(report.summary.rejected, 3);
    assert_eq!(report.summary.unclassified, 1);
    assert_eq!(report.summary.warnings, 5);
    assert_eq!(report.summary.errors, 3);

    let json = report.to_json().unwrap();
    assert!(json.contains("\"invalid-converter-range\""));
    assert!(json.contains("\"rejected_at\": \"finalize\""));

    let parsed: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.summary, report.summary);
    assert_eq!(parsed.records.len(), 8);
}
