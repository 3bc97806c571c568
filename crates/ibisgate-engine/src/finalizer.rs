//! Test-load finalization
//!
//! Every model type needs the same reference load before its timing data
//! means anything. Only presence is checked here.

use ibisgate_core::{Diagnostic, DiagnosticCode, ModelRecord};

/// Attach the test-load requirement to a validated record.
///
/// Emits a single `missing-test-load` error naming every base field that
/// is absent. Rising/falling refinements are optional and never checked.
pub fn finalize(record: ModelRecord) -> (ModelRecord, Vec<Diagnostic>) {
    let missing = record.test_load.missing_fields();
    if missing.is_empty() {
        return (record, Vec::new());
    }

    let field = missing
        .iter()
        .map(|name| format!("test_load.{}", name))
        .collect::<Vec<_>>()
        .join(",");

    let diagnostic = Diagnostic::error(
        DiagnosticCode::MissingTestLoad,
        format!("test load incomplete: missing {}", missing.join(", ")),
    )
    .with_field(field);

    (record, vec![diagnostic])
}
