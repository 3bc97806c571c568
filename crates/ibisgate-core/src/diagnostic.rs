//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    // Presence & default resolution
    /// A missing input threshold was replaced by the category default
    DefaultsApplied,

    /// A field that does not apply to the model type was dropped
    IgnoredField,

    /// A pull table the model type must not drive was normalized
    SuppressedSection,

    /// Digital thresholds given at the top level of a differential model
    MisplacedThreshold,

    /// A tabulated axis was out of order and has been sorted
    ReorderedTable,

    // Structural validation
    /// A populated section is not legal for the model type
    DisallowedSection,

    /// No usable pull-up or pull-down table
    MissingPullData,

    /// No series element descriptor
    MissingSeriesData,

    /// External model reference is absent or blank
    MissingExternalModel,

    /// Converter `vlow` is not below `vhigh`
    InvalidConverterRange,

    /// Receiver threshold offsets are inconsistent
    InvalidReceiverThresholds,

    /// Non-finite number or negative passive value
    InvalidValue,

    /// Waveform fixture resistance is not positive
    InvalidWaveformFixture,

    // Finalization
    /// Rref, Cref or Vref is not set
    MissingTestLoad,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultsApplied => "defaults-applied",
            Self::IgnoredField => "ignored-field",
            Self::SuppressedSection => "suppressed-section",
            Self::MisplacedThreshold => "misplaced-threshold",
            Self::ReorderedTable => "reordered-table",
            Self::DisallowedSection => "disallowed-section",
            Self::MissingPullData => "missing-pull-data",
            Self::MissingSeriesData => "missing-series-data",
            Self::MissingExternalModel => "missing-external-model",
            Self::InvalidConverterRange => "invalid-converter-range",
            Self::InvalidReceiverThresholds => "invalid-receiver-thresholds",
            Self::InvalidValue => "invalid-value",
            Self::InvalidWaveformFixture => "invalid-waveform-fixture",
            Self::MissingTestLoad => "missing-test-load",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
///
/// Only two levels exist: a warning never stops a record, an error always
/// rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Non-fatal - record continues through the pipeline
    Warning,

    /// Fatal - record is rejected
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Record field the diagnostic is about (e.g. `vinl`, `test_load.rref`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Name of the model record that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            field: None,
            model: None,
        }
    }

    /// Shorthand for a warning
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    /// Shorthand for an error
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Set the field
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the originating model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Ordered, append-only collector of diagnostics for one record.
///
/// Entries keep emission order so callers can apply "first error wins".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticSink {
    entries: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if any collected diagnostic is fatal
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    /// First fatal diagnostic in emission order
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.entries.iter().find(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    /// Count diagnostics carrying a given code
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::DefaultsApplied.as_str(), "defaults-applied");
        assert_eq!(DiagnosticCode::MissingTestLoad.as_str(), "missing-test-load");
        assert_eq!(DiagnosticCode::InvalidConverterRange.to_string(), "invalid-converter-range");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::error(DiagnosticCode::MissingPullData, "no pull table")
            .with_field("pullup")
            .with_model("DQ_OUT");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"missing-pull-data\""));
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"field\":\"pullup\""));
    }

    #[test]
    fn serde_code_matches_as_str() {
        let json = serde_json::to_string(&DiagnosticCode::InvalidWaveformFixture).unwrap();
        assert_eq!(json, format!("\"{}\"", DiagnosticCode::InvalidWaveformFixture.as_str()));
    }

    #[test]
    fn sink_preserves_emission_order() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::warning(DiagnosticCode::DefaultsApplied, "vinl"));
        sink.push(Diagnostic::error(DiagnosticCode::MissingTestLoad, "rref"));
        sink.push(Diagnostic::error(DiagnosticCode::DisallowedSection, "series"));

        assert_eq!(sink.len(), 3);
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.first_error().unwrap().code, DiagnosticCode::MissingTestLoad);

        let codes: Vec<_> = sink.into_vec().into_iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::DefaultsApplied,
                DiagnosticCode::MissingTestLoad,
                DiagnosticCode::DisallowedSection,
            ]
        );
    }
}
