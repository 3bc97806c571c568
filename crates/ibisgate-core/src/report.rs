//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};
use crate::status::{RecordStatus, Stage};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of diagnostics
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of records that went through the pipeline
    pub records_checked: usize,

    /// Records accepted for downstream use
    pub finalized: usize,

    /// Records rejected by a stage
    pub rejected: usize,

    /// Records whose model type is not recognized
    pub unclassified: usize,
}

/// Outcome of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordReport {
    pub name: String,

    pub model_type: String,

    pub status: RecordStatus,

    /// Stage that rejected the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<Stage>,

    /// Diagnostics in emission order
    pub diagnostics: Vec<Diagnostic>,
}

/// A record that never entered the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclassifiedRecord {
    pub name: String,
    pub model_type: String,
    pub error: String,
}

/// Check report (report.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Per-record outcomes, in input order
    pub records: Vec<RecordReport>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified: Vec<UnclassifiedRecord>,

    /// Run context: tool version, inputs, effective config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            records: Vec::new(),
            unclassified: Vec::new(),
            metadata: None,
        }
    }

    /// Create a report from record outcomes
    pub fn from_records(records: impl IntoIterator<Item = RecordReport>) -> Self {
        let mut report = Self::new();
        for record in records {
            report.add_record(record);
        }
        report
    }

    /// Add a record outcome to the report
    pub fn add_record(&mut self, record: RecordReport) {
        for diagnostic in &record.diagnostics {
            match diagnostic.severity {
                Severity::Error => self.summary.errors += 1,
                Severity::Warning => self.summary.warnings += 1,
            }
            self.summary.total += 1;
        }

        match record.status {
            RecordStatus::Finalized => self.summary.finalized += 1,
            RecordStatus::Rejected => self.summary.rejected += 1,
            _ => {}
        }

        self.summary.records_checked += 1;
        self.records.push(record);
    }

    /// Add a record that failed classification
    pub fn add_unclassified(&mut self, record: UnclassifiedRecord) {
        self.summary.unclassified += 1;
        self.unclassified.push(record);
    }

    /// All diagnostics across records, in record order
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().flat_map(|r| r.diagnostics.iter())
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn has_rejections(&self) -> bool {
        self.summary.rejected > 0
    }

    pub fn has_unclassified(&self) -> bool {
        self.summary.unclassified > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
