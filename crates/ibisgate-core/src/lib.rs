//! ibisgate Core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod model;
pub mod status;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
pub use model::{
    CornerValue, Converter, Edge, ExternalModelRef, IvPoint, IvTable, ModelRecord, ModelType,
    Ramp, ReceiverThresholds, SectionKind, SeriesElement, TestLoad, TestLoadTriple,
    TestLoadVariant, VtPoint, WaveformFixture, WaveformTable,
};
pub use status::{RecordStatus, Stage};
pub use report::{RecordReport, Report, ReportSummary, ReportVersion, UnclassifiedRecord};
pub use config::{Config, ConfigError, PipelineConfig, SuppressionEncoding, ThresholdDefaults};
