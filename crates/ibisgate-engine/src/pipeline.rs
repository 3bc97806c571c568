//! Record pipeline
//!
//! Drives one record through classification, resolution, validation and
//! finalization. The first stage that reports an error rejects the record
//! and the remaining stages are skipped. Rejected records are returned
//! with their diagnostics, never dropped.

use ibisgate_core::{
    Config, Diagnostic, DiagnosticSink, ModelRecord, ModelType, RecordReport, RecordStatus,
    Report, Stage, UnclassifiedRecord,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::finalizer::finalize;
use crate::registry::{RegistryError, RuleRegistry};
use crate::resolver::Resolver;
use crate::validator::validate;

/// A record after the pipeline has run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRecord {
    /// Record as left by the last stage that ran
    pub record: ModelRecord,

    pub model_type: ModelType,

    /// `Finalized` or `Rejected`
    pub status: RecordStatus,

    /// Stage that rejected the record
    pub rejected_at: Option<Stage>,

    pub diagnostics: DiagnosticSink,
}

impl ProcessedRecord {
    pub fn is_finalized(&self) -> bool {
        self.status == RecordStatus::Finalized
    }

    pub fn is_rejected(&self) -> bool {
        self.status == RecordStatus::Rejected
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_slice()
    }

    pub fn to_report(&self) -> RecordReport {
        RecordReport {
            name: self.record.name.clone(),
            model_type: self.model_type.tag().to_string(),
            status: self.status,
            rejected_at: self.rejected_at,
            diagnostics: self.diagnostics.as_slice().to_vec(),
        }
    }
}

impl From<ProcessedRecord> for RecordReport {
    fn from(processed: ProcessedRecord) -> Self {
        RecordReport {
            name: processed.record.name,
            model_type: processed.model_type.tag().to_string(),
            status: processed.status,
            rejected_at: processed.rejected_at,
            diagnostics: processed.diagnostics.into_vec(),
        }
    }
}

/// Classification and validation pipeline over a shared registry
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'r> {
    registry: &'r RuleRegistry,
    resolver: Resolver,
    parallel: bool,
}

impl Pipeline<'static> {
    /// Pipeline over the builtin registry with default settings
    pub fn builtin() -> Self {
        Self::new(RuleRegistry::builtin())
    }
}

impl<'r> Pipeline<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self {
            registry,
            resolver: Resolver::default(),
            parallel: true,
        }
    }

    /// Pipeline honoring the `[pipeline]` settings.
    ///
    /// Threshold defaults live in the registry, build it with
    /// [`RuleRegistry::from_config`] from the same config.
    pub fn with_config(registry: &'r RuleRegistry, config: &Config) -> Self {
        Self {
            registry,
            resolver: Resolver::new(config.pipeline.suppressed_sections),
            parallel: config.pipeline.parallel,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &'r RuleRegistry {
        self.registry
    }

    /// Run one record through every stage.
    ///
    /// Fails only when the model type is not recognized, before any stage
    /// has looked at the record.
    pub fn process(&self, record: ModelRecord) -> Result<ProcessedRecord, RegistryError> {
        let (model_type, rule) = self.registry.classify(&record.model_type)?;
        let name = record.name.clone();

        let mut sink = DiagnosticSink::new();
        let mut status = RecordStatus::Classified;
        debug!(model = %name, %model_type, group = %rule.group.letter(), "classified");

        let (record, found) = self.resolver.resolve(record, rule);
        if collect(&mut sink, &name, found) {
            return Ok(reject(record, model_type, Stage::Resolve, sink));
        }
        status = status.advance();
        debug!(model = %name, %status, "stage complete");

        let found = validate(&record, rule);
        if collect(&mut sink, &name, found) {
            return Ok(reject(record, model_type, Stage::Validate, sink));
        }
        status = status.advance();
        debug!(model = %name, %status, "stage complete");

        let (record, found) = finalize(record);
        if collect(&mut sink, &name, found) {
            return Ok(reject(record, model_type, Stage::Finalize, sink));
        }
        status = status.advance();
        debug!(model = %name, %status, warnings = sink.warning_count(), "stage complete");

        Ok(ProcessedRecord {
            record,
            model_type,
            status,
            rejected_at: None,
            diagnostics: sink,
        })
    }

    /// Process a batch, keeping input order in the results
    pub fn process_batch(
        &self,
        records: Vec<ModelRecord>,
    ) -> Vec<Result<ProcessedRecord, RegistryError>> {
        let count = records.len();

        let results: Vec<_> = if self.parallel {
            records.into_par_iter().map(|r| self.process(r)).collect()
        } else {
            records.into_iter().map(|r| self.process(r)).collect()
        };

        let finalized = results
            .iter()
            .filter(|r| r.as_ref().is_ok_and(ProcessedRecord::is_finalized))
            .count();
        let unclassified = results.iter().filter(|r| r.is_err()).count();
        info!(
            records = count,
            finalized,
            rejected = count - finalized - unclassified,
            unclassified,
            parallel = self.parallel,
            "batch processed"
        );

        results
    }

    /// Process a batch and collect the outcomes into a report
    pub fn check(&self, records: Vec<ModelRecord>) -> Report {
        let labels: Vec<(String, String)> = records
            .iter()
            .map(|r| (r.name.clone(), r.model_type.clone()))
            .collect();

        let mut report = Report::new();
        for ((name, model_type), result) in labels.into_iter().zip(self.process_batch(records)) {
            match result {
                Ok(processed) => report.add_record(processed.into()),
                Err(err) => report.add_unclassified(UnclassifiedRecord {
                    name,
                    model_type,
                    error: err.to_string(),
                }),
            }
        }
        report
    }
}

/// Append stage output to the sink, returning whether it rejects the record
fn collect(sink: &mut DiagnosticSink, name: &str, found: Vec<Diagnostic>) -> bool {
    let rejects = found.iter().any(Diagnostic::is_error);
    if name.is_empty() {
        sink.extend(found);
    } else {
        sink.extend(found.into_iter().map(|d| d.with_model(name)));
    }
    rejects
}

fn reject(
    record: ModelRecord,
    model_type: ModelType,
    stage: Stage,
    diagnostics: DiagnosticSink,
) -> ProcessedRecord {
    if let Some(first) = diagnostics.first_error() {
        warn!(
            model = %record.name,
            %stage,
            code = %first.code,
            errors = diagnostics.error_count(),
            "record rejected"
        );
    }

    ProcessedRecord {
        record,
        model_type,
        status: RecordStatus::Rejected,
        rejected_at: Some(stage),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibisgate_core::{
        DiagnosticCode, ExternalModelRef, IvTable, ReceiverThresholds, SuppressionEncoding,
        TestLoad, ThresholdDefaults,
    };
    use pretty_assertions::assert_eq;

    fn load() -> TestLoad {
        TestLoad::new(50.0, 0.0, 0.0)
    }

    fn pulls() -> IvTable {
        IvTable::from_pairs(&[(0.0, 0.0), (3.3, 0.05)])
    }

    #[test]
    fn present_thresholds_kept_missing_defaulted() {
        let record = ModelRecord::new("DQ_in", "Input")
            .with_thresholds(Some(0.7), None)
            .with_test_load(load());

        let processed = Pipeline::builtin().process(record).unwrap();

        assert!(processed.is_finalized());
        assert_eq!(processed.record.vinl, Some(0.7));
        assert_eq!(processed.record.vinh, Some(2.0));
        assert_eq!(processed.diagnostics.len(), 1);

        let warning = &processed.diagnostics()[0];
        assert_eq!(warning.code, DiagnosticCode::DefaultsApplied);
        assert_eq!(warning.field.as_deref(), Some("vinh"));
        assert_eq!(warning.model.as_deref(), Some("DQ_in"));
    }

    #[test]
    fn open_drain_pullup_zeroed_once() {
        let record = ModelRecord::new("OD", "Open_drain")
            .with_pullup(pulls())
            .with_pulldown(pulls())
            .with_test_load(load());

        let processed = Pipeline::builtin().process(record).unwrap();

        assert!(processed.is_finalized());
        assert!(processed.record.pullup.as_ref().unwrap().is_zeroed());
        assert_eq!(processed.record.pulldown, Some(pulls()));
        assert_eq!(processed.diagnostics.count_code(DiagnosticCode::SuppressedSection), 1);
        assert_eq!(processed.diagnostics.len(), 1);
    }

    #[test]
    fn terminator_with_threshold_rejected_once() {
        let record = ModelRecord::new("ODT", "Terminator")
            .with_thresholds(Some(0.8), Some(2.0))
            .with_test_load(load());

        let processed = Pipeline::builtin().process(record).unwrap();

        assert!(processed.is_rejected());
        assert_eq!(processed.rejected_at, Some(Stage::Validate));
        assert_eq!(processed.diagnostics.error_count(), 1);
        assert_eq!(processed.diagnostics.count_code(DiagnosticCode::DisallowedSection), 1);
        assert_eq!(processed.diagnostics.count_code(DiagnosticCode::IgnoredField), 2);
    }

    #[test]
    fn terminator_with_both_threshold_kinds_rejected_once() {
        let mut record = ModelRecord::new("ODT", "Terminator")
            .with_thresholds(Some(0.8), None)
            .with_test_load(load());
        record.receiver_thresholds = Some(ReceiverThresholds {
            vth: 0.9,
            vinh_ac: None,
            vinl_ac: None,
            vinh_dc: None,
            vinl_dc: None,
        });

        let processed = Pipeline::builtin().process(record).unwrap();

        assert!(processed.is_rejected());
        assert_eq!(processed.diagnostics.error_count(), 1);
        assert_eq!(processed.diagnostics.count_code(DiagnosticCode::DisallowedSection), 1);
        assert_eq!(
            processed.diagnostics.first_error().and_then(|d| d.field.as_deref()),
            Some("thresholds")
        );
    }

    #[test]
    fn open_drain_and_open_source_drop_thresholds() {
        for tag in ["Open_drain", "Open_sink", "Open_source"] {
            let record = ModelRecord::new("od", tag)
                .with_thresholds(Some(0.8), Some(2.0))
                .with_pullup(IvTable::from_pairs(&[(0.0, 0.0), (3.3, 0.0)]))
                .with_pulldown(IvTable::from_pairs(&[(0.0, 0.0), (3.3, 0.0)]))
                .with_test_load(load());

            let processed = Pipeline::builtin().process(record).unwrap();

            assert!(processed.is_finalized(), "{} not finalized", tag);
            assert_eq!(processed.record.vinl, None);
            assert_eq!(processed.record.vinh, None);
            assert_eq!(processed.diagnostics.count_code(DiagnosticCode::IgnoredField), 2, "{}", tag);
        }
    }

    #[test]
    fn unknown_type_fails_before_stages() {
        let record = ModelRecord::new("X", "Bogus");
        let err = Pipeline::builtin().process(record).unwrap_err();

        assert_eq!(err, RegistryError::UnknownModelType { tag: "Bogus".to_string() });
    }

    #[test]
    fn missing_test_load_rejected_at_finalize() {
        let record = ModelRecord::new("OUT", "Output").with_pulldown(pulls());
        let processed = Pipeline::builtin().process(record).unwrap();

        assert!(processed.is_rejected());
        assert_eq!(processed.rejected_at, Some(Stage::Finalize));
        assert_eq!(
            processed.diagnostics.first_error().map(|d| d.code),
            Some(DiagnosticCode::MissingTestLoad)
        );
    }

    #[test]
    fn resolve_error_skips_later_stages() {
        // No external model either, but validation never runs
        let record = ModelRecord::new("LVDS", "Input_diff")
            .with_thresholds(Some(0.8), Some(2.0))
            .with_test_load(load());

        let processed = Pipeline::builtin().process(record).unwrap();

        assert_eq!(processed.rejected_at, Some(Stage::Resolve));
        assert_eq!(processed.diagnostics.len(), 1);
        assert_eq!(processed.diagnostics()[0].code, DiagnosticCode::MisplacedThreshold);
    }

    #[test]
    fn finalized_record_is_fixed_point() {
        let record = ModelRecord::new("IO1", "I/O")
            .with_thresholds(None, None)
            .with_pullup(IvTable::from_pairs(&[(3.3, 0.05), (0.0, 0.0)]))
            .with_pulldown(pulls())
            .with_test_load(load());

        let pipeline = Pipeline::builtin();
        let first = pipeline.process(record).unwrap();
        assert!(first.is_finalized());
        assert!(!first.diagnostics.is_empty());

        let second = pipeline.process(first.record.clone()).unwrap();
        assert!(second.is_finalized());
        assert!(second.diagnostics.is_empty());
        assert_eq!(second.record, first.record);
    }

    #[test]
    fn batch_keeps_input_order() {
        let records = vec![
            ModelRecord::new("a", "Output").with_pulldown(pulls()).with_test_load(load()),
            ModelRecord::new("b", "Bogus"),
            ModelRecord::new("c", "Series"),
            ModelRecord::new("d", "IO_diff")
                .with_external_model(ExternalModelRef {
                    model: "lvds".to_string(),
                    ..ExternalModelRef::default()
                })
                .with_test_load(load()),
        ];

        let parallel = Pipeline::builtin().process_batch(records.clone());
        let sequential = Pipeline::builtin().parallel(false).process_batch(records);
        assert_eq!(parallel, sequential);

        let names: Vec<_> = parallel
            .iter()
            .map(|r| r.as_ref().map(|p| p.record.name.as_str()).ok())
            .collect();
        assert_eq!(names, vec![Some("a"), None, Some("c"), Some("d")]);
        assert!(parallel[2].as_ref().unwrap().is_rejected());
    }

    #[test]
    fn check_builds_report() {
        let records = vec![
            ModelRecord::new("a", "3-state").with_pulldown(pulls()).with_test_load(load()),
            ModelRecord::new("b", "Mystery"),
            ModelRecord::new("c", "Terminator").with_pullup(pulls()).with_test_load(load()),
        ];

        let report = Pipeline::builtin().check(records);

        assert_eq!(report.summary.records_checked, 2);
        assert_eq!(report.summary.finalized, 1);
        assert_eq!(report.summary.rejected, 1);
        assert_eq!(report.summary.unclassified, 1);
        assert_eq!(report.unclassified[0].name, "b");
        assert_eq!(report.unclassified[0].error, "unknown model type 'Mystery'");
        assert_eq!(report.records[1].rejected_at, Some(Stage::Validate));
        assert!(report.has_rejections());
    }

    #[test]
    fn config_changes_defaults_and_encoding() {
        let mut config = Config::default();
        config.thresholds = ThresholdDefaults { default_vinl: 0.35, default_vinh: 1.3 };
        config.pipeline.suppressed_sections = SuppressionEncoding::Omit;
        config.pipeline.parallel = false;

        let registry = RuleRegistry::from_config(&config);
        let pipeline = Pipeline::with_config(&registry, &config);

        let input = ModelRecord::new("in", "Input_ECL").with_test_load(load());
        let processed = pipeline.process(input).unwrap();
        assert_eq!(processed.record.vinl, Some(0.35));
        assert_eq!(processed.record.vinh, Some(1.3));

        let open_source = ModelRecord::new("os", "Open_source")
            .with_pullup(pulls())
            .with_pulldown(pulls())
            .with_test_load(load());
        let processed = pipeline.process(open_source).unwrap();
        assert!(processed.is_finalized());
        assert_eq!(processed.record.pulldown, None);
        assert_eq!(processed.diagnostics.count_code(DiagnosticCode::SuppressedSection), 1);
    }

    #[test]
    fn report_conversion_uses_canonical_tag() {
        let record = ModelRecord::new("io", "i/o").with_pulldown(pulls()).with_test_load(load());
        let processed = Pipeline::builtin().process(record).unwrap();

        let report = processed.to_report();
        assert_eq!(report.model_type, "IO");
        assert_eq!(RecordReport::from(processed), report);
    }
}
