//! Presence & default resolution
//!
//! Brings a classified record into the normalized form its rule expects:
//! fills missing input thresholds, drops fields that do not apply, nulls
//! suppressed pull tables and puts tabulated axes in ascending order.
//! Every change is reported as a diagnostic; nothing is altered silently.
//!
//! Resolution is idempotent: a record that already went through it comes
//! out unchanged and without new diagnostics.

use ibisgate_core::{
    Diagnostic, DiagnosticCode, ModelRecord, SectionKind, SeriesElement, SuppressionEncoding,
};

use crate::registry::{ClassificationRule, ThresholdPolicy};

/// Resolver with a fixed suppression encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolver {
    suppression: SuppressionEncoding,
}

impl Resolver {
    pub fn new(suppression: SuppressionEncoding) -> Self {
        Self { suppression }
    }

    pub fn suppression(&self) -> SuppressionEncoding {
        self.suppression
    }

    /// Resolve a record against its rule
    pub fn resolve(
        &self,
        mut record: ModelRecord,
        rule: &ClassificationRule,
    ) -> (ModelRecord, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        resolve_thresholds(&mut record, rule.thresholds, &mut diagnostics);

        if let Some(section) = rule.suppressed_section {
            self.suppress(&mut record, section, &mut diagnostics);
        }

        sort_tables(&mut record, &mut diagnostics);

        (record, diagnostics)
    }

    fn suppress(
        &self,
        record: &mut ModelRecord,
        section: SectionKind,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(slot) = record.pull_table_mut(section) else {
            return;
        };
        let Some(table) = slot.as_mut() else {
            return;
        };

        match self.suppression {
            SuppressionEncoding::Zero => {
                if table.is_zeroed() {
                    return;
                }
                table.zero_currents();
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::SuppressedSection,
                        format!("{} is not driven by this model type; currents set to 0", section),
                    )
                    .with_field(section.as_str()),
                );
            }
            SuppressionEncoding::Omit => {
                *slot = None;
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::SuppressedSection,
                        format!("{} is not driven by this model type; section removed", section),
                    )
                    .with_field(section.as_str()),
                );
            }
        }
    }
}

/// Resolve with the default (zeroing) suppression encoding
pub fn resolve(record: ModelRecord, rule: &ClassificationRule) -> (ModelRecord, Vec<Diagnostic>) {
    Resolver::default().resolve(record, rule)
}

fn resolve_thresholds(
    record: &mut ModelRecord,
    policy: ThresholdPolicy,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match policy {
        ThresholdPolicy::Required { default_vinl, default_vinh } => {
            for (field, slot, default) in [
                ("vinl", &mut record.vinl, default_vinl),
                ("vinh", &mut record.vinh, default_vinh),
            ] {
                if slot.is_none() {
                    *slot = Some(default);
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::DefaultsApplied,
                            format!("{} missing; default {} V applied", field, default),
                        )
                        .with_field(field),
                    );
                }
            }
        }
        ThresholdPolicy::NotApplicable => {
            for (field, present) in [
                ("vinl", record.vinl.take().is_some()),
                ("vinh", record.vinh.take().is_some()),
                ("receiver_thresholds", record.receiver_thresholds.take().is_some()),
            ] {
                if present {
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::IgnoredField,
                            format!("{} does not apply to this model type and was dropped", field),
                        )
                        .with_field(field),
                    );
                }
            }
        }
        // Kept for the validator to reject
        ThresholdPolicy::Forbidden => {
            let present = [
                ("vinl", record.vinl.is_some()),
                ("vinh", record.vinh.is_some()),
                ("receiver_thresholds", record.receiver_thresholds.is_some()),
            ];
            for (field, _) in present.into_iter().filter(|(_, present)| *present) {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::IgnoredField,
                        format!("{} does not apply to this model type and is ignored", field),
                    )
                    .with_field(field),
                );
            }
        }
        ThresholdPolicy::ConverterOnly => {
            let misplaced: Vec<&str> = [("vinl", record.vinl), ("vinh", record.vinh)]
                .into_iter()
                .filter(|(_, v)| v.is_some())
                .map(|(name, _)| name)
                .collect();

            if !misplaced.is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MisplacedThreshold,
                        format!(
                            "{} given at top level; differential models take thresholds on \
                             external model converters (vlow/vhigh)",
                            misplaced.join(", ")
                        ),
                    )
                    .with_field(misplaced.join(",")),
                );
            }
        }
    }
}

fn sort_tables(record: &mut ModelRecord, diagnostics: &mut Vec<Diagnostic>) {
    for (field, table) in record.iv_tables_mut() {
        if let Some(table) = table {
            if !table.is_sorted() {
                table.sort_by_voltage();
                diagnostics.push(reordered(field.to_string(), "voltage"));
            }
        }
    }

    for (i, element) in record.series_elements.iter_mut().enumerate() {
        if let SeriesElement::Mosfet { table, .. } = element {
            if !table.is_sorted() {
                table.sort_by_voltage();
                diagnostics.push(reordered(format!("series_elements[{}]", i), "voltage"));
            }
        }
    }

    for (name, waveforms) in [
        ("rising_waveforms", &mut record.rising_waveforms),
        ("falling_waveforms", &mut record.falling_waveforms),
    ] {
        for (i, waveform) in waveforms.iter_mut().enumerate() {
            if !waveform.is_sorted() {
                waveform.sort_by_time();
                diagnostics.push(reordered(format!("{}[{}]", name, i), "time"));
            }
        }
    }
}

fn reordered(field: String, axis: &str) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::ReorderedTable,
        format!("{} rows were not in ascending {} order and have been sorted", field, axis),
    )
    .with_field(field)
}
