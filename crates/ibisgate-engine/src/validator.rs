//! Structural validation
//!
//! Checks which data sections a resolved record carries against what its
//! rule allows and requires. Pure: the record is only read. Every finding
//! is an error, so a record that passes is ready for finalization.

use ibisgate_core::{
    CornerValue, Diagnostic, DiagnosticCode, ModelRecord, ReceiverThresholds, SectionKind,
    SeriesElement,
};

use crate::registry::{ClassificationRule, RequiredData};

/// Validate a resolved record against its rule
pub fn validate(record: &ModelRecord, rule: &ClassificationRule) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    check_sections(record, rule, &mut diagnostics);
    check_required_data(record, rule, &mut diagnostics);
    check_converters(record, &mut diagnostics);

    if rule.allows(SectionKind::ReceiverThresholds) {
        if let Some(thresholds) = &record.receiver_thresholds {
            check_receiver_thresholds(thresholds, &mut diagnostics);
        }
    }

    check_values(record, &mut diagnostics);

    diagnostics
}

/// One error per disallowed section. Top-level and receiver thresholds
/// count as a single `thresholds` section when neither is allowed.
fn check_sections(record: &ModelRecord, rule: &ClassificationRule, diagnostics: &mut Vec<Diagnostic>) {
    let mut thresholds_reported = false;

    for section in record.populated_sections() {
        if rule.allows(section) {
            continue;
        }

        let section = match section {
            SectionKind::ReceiverThresholds if !rule.allows(SectionKind::Thresholds) => {
                SectionKind::Thresholds
            }
            other => other,
        };
        if section == SectionKind::Thresholds {
            if thresholds_reported {
                continue;
            }
            thresholds_reported = true;
        }

        diagnostics.push(
            Diagnostic::error(
                DiagnosticCode::DisallowedSection,
                format!("{} is not legal for {} models", section, rule.group.description()),
            )
            .with_field(section.as_str()),
        );
    }
}

fn check_required_data(
    record: &ModelRecord,
    rule: &ClassificationRule,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match rule.required_data {
        RequiredData::Nothing => {}
        RequiredData::PullTable => {
            let usable = [SectionKind::Pullup, SectionKind::Pulldown]
                .into_iter()
                .filter(|s| rule.allows(*s) && rule.suppressed_section != Some(*s))
                .filter_map(|s| record.pull_table(s))
                .any(|t| !t.is_empty());

            if !usable {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MissingPullData,
                        "no non-empty pull-up or pull-down table",
                    )
                    .with_field("pullup,pulldown"),
                );
            }
        }
        RequiredData::SeriesElement => {
            if record.series_elements.is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MissingSeriesData,
                        "series models need at least one series element",
                    )
                    .with_field("series_elements"),
                );
            }
        }
        RequiredData::ExternalModel => {
            let present = record.external_model.as_ref().is_some_and(|e| !e.is_blank());
            if !present {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MissingExternalModel,
                        "differential models must reference an external model",
                    )
                    .with_field("external_model"),
                );
            }
        }
    }
}

fn check_converters(record: &ModelRecord, diagnostics: &mut Vec<Diagnostic>) {
    let Some(external) = &record.external_model else {
        return;
    };

    for (kind, converter) in external.converters() {
        // Written so NaN also fails
        if !(converter.vlow < converter.vhigh) {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::InvalidConverterRange,
                    format!(
                        "{} converter on port '{}': vlow ({}) must be below vhigh ({})",
                        kind, converter.port, converter.vlow, converter.vhigh
                    ),
                )
                .with_field(format!("external_model.{}", kind)),
            );
        }
    }
}

fn check_receiver_thresholds(thresholds: &ReceiverThresholds, diagnostics: &mut Vec<Diagnostic>) {
    let ReceiverThresholds { vth, vinh_ac, vinl_ac, vinh_dc, vinl_dc } = *thresholds;
    let mut problems = Vec::new();

    let all = [Some(vth), vinh_ac, vinl_ac, vinh_dc, vinl_dc];
    if all.iter().flatten().any(|v| !v.is_finite()) {
        problems.push("values must be finite".to_string());
    }

    if let Some(dc) = vinh_dc {
        if dc < 0.0 {
            problems.push(format!("vinh_dc offset {} is negative", dc));
        }
    }
    if let Some(dc) = vinl_dc {
        if dc > 0.0 {
            problems.push(format!("vinl_dc offset {} is positive", dc));
        }
    }
    if let (Some(ac), Some(dc)) = (vinh_ac, vinh_dc) {
        if ac < dc {
            problems.push(format!("vinh_ac ({}) is below vinh_dc ({})", ac, dc));
        }
    }
    if let (Some(ac), Some(dc)) = (vinl_ac, vinl_dc) {
        if ac > dc {
            problems.push(format!("vinl_ac ({}) is above vinl_dc ({})", ac, dc));
        }
    }

    if !problems.is_empty() {
        diagnostics.push(
            Diagnostic::error(DiagnosticCode::InvalidReceiverThresholds, problems.join("; "))
                .with_field("receiver_thresholds"),
        );
    }
}

fn check_values(record: &ModelRecord, diagnostics: &mut Vec<Diagnostic>) {
    let invalid = |field: String, what: &str| {
        Diagnostic::error(DiagnosticCode::InvalidValue, format!("{}: {}", field, what))
            .with_field(field)
    };

    for (field, value) in [("vinl", record.vinl), ("vinh", record.vinh)] {
        if value.is_some_and(|v| !v.is_finite()) {
            diagnostics.push(invalid(field.to_string(), "non-finite threshold"));
        }
    }

    for (field, table) in record.iv_tables() {
        if table.is_some_and(|t| !t.is_finite()) {
            diagnostics.push(invalid(field.to_string(), "non-finite table value"));
        }
    }

    if record.ramp.is_some_and(|r| !r.is_finite()) {
        diagnostics.push(invalid("ramp".to_string(), "non-finite slew rate"));
    }

    for (field, waveform) in record.waveforms() {
        if !waveform.is_finite() {
            diagnostics.push(invalid(field.clone(), "non-finite waveform value"));
        }
        if waveform.fixture.r_fixture.is_finite() && waveform.fixture.r_fixture <= 0.0 {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::InvalidWaveformFixture,
                    format!(
                        "{}: r_fixture must be positive, got {}",
                        field, waveform.fixture.r_fixture
                    ),
                )
                .with_field(format!("{}.fixture", field)),
            );
        }
    }

    for (i, element) in record.series_elements.iter().enumerate() {
        let field = format!("series_elements[{}]", i);
        match element {
            SeriesElement::Resistor { ohms: value }
            | SeriesElement::Inductor { henries: value }
            | SeriesElement::Capacitor { farads: value } => {
                if let Some(problem) = passive_problem(value) {
                    diagnostics.push(invalid(field, &format!("{} {}", element.label(), problem)));
                }
            }
            SeriesElement::Mosfet { vds, table } => {
                if !vds.is_finite() || !table.is_finite() {
                    diagnostics.push(invalid(field, "non-finite mosfet value"));
                }
            }
        }
    }
}

fn passive_problem(value: &CornerValue) -> Option<&'static str> {
    if !value.is_finite() {
        Some("value is not finite")
    } else if value.values().any(|v| v < 0.0) {
        Some("value is negative")
    } else {
        None
    }
}
