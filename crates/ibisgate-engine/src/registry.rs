//! Model type registry
//!
//! Maps every [`ModelType`] to the immutable [`ClassificationRule`] of its
//! group. The mapping and the rules are plain data: adding a model type
//! means adding a row to [`MODEL_GROUPS`], not a new branch in the
//! resolver or validator.

use ibisgate_core::{Config, ModelType, SectionKind, ThresholdDefaults};
use serde::Serialize;
use std::sync::OnceLock;

/// Equivalence classes of model types sharing one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ModelGroup {
    /// A: inputs and I/O that need vinl/vinh
    ThresholdInput,
    /// B: ECL inputs and I/O that need vinl/vinh
    EclInput,
    /// C: outputs without input thresholds
    Output,
    /// D: open-drain/open-sink, pull-up suppressed
    OpenDrain,
    /// E: open-source, pull-down suppressed
    OpenSource,
    /// F: analog-only terminator
    Terminator,
    /// G: series elements only
    Series,
    /// H: true differential, delegated to an external model
    Differential,
}

impl ModelGroup {
    /// Short letter used in reports and the rules listing
    pub fn letter(&self) -> char {
        match self {
            Self::ThresholdInput => 'A',
            Self::EclInput => 'B',
            Self::Output => 'C',
            Self::OpenDrain => 'D',
            Self::OpenSource => 'E',
            Self::Terminator => 'F',
            Self::Series => 'G',
            Self::Differential => 'H',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ThresholdInput => "threshold-required inputs",
            Self::EclInput => "ECL threshold-required inputs",
            Self::Output => "no-threshold outputs",
            Self::OpenDrain => "open-drain/open-sink, pull-up suppressed",
            Self::OpenSource => "open-source, pull-down suppressed",
            Self::Terminator => "analog-only terminator",
            Self::Series => "series-only",
            Self::Differential => "true differential, external model",
        }
    }
}

/// How top-level `vinl` / `vinh` are treated
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Mandatory; missing values take the defaults
    Required { default_vinl: f64, default_vinh: f64 },
    /// Not applicable; dropped with a warning
    NotApplicable,
    /// Not legal; rejected by the validator
    Forbidden,
    /// Only meaningful on external-model converters
    ConverterOnly,
}

/// Data a model type cannot do without
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredData {
    Nothing,
    /// At least one non-empty, non-suppressed pull table
    PullTable,
    SeriesElement,
    ExternalModel,
}

/// Static requirements of one model group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRule {
    pub group: ModelGroup,
    pub thresholds: ThresholdPolicy,
    pub allowed_sections: &'static [SectionKind],
    /// Pull table that must be nulled when present
    pub suppressed_section: Option<SectionKind>,
    pub required_data: RequiredData,
}

impl ClassificationRule {
    pub fn requires_thresholds(&self) -> bool {
        matches!(self.thresholds, ThresholdPolicy::Required { .. })
    }

    pub fn default_vinl(&self) -> Option<f64> {
        match self.thresholds {
            ThresholdPolicy::Required { default_vinl, .. } => Some(default_vinl),
            _ => None,
        }
    }

    pub fn default_vinh(&self) -> Option<f64> {
        match self.thresholds {
            ThresholdPolicy::Required { default_vinh, .. } => Some(default_vinh),
            _ => None,
        }
    }

    pub fn requires_external_model(&self) -> bool {
        self.required_data == RequiredData::ExternalModel
    }

    pub fn allows(&self, section: SectionKind) -> bool {
        self.allowed_sections.contains(&section)
    }

    /// Sections that are rejected, or zeroed if suppressed, when present
    pub fn forbidden_sections(&self) -> Vec<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .filter(|s| !self.allows(*s) || self.suppressed_section == Some(*s))
            .collect()
    }
}

/// Errors surfaced by the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown model type '{tag}'")]
    UnknownModelType { tag: String },
}

use SectionKind::*;

const INPUT_SECTIONS: &[SectionKind] = &[
    Thresholds,
    ReceiverThresholds,
    Pullup,
    Pulldown,
    GndClamp,
    PowerClamp,
    Ramp,
    RisingWaveform,
    FallingWaveform,
    ExternalModel,
];

const OUTPUT_SECTIONS: &[SectionKind] = &[
    Pullup,
    Pulldown,
    GndClamp,
    PowerClamp,
    Ramp,
    RisingWaveform,
    FallingWaveform,
    ExternalModel,
];

const TERMINATOR_SECTIONS: &[SectionKind] = &[GndClamp, PowerClamp, ExternalModel];

const SERIES_SECTIONS: &[SectionKind] = &[SeriesElements, GndClamp, PowerClamp, ExternalModel];

const DIFFERENTIAL_SECTIONS: &[SectionKind] = &[
    ReceiverThresholds,
    GndClamp,
    PowerClamp,
    Ramp,
    RisingWaveform,
    FallingWaveform,
    ExternalModel,
];

/// Model type to group assignment
pub const MODEL_GROUPS: [(ModelType, ModelGroup); 19] = [
    (ModelType::Input, ModelGroup::ThresholdInput),
    (ModelType::Io, ModelGroup::ThresholdInput),
    (ModelType::IoOpenDrain, ModelGroup::ThresholdInput),
    (ModelType::IoOpenSink, ModelGroup::ThresholdInput),
    (ModelType::IoOpenSource, ModelGroup::ThresholdInput),
    (ModelType::InputEcl, ModelGroup::EclInput),
    (ModelType::IoEcl, ModelGroup::EclInput),
    (ModelType::Output, ModelGroup::Output),
    (ModelType::ThreeState, ModelGroup::Output),
    (ModelType::OpenDrain, ModelGroup::OpenDrain),
    (ModelType::OpenSink, ModelGroup::OpenDrain),
    (ModelType::OpenSource, ModelGroup::OpenSource),
    (ModelType::Terminator, ModelGroup::Terminator),
    (ModelType::Series, ModelGroup::Series),
    (ModelType::SeriesSwitch, ModelGroup::Series),
    (ModelType::InputDiff, ModelGroup::Differential),
    (ModelType::OutputDiff, ModelGroup::Differential),
    (ModelType::IoDiff, ModelGroup::Differential),
    (ModelType::ThreeStateDiff, ModelGroup::Differential),
];

/// The rule table, with threshold defaults filled in
fn rule_table(defaults: ThresholdDefaults) -> Vec<ClassificationRule> {
    let required = ThresholdPolicy::Required {
        default_vinl: defaults.default_vinl,
        default_vinh: defaults.default_vinh,
    };

    vec![
        ClassificationRule {
            group: ModelGroup::ThresholdInput,
            thresholds: required,
            allowed_sections: INPUT_SECTIONS,
            suppressed_section: None,
            required_data: RequiredData::Nothing,
        },
        ClassificationRule {
            group: ModelGroup::EclInput,
            thresholds: required,
            allowed_sections: INPUT_SECTIONS,
            suppressed_section: None,
            required_data: RequiredData::Nothing,
        },
        ClassificationRule {
            group: ModelGroup::Output,
            thresholds: ThresholdPolicy::NotApplicable,
            allowed_sections: OUTPUT_SECTIONS,
            suppressed_section: None,
            required_data: RequiredData::PullTable,
        },
        ClassificationRule {
            group: ModelGroup::OpenDrain,
            thresholds: ThresholdPolicy::NotApplicable,
            allowed_sections: OUTPUT_SECTIONS,
            suppressed_section: Some(Pullup),
            required_data: RequiredData::PullTable,
        },
        ClassificationRule {
            group: ModelGroup::OpenSource,
            thresholds: ThresholdPolicy::NotApplicable,
            allowed_sections: OUTPUT_SECTIONS,
            suppressed_section: Some(Pulldown),
            required_data: RequiredData::PullTable,
        },
        ClassificationRule {
            group: ModelGroup::Terminator,
            thresholds: ThresholdPolicy::Forbidden,
            allowed_sections: TERMINATOR_SECTIONS,
            suppressed_section: None,
            required_data: RequiredData::Nothing,
        },
        ClassificationRule {
            group: ModelGroup::Series,
            thresholds: ThresholdPolicy::NotApplicable,
            allowed_sections: SERIES_SECTIONS,
            suppressed_section: None,
            required_data: RequiredData::SeriesElement,
        },
        ClassificationRule {
            group: ModelGroup::Differential,
            thresholds: ThresholdPolicy::ConverterOnly,
            allowed_sections: DIFFERENTIAL_SECTIONS,
            suppressed_section: None,
            required_data: RequiredData::ExternalModel,
        },
    ]
}

/// Immutable lookup from model type to rule.
///
/// Safe to share across any number of worker threads.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<ClassificationRule>,
}

static BUILTIN: OnceLock<RuleRegistry> = OnceLock::new();

impl RuleRegistry {
    /// Registry with the given threshold defaults
    pub fn new(defaults: ThresholdDefaults) -> Self {
        Self {
            rules: rule_table(defaults),
        }
    }

    /// Registry using the configured threshold defaults
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.thresholds)
    }

    /// Process-wide registry with the stock defaults, built on first use
    pub fn builtin() -> &'static RuleRegistry {
        BUILTIN.get_or_init(|| Self::new(ThresholdDefaults::default()))
    }

    /// Group a model type belongs to
    pub fn group_of(model_type: ModelType) -> ModelGroup {
        MODEL_GROUPS
            .iter()
            .find(|(t, _)| *t == model_type)
            .map(|(_, g)| *g)
            .unwrap_or_else(|| unreachable!("{} missing from MODEL_GROUPS", model_type))
    }

    /// Rule of a (known) model type
    pub fn rule_for(&self, model_type: ModelType) -> &ClassificationRule {
        let group = Self::group_of(model_type);
        self.rules
            .iter()
            .find(|r| r.group == group)
            .unwrap_or_else(|| unreachable!("no rule for group {:?}", group))
    }

    /// Classify a raw type tag
    pub fn classify(&self, tag: &str) -> Result<(ModelType, &ClassificationRule), RegistryError> {
        let model_type = ModelType::from_tag(tag).ok_or_else(|| RegistryError::UnknownModelType {
            tag: tag.to_string(),
        })?;
        Ok((model_type, self.rule_for(model_type)))
    }

    /// Rule for a raw type tag
    pub fn lookup(&self, tag: &str) -> Result<&ClassificationRule, RegistryError> {
        self.classify(tag).map(|(_, rule)| rule)
    }

    /// Every model type with its rule, in registry order
    pub fn entries(&self) -> impl Iterator<Item = (ModelType, &ClassificationRule)> {
        MODEL_GROUPS.iter().map(move |(t, _)| (*t, self.rule_for(*t)))
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new(ThresholdDefaults::default())
    }
}
