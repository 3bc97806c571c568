//! Buffer model records and their data sections
//!
//! A [`ModelRecord`] is what the extraction stage hands over: one physical
//! buffer model with its declared type and whatever electrical data could
//! be harvested. Every section is optional; which ones are legal depends
//! on the model type.

use serde::{Deserialize, Serialize};

/// Closed set of recognized buffer model categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelType {
    Input,
    #[serde(rename = "IO")]
    Io,
    #[serde(rename = "IO_open_drain")]
    IoOpenDrain,
    #[serde(rename = "IO_open_sink")]
    IoOpenSink,
    #[serde(rename = "IO_open_source")]
    IoOpenSource,
    #[serde(rename = "Input_ECL")]
    InputEcl,
    #[serde(rename = "IO_ECL")]
    IoEcl,
    Output,
    #[serde(rename = "3-state")]
    ThreeState,
    #[serde(rename = "Open_drain")]
    OpenDrain,
    #[serde(rename = "Open_sink")]
    OpenSink,
    #[serde(rename = "Open_source")]
    OpenSource,
    Terminator,
    Series,
    #[serde(rename = "Series_switch")]
    SeriesSwitch,
    #[serde(rename = "Input_diff")]
    InputDiff,
    #[serde(rename = "Output_diff")]
    OutputDiff,
    #[serde(rename = "IO_diff")]
    IoDiff,
    #[serde(rename = "3-state_diff")]
    ThreeStateDiff,
}

impl ModelType {
    /// Every model type, in registry order
    pub const ALL: [ModelType; 19] = [
        Self::Input,
        Self::Io,
        Self::IoOpenDrain,
        Self::IoOpenSink,
        Self::IoOpenSource,
        Self::InputEcl,
        Self::IoEcl,
        Self::Output,
        Self::ThreeState,
        Self::OpenDrain,
        Self::OpenSink,
        Self::OpenSource,
        Self::Terminator,
        Self::Series,
        Self::SeriesSwitch,
        Self::InputDiff,
        Self::OutputDiff,
        Self::IoDiff,
        Self::ThreeStateDiff,
    ];

    /// Canonical tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Io => "IO",
            Self::IoOpenDrain => "IO_open_drain",
            Self::IoOpenSink => "IO_open_sink",
            Self::IoOpenSource => "IO_open_source",
            Self::InputEcl => "Input_ECL",
            Self::IoEcl => "IO_ECL",
            Self::Output => "Output",
            Self::ThreeState => "3-state",
            Self::OpenDrain => "Open_drain",
            Self::OpenSink => "Open_sink",
            Self::OpenSource => "Open_source",
            Self::Terminator => "Terminator",
            Self::Series => "Series",
            Self::SeriesSwitch => "Series_switch",
            Self::InputDiff => "Input_diff",
            Self::OutputDiff => "Output_diff",
            Self::IoDiff => "IO_diff",
            Self::ThreeStateDiff => "3-state_diff",
        }
    }

    /// Parse a model type tag.
    ///
    /// Matching is case-insensitive, and the `I/O` spelling used in `.ibs`
    /// files is accepted wherever the canonical tag says `IO`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_ascii_lowercase().replace("i/o", "io");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag().to_ascii_lowercase() == normalized)
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Kinds of data section a record may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Top-level `vinl` / `vinh`
    Thresholds,
    ReceiverThresholds,
    Pullup,
    Pulldown,
    GndClamp,
    PowerClamp,
    Ramp,
    RisingWaveform,
    FallingWaveform,
    SeriesElements,
    ExternalModel,
}

impl SectionKind {
    pub const ALL: [SectionKind; 11] = [
        Self::Thresholds,
        Self::ReceiverThresholds,
        Self::Pullup,
        Self::Pulldown,
        Self::GndClamp,
        Self::PowerClamp,
        Self::Ramp,
        Self::RisingWaveform,
        Self::FallingWaveform,
        Self::SeriesElements,
        Self::ExternalModel,
    ];

    /// Field name of the section on [`ModelRecord`]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thresholds => "thresholds",
            Self::ReceiverThresholds => "receiver_thresholds",
            Self::Pullup => "pullup",
            Self::Pulldown => "pulldown",
            Self::GndClamp => "gnd_clamp",
            Self::PowerClamp => "power_clamp",
            Self::Ramp => "ramp",
            Self::RisingWaveform => "rising_waveforms",
            Self::FallingWaveform => "falling_waveforms",
            Self::SeriesElements => "series_elements",
            Self::ExternalModel => "external_model",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value with typ/min/max process corners (typ mandatory)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerValue {
    pub typ: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl CornerValue {
    pub fn typ(typ: f64) -> Self {
        Self { typ, min: None, max: None }
    }

    pub fn new(typ: f64, min: f64, max: f64) -> Self {
        Self { typ, min: Some(min), max: Some(max) }
    }

    /// All corner values that are present
    pub fn values(&self) -> impl Iterator<Item = f64> {
        std::iter::once(self.typ).chain(self.min).chain(self.max)
    }

    pub fn is_finite(&self) -> bool {
        self.values().all(f64::is_finite)
    }

    pub fn is_zero(&self) -> bool {
        self.values().all(|v| v == 0.0)
    }

    /// Zero every present corner, keeping which corners exist
    pub fn zero(&mut self) {
        self.typ = 0.0;
        self.min = self.min.map(|_| 0.0);
        self.max = self.max.map(|_| 0.0);
    }
}

/// One row of an I-V table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvPoint {
    pub voltage: f64,
    pub current: CornerValue,
}

/// Tabulated current-vs-voltage data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IvTable {
    pub points: Vec<IvPoint>,
}

impl IvTable {
    pub fn from_points(points: Vec<IvPoint>) -> Self {
        Self { points }
    }

    /// Build a typ-only table from `(voltage, current)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            points: pairs
                .iter()
                .map(|&(voltage, current)| IvPoint { voltage, current: CornerValue::typ(current) })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when every current of every corner is zero
    pub fn is_zeroed(&self) -> bool {
        self.points.iter().all(|p| p.current.is_zero())
    }

    /// Null the electrical effect of the table, keeping its sweep
    pub fn zero_currents(&mut self) {
        for point in &mut self.points {
            point.current.zero();
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|w| w[0].voltage <= w[1].voltage)
    }

    /// Stable sort by sweep voltage
    pub fn sort_by_voltage(&mut self) {
        self.points.sort_by(|a, b| a.voltage.total_cmp(&b.voltage));
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.voltage.is_finite() && p.current.is_finite())
    }
}

/// One row of a voltage-vs-time waveform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VtPoint {
    pub time: f64,
    pub voltage: CornerValue,
}

/// Load the waveform was captured into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformFixture {
    pub r_fixture: f64,
    pub v_fixture: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_fixture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l_fixture: Option<f64>,
}

impl WaveformFixture {
    pub fn values(&self) -> impl Iterator<Item = f64> {
        [self.r_fixture, self.v_fixture]
            .into_iter()
            .chain(self.c_fixture)
            .chain(self.l_fixture)
    }
}

/// V-T table captured into a fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformTable {
    pub fixture: WaveformFixture,
    pub points: Vec<VtPoint>,
}

impl WaveformTable {
    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|w| w[0].time <= w[1].time)
    }

    /// Stable sort by time
    pub fn sort_by_time(&mut self) {
        self.points.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    pub fn is_finite(&self) -> bool {
        self.fixture.values().all(f64::is_finite)
            && self.points.iter().all(|p| p.time.is_finite() && p.voltage.is_finite())
    }
}

/// Transition slew summary, in V/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub dv_dt_rising: CornerValue,
    pub dv_dt_falling: CornerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_load: Option<f64>,
}

impl Ramp {
    pub fn is_finite(&self) -> bool {
        self.dv_dt_rising.is_finite()
            && self.dv_dt_falling.is_finite()
            && self.r_load.map_or(true, f64::is_finite)
    }
}

/// Receiver thresholds.
///
/// `vth` is absolute; the ac/dc levels are offsets from `vth`, positive for
/// the high side and negative for the low side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReceiverThresholds {
    pub vth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vinh_ac: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vinl_ac: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vinh_dc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vinl_dc: Option<f64>,
}

/// Series component descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SeriesElement {
    Resistor { ohms: CornerValue },
    Inductor { henries: CornerValue },
    Capacitor { farads: CornerValue },
    /// Series MOSFET characterized at a given drain-source voltage
    Mosfet { vds: f64, table: IvTable },
}

impl SeriesElement {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resistor { .. } => "resistor",
            Self::Inductor { .. } => "inductor",
            Self::Capacitor { .. } => "capacitor",
            Self::Mosfet { .. } => "mosfet",
        }
    }
}

/// Digital/analog boundary of an external model port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Converter {
    pub port: String,
    pub vlow: f64,
    pub vhigh: f64,
}

/// Reference to an externally defined analog sub-model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalModelRef {
    /// Sub-model name
    pub model: String,

    /// Model language (SPICE, Verilog-AMS, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    /// D-to-A converters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub d_to_a: Vec<Converter>,

    /// A-to-D converters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a_to_d: Vec<Converter>,
}

impl ExternalModelRef {
    pub fn is_blank(&self) -> bool {
        self.model.trim().is_empty()
    }

    pub fn converters(&self) -> impl Iterator<Item = (&'static str, &Converter)> {
        self.d_to_a
            .iter()
            .map(|c| ("d_to_a", c))
            .chain(self.a_to_d.iter().map(|c| ("a_to_d", c)))
    }
}

/// Transition edge for test-load refinements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Rising,
    Falling,
}

/// Partial override of the base test-load triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestLoadVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rref: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cref: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vref: Option<f64>,
}

/// Fully resolved test load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestLoadTriple {
    pub rref: f64,
    pub cref: f64,
    pub vref: f64,
}

/// Reference load used to normalize timing measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestLoad {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rref: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cref: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vref: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmeas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rising: Option<TestLoadVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub falling: Option<TestLoadVariant>,
}

impl TestLoad {
    pub fn new(rref: f64, cref: f64, vref: f64) -> Self {
        Self {
            rref: Some(rref),
            cref: Some(cref),
            vref: Some(vref),
            ..Self::default()
        }
    }

    /// Names of the base fields that are not set
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [("rref", self.rref), ("cref", self.cref), ("vref", self.vref)]
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.rref.is_some() && self.cref.is_some() && self.vref.is_some()
    }

    /// Base triple with the edge-specific refinement layered on top
    pub fn effective(&self, edge: Edge) -> Option<TestLoadTriple> {
        let variant = match edge {
            Edge::Rising => self.rising,
            Edge::Falling => self.falling,
        }
        .unwrap_or_default();

        Some(TestLoadTriple {
            rref: variant.rref.or(self.rref)?,
            cref: variant.cref.or(self.cref)?,
            vref: variant.vref.or(self.vref)?,
        })
    }
}

/// One buffer model as handed over by the extraction stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Model name
    #[serde(default)]
    pub name: String,

    /// Declared type tag, assigned upstream and only read here
    pub model_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vinl: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vinh: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_thresholds: Option<ReceiverThresholds>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pullup: Option<IvTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulldown: Option<IvTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnd_clamp: Option<IvTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_clamp: Option<IvTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp: Option<Ramp>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rising_waveforms: Vec<WaveformTable>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub falling_waveforms: Vec<WaveformTable>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series_elements: Vec<SeriesElement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_model: Option<ExternalModelRef>,

    #[serde(default)]
    pub test_load: TestLoad,
}

impl ModelRecord {
    /// Create an empty record of the given type
    pub fn new(name: impl Into<String>, model_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_type: model_type.into(),
            ..Self::default()
        }
    }

    pub fn with_thresholds(mut self, vinl: Option<f64>, vinh: Option<f64>) -> Self {
        self.vinl = vinl;
        self.vinh = vinh;
        self
    }

    pub fn with_pullup(mut self, table: IvTable) -> Self {
        self.pullup = Some(table);
        self
    }

    pub fn with_pulldown(mut self, table: IvTable) -> Self {
        self.pulldown = Some(table);
        self
    }

    pub fn with_series_element(mut self, element: SeriesElement) -> Self {
        self.series_elements.push(element);
        self
    }

    pub fn with_external_model(mut self, external: ExternalModelRef) -> Self {
        self.external_model = Some(external);
        self
    }

    pub fn with_test_load(mut self, test_load: TestLoad) -> Self {
        self.test_load = test_load;
        self
    }

    /// Check whether a section carries data
    pub fn is_populated(&self, section: SectionKind) -> bool {
        match section {
            SectionKind::Thresholds => self.vinl.is_some() || self.vinh.is_some(),
            SectionKind::ReceiverThresholds => self.receiver_thresholds.is_some(),
            SectionKind::Pullup => self.pullup.is_some(),
            SectionKind::Pulldown => self.pulldown.is_some(),
            SectionKind::GndClamp => self.gnd_clamp.is_some(),
            SectionKind::PowerClamp => self.power_clamp.is_some(),
            SectionKind::Ramp => self.ramp.is_some(),
            SectionKind::RisingWaveform => !self.rising_waveforms.is_empty(),
            SectionKind::FallingWaveform => !self.falling_waveforms.is_empty(),
            SectionKind::SeriesElements => !self.series_elements.is_empty(),
            SectionKind::ExternalModel => self.external_model.is_some(),
        }
    }

    /// Populated sections, in [`SectionKind::ALL`] order
    pub fn populated_sections(&self) -> Vec<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .filter(|s| self.is_populated(*s))
            .collect()
    }

    /// Pull table slot for a section (`None` for non-pull sections)
    pub fn pull_table_mut(&mut self, section: SectionKind) -> Option<&mut Option<IvTable>> {
        match section {
            SectionKind::Pullup => Some(&mut self.pullup),
            SectionKind::Pulldown => Some(&mut self.pulldown),
            _ => None,
        }
    }

    pub fn pull_table(&self, section: SectionKind) -> Option<&IvTable> {
        match section {
            SectionKind::Pullup => self.pullup.as_ref(),
            SectionKind::Pulldown => self.pulldown.as_ref(),
            _ => None,
        }
    }

    /// All I-V tables with their field names
    pub fn iv_tables_mut(&mut self) -> [(&'static str, Option<&mut IvTable>); 4] {
        [
            ("pullup", self.pullup.as_mut()),
            ("pulldown", self.pulldown.as_mut()),
            ("gnd_clamp", self.gnd_clamp.as_mut()),
            ("power_clamp", self.power_clamp.as_mut()),
        ]
    }

    pub fn iv_tables(&self) -> [(&'static str, Option<&IvTable>); 4] {
        [
            ("pullup", self.pullup.as_ref()),
            ("pulldown", self.pulldown.as_ref()),
            ("gnd_clamp", self.gnd_clamp.as_ref()),
            ("power_clamp", self.power_clamp.as_ref()),
        ]
    }

    /// All waveform tables with an indexed field name
    pub fn waveforms(&self) -> impl Iterator<Item = (String, &WaveformTable)> {
        let rising = self
            .rising_waveforms
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("rising_waveforms[{}]", i), w));
        let falling = self
            .falling_waveforms
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("falling_waveforms[{}]", i), w));
        rising.chain(falling)
    }
}
