//! Declarative device topology models
//!
//! A [`DeviceModel`] is an immutable description of one hardware model's
//! routing topology: physical inputs and outputs, PCM playback channels,
//! internal mix buses, stereo links, and controls pinned to fixed values.
//! Supporting a new interface means authoring a new declaration (see the
//! `scarlett` submodule); the rest of the crate contains no per-model
//! branching.
//!
//! Declaration invariants are enforced when the model is constructed, so a
//! malformed declaration fails fast instead of surfacing as a confusing
//! runtime condition later.

use crate::domain::control::ControlSet;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;

mod scarlett;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Choice label shown when a sink is not fed by anything
pub const OFF: &str = "Off";

/// Separator used in synthesized stereo choice labels ("PCM 1 + PCM 2")
pub const STEREO_SEPARATOR: &str = " + ";

/// Inconsistencies inside a device model declaration.
///
/// These are authoring errors, not hardware conditions, and are never
/// tolerated at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Model '{model}': {message}")]
    InvalidDeclaration { model: String, message: String },

    #[error("Mix '{mix}' has {slots} slots but the model declares {mixer_inputs} mixer inputs")]
    MixSlotMismatch {
        mix: String,
        slots: usize,
        mixer_inputs: usize,
    },

    #[error("Stereo label '{0}' does not split into one or two parts")]
    MalformedStereoLabel(String),
}

/// One internal mix bus: a name plus one volume control per mixer-input slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixDef {
    pub name: String,
    pub slots: Vec<String>,
}

/// A left/right pairing of two mono choices or two mono sink controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoPair {
    pub left: String,
    pub right: String,
}

impl StereoPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// The synthesized label for this pair
    pub fn label(&self) -> String {
        format!("{}{}{}", self.left, STEREO_SEPARATOR, self.right)
    }
}

/// All fields of a device model declaration, by name.
///
/// This is the authoring surface; [`DeviceModel::new`] consumes it and
/// enforces the declaration invariants.
#[derive(Debug, Clone, Default)]
pub struct ModelSpec {
    pub canonical_name: String,
    pub name: String,
    pub physical_inputs: Vec<String>,
    pub physical_outputs: Vec<String>,
    pub pcm_outputs: Vec<String>,
    pub mixes: Vec<MixDef>,
    pub mixer_inputs: Vec<String>,
    pub force_enum_values: Vec<(String, String)>,
    pub force_volumes: Vec<(String, i64)>,
    pub global_settings: Vec<String>,
    pub stereo_sources: Vec<StereoPair>,
    pub stereo_sinks: Vec<StereoPair>,
}

/// Immutable topology description of one supported hardware model
#[derive(Debug, Clone)]
pub struct DeviceModel {
    spec: ModelSpec,
}

impl DeviceModel {
    /// Build a model from its declaration, failing fast on any inconsistency.
    pub fn new(spec: ModelSpec) -> Result<Self> {
        let invalid = |message: String| ModelError::InvalidDeclaration {
            model: if spec.canonical_name.is_empty() {
                spec.name.clone()
            } else {
                spec.canonical_name.clone()
            },
            message,
        };

        if spec.canonical_name.is_empty() {
            return Err(invalid("canonical name must not be empty".to_string()));
        }
        if spec.name.is_empty() {
            return Err(invalid("card name must not be empty".to_string()));
        }

        let all_names = spec
            .physical_inputs
            .iter()
            .chain(&spec.physical_outputs)
            .chain(&spec.pcm_outputs)
            .chain(&spec.mixer_inputs)
            .chain(&spec.global_settings)
            .chain(spec.mixes.iter().map(|m| &m.name))
            .chain(spec.mixes.iter().flat_map(|m| &m.slots))
            .chain(spec.force_enum_values.iter().map(|(n, _)| n))
            .chain(spec.force_volumes.iter().map(|(n, _)| n));
        for name in all_names {
            if name.is_empty() {
                return Err(invalid("empty control name in declaration".to_string()));
            }
        }

        // Choice names are split on the stereo separator when writing a
        // synthesized stereo selection, so no mono choice may contain it.
        let choice_names = spec
            .physical_inputs
            .iter()
            .chain(&spec.pcm_outputs)
            .chain(spec.mixes.iter().map(|m| &m.name));
        for name in choice_names {
            if name.contains(STEREO_SEPARATOR) {
                return Err(invalid(format!(
                    "choice name '{name}' contains the stereo separator '{STEREO_SEPARATOR}'"
                )));
            }
        }

        let mut mix_names = BTreeSet::new();
        for mix in &spec.mixes {
            if !mix_names.insert(mix.name.as_str()) {
                return Err(invalid(format!("duplicate mix name '{}'", mix.name)));
            }
            if mix.slots.len() != spec.mixer_inputs.len() {
                return Err(ModelError::MixSlotMismatch {
                    mix: mix.name.clone(),
                    slots: mix.slots.len(),
                    mixer_inputs: spec.mixer_inputs.len(),
                });
            }
        }

        let sink_choices: BTreeSet<&str> = spec
            .physical_inputs
            .iter()
            .chain(&spec.pcm_outputs)
            .map(String::as_str)
            .chain(spec.mixes.iter().map(|m| m.name.as_str()))
            .collect();
        let mut seen_source_members = BTreeSet::new();
        for pair in &spec.stereo_sources {
            if pair.left == pair.right {
                return Err(invalid(format!(
                    "stereo source pair '{}' links a choice to itself",
                    pair.label()
                )));
            }
            for member in [&pair.left, &pair.right] {
                if !sink_choices.contains(member.as_str()) {
                    return Err(invalid(format!(
                        "stereo source '{member}' is not a declared input, mix, or PCM output"
                    )));
                }
                if !seen_source_members.insert(member.as_str()) {
                    return Err(invalid(format!(
                        "source '{member}' appears in more than one stereo pair"
                    )));
                }
            }
        }

        let mut seen_sink_members = BTreeSet::new();
        for pair in &spec.stereo_sinks {
            if pair.left == pair.right {
                return Err(invalid(format!(
                    "stereo sink pair '{}' links an output to itself",
                    pair.label()
                )));
            }
            for member in [&pair.left, &pair.right] {
                if !spec.physical_outputs.iter().any(|o| o == member) {
                    return Err(invalid(format!(
                        "stereo sink '{member}' is not a declared physical output"
                    )));
                }
                if !seen_sink_members.insert(member.as_str()) {
                    return Err(invalid(format!(
                        "output '{member}' appears in more than one stereo pair"
                    )));
                }
            }
        }

        Ok(Self { spec })
    }

    pub fn canonical_name(&self) -> &str {
        &self.spec.canonical_name
    }

    /// Card name as reported by the driver; used for discovery matching
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn physical_inputs(&self) -> &[String] {
        &self.spec.physical_inputs
    }

    pub fn physical_outputs(&self) -> &[String] {
        &self.spec.physical_outputs
    }

    pub fn pcm_outputs(&self) -> &[String] {
        &self.spec.pcm_outputs
    }

    pub fn mixes(&self) -> &[MixDef] {
        &self.spec.mixes
    }

    pub fn mixer_inputs(&self) -> &[String] {
        &self.spec.mixer_inputs
    }

    pub fn force_enum_values(&self) -> &[(String, String)] {
        &self.spec.force_enum_values
    }

    pub fn force_volumes(&self) -> &[(String, i64)] {
        &self.spec.force_volumes
    }

    pub fn global_settings(&self) -> &[String] {
        &self.spec.global_settings
    }

    pub fn stereo_sources(&self) -> &[StereoPair] {
        &self.spec.stereo_sources
    }

    pub fn stereo_sinks(&self) -> &[StereoPair] {
        &self.spec.stereo_sinks
    }

    /// The exact choice set every sink control must expose:
    /// `{"Off"} ∪ physical inputs ∪ mix names ∪ PCM outputs`.
    pub fn expected_sink_choices(&self) -> BTreeSet<String> {
        std::iter::once(OFF.to_string())
            .chain(self.spec.physical_inputs.iter().cloned())
            .chain(self.spec.mixes.iter().map(|m| m.name.clone()))
            .chain(self.spec.pcm_outputs.iter().cloned())
            .collect()
    }

    /// The ordered mono choice list implied by the declaration
    pub fn sink_choice_order(&self) -> Vec<String> {
        let mut order = vec![OFF.to_string()];
        order.extend(self.spec.physical_inputs.iter().cloned());
        order.extend(self.spec.mixes.iter().map(|m| m.name.clone()));
        order.extend(self.spec.pcm_outputs.iter().cloned());
        order
    }

    /// Check a live control surface against this declaration.
    ///
    /// Returns false (with diagnostic logging) on any mismatch; an absent or
    /// wrong card is an expected scan outcome, not a program error. Sinks are
    /// every physical output and every mixer-bus input selector; each must be
    /// present and expose exactly the expected choice set. Pinned controls
    /// only need to exist.
    pub fn validate(&self, controls: &ControlSet) -> bool {
        let expected = self.expected_sink_choices();

        for sink in self
            .spec
            .physical_outputs
            .iter()
            .chain(&self.spec.mixer_inputs)
        {
            let handle = match controls.get(sink) {
                Ok(handle) => handle,
                Err(_) => {
                    info!(model = %self.spec.canonical_name, "missing mixer control '{sink}'");
                    return false;
                }
            };
            let state = match handle.read_enum() {
                Ok(state) => state,
                Err(err) => {
                    info!(
                        model = %self.spec.canonical_name,
                        "cannot read source selections of '{sink}': {err}"
                    );
                    return false;
                }
            };
            let got: BTreeSet<String> = state.choices.iter().cloned().collect();
            if got != expected {
                info!(
                    model = %self.spec.canonical_name,
                    "source selections for '{sink}' do not match the model"
                );
                info!("Expected: {}", join_sorted(&expected));
                info!("Got: {}", join_sorted(&got));
                return false;
            }
        }

        for name in self
            .spec
            .force_enum_values
            .iter()
            .map(|(n, _)| n)
            .chain(self.spec.force_volumes.iter().map(|(n, _)| n))
        {
            if !controls.contains(name) {
                info!(model = %self.spec.canonical_name, "missing fixed-value control '{name}'");
                return false;
            }
        }

        true
    }
}

fn join_sorted(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// All supported device models.
///
/// Declarations are compiled in and covered by tests, so a failure to
/// construct one is a defect in this crate.
pub fn models() -> Vec<DeviceModel> {
    vec![scarlett::scarlett_18i20_gen2()]
}

/// Look up a model by its canonical name
pub fn find_model(canonical_name: &str) -> Option<DeviceModel> {
    models()
        .into_iter()
        .find(|m| m.canonical_name() == canonical_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testkit::FakeCard;

    fn small_spec() -> ModelSpec {
        ModelSpec {
            canonical_name: "test2i2".to_string(),
            name: "Test 2i2 USB".to_string(),
            physical_inputs: vec!["Analogue 1".to_string(), "Analogue 2".to_string()],
            physical_outputs: vec!["Out 1".to_string(), "Out 2".to_string()],
            pcm_outputs: vec!["PCM 1".to_string(), "PCM 2".to_string()],
            mixes: vec![MixDef {
                name: "Mix A".to_string(),
                slots: vec!["Mix A Input 01".to_string(), "Mix A Input 02".to_string()],
            }],
            mixer_inputs: vec!["Mixer Input 01".to_string(), "Mixer Input 02".to_string()],
            force_enum_values: vec![],
            force_volumes: vec![],
            global_settings: vec![],
            stereo_sources: vec![],
            stereo_sinks: vec![],
        }
    }

    #[test]
    fn test_expected_sink_choices() {
        let model = DeviceModel::new(small_spec()).unwrap();
        let expected: BTreeSet<String> = ["Off", "Analogue 1", "Analogue 2", "Mix A", "PCM 1", "PCM 2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(model.expected_sink_choices(), expected);
    }

    #[test]
    fn test_mix_slot_count_mismatch_fails_construction() {
        let mut spec = small_spec();
        spec.mixes[0].slots.pop();
        match DeviceModel::new(spec) {
            Err(ModelError::MixSlotMismatch {
                mix,
                slots,
                mixer_inputs,
            }) => {
                assert_eq!(mix, "Mix A");
                assert_eq!(slots, 1);
                assert_eq!(mixer_inputs, 2);
            }
            other => panic!("expected MixSlotMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_choice_name_with_separator_rejected() {
        let mut spec = small_spec();
        spec.physical_inputs[0] = "Bad + Name".to_string();
        assert!(DeviceModel::new(spec).is_err());
    }

    #[test]
    fn test_stereo_sink_must_be_declared_output() {
        let mut spec = small_spec();
        spec.stereo_sinks = vec![StereoPair::new("Out 1", "Out 3")];
        assert!(DeviceModel::new(spec).is_err());
    }

    #[test]
    fn test_stereo_source_must_be_valid_choice() {
        let mut spec = small_spec();
        spec.stereo_sources = vec![StereoPair::new("PCM 1", "PCM 9")];
        assert!(DeviceModel::new(spec).is_err());
    }

    #[test]
    fn test_validate_accepts_exactly_matching_surface() {
        let model = DeviceModel::new(small_spec()).unwrap();
        let card = FakeCard::from_model(&model);
        assert!(model.validate(&card.control_set()));
    }

    #[test]
    fn test_validate_rejects_missing_control() {
        let model = DeviceModel::new(small_spec()).unwrap();
        let card = FakeCard::from_model(&model);
        card.remove("Mixer Input 02");
        assert!(!model.validate(&card.control_set()));
    }

    #[test]
    fn test_validate_rejects_extra_choice() {
        let model = DeviceModel::new(small_spec()).unwrap();
        let card = FakeCard::from_model(&model);
        card.add_choice("Out 2", "Phantom Source");
        assert!(!model.validate(&card.control_set()));
    }

    #[test]
    fn test_validate_rejects_removed_choice() {
        let model = DeviceModel::new(small_spec()).unwrap();
        let card = FakeCard::from_model(&model);
        card.remove_choice("Out 1", "PCM 2");
        assert!(!model.validate(&card.control_set()));
    }

    #[test]
    fn test_all_registry_models_construct() {
        let all = models();
        assert!(!all.is_empty());
        for model in &all {
            assert!(!model.canonical_name().is_empty());
            assert!(find_model(model.canonical_name()).is_some());
        }
    }
}
