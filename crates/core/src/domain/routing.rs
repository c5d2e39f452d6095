//! Routing engine
//!
//! A [`RoutingEngine`] binds a validated [`DeviceModel`] to the opened
//! control surface of one card and exposes the routing graph the model
//! declares: monitorable sources, physical outputs (stereo-linked pairs
//! collapsed into one synthesized output), mixer-bus input selectors, and
//! mixes. All state is read live from hardware on every query; nothing is
//! cached, since the device and other control applications can change it
//! behind our back.

use crate::domain::control::{ControlError, ControlSet, EnumState, VolumeUnit};
use crate::domain::model::{DeviceModel, ModelError, StereoPair, OFF, STEREO_SEPARATOR};
use thiserror::Error;
use tracing::{debug, error, info};

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the routing engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("Mix '{mix}' has no slot {slot}")]
    NoSuchSlot { mix: String, slot: usize },

    #[error("'{0}' is not a global setting of this model")]
    NotAGlobalSetting(String),
}

/// A signal that can feed a mixer-bus input: a physical input or a PCM
/// playback channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    name: String,
}

impl Source {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One mixer-bus input selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerInput {
    index: usize,
    control: String,
}

impl MixerInput {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.control
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputKind {
    Mono {
        control: String,
    },
    /// Two sink controls presented as one output. `choices` on the parent
    /// holds the synthesized composite list.
    Stereo {
        left: String,
        right: String,
    },
}

/// A physical output, possibly synthesized from a stereo-linked pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    name: String,
    kind: OutputKind,
    /// Composite choice list for stereo outputs; empty for mono outputs,
    /// whose choices are read live
    choices: Vec<String>,
}

impl Output {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stereo(&self) -> bool {
        matches!(self.kind, OutputKind::Stereo { .. })
    }
}

/// One slot of a mix: one volume control, or two for a stereo-collapsed mix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixSlot {
    controls: Vec<String>,
}

impl MixSlot {
    pub fn controls(&self) -> &[String] {
        &self.controls
    }
}

/// An internal mix bus, possibly synthesized from a stereo-linked pair of
/// mixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mix {
    name: String,
    slots: Vec<MixSlot>,
}

impl Mix {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[MixSlot] {
        &self.slots
    }
}

/// Live view over one card's routing matrix
pub struct RoutingEngine {
    model: DeviceModel,
    controls: ControlSet,
    sources: Vec<Source>,
    outputs: Vec<Output>,
    mixer_inputs: Vec<MixerInput>,
    mixes: Vec<Mix>,
}

impl RoutingEngine {
    /// Bind a model to the opened controls of a validated card.
    ///
    /// Builds sources, then outputs, then mixer inputs, then mixes, and
    /// applies the model's pinned values last so they cannot be clobbered by
    /// anything the earlier steps wrote.
    pub fn new(model: DeviceModel, controls: ControlSet) -> Result<Self> {
        let sources = build_sources(&model);
        let outputs = build_outputs(&model);
        let mixer_inputs = build_mixer_inputs(&model);
        let mixes = build_mixes(&model, &mixer_inputs)?;

        let engine = Self {
            model,
            controls,
            sources,
            outputs,
            mixer_inputs,
            mixes,
        };
        engine.apply_forced_values()?;
        info!(
            "routing engine up: {} sources, {} outputs, {} mixer inputs, {} mixes",
            engine.sources.len(),
            engine.outputs.len(),
            engine.mixer_inputs.len(),
            engine.mixes.len()
        );
        Ok(engine)
    }

    pub fn model(&self) -> &DeviceModel {
        &self.model
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn mixer_inputs(&self) -> &[MixerInput] {
        &self.mixer_inputs
    }

    pub fn mixes(&self) -> &[Mix] {
        &self.mixes
    }

    pub fn global_settings(&self) -> &[String] {
        self.model.global_settings()
    }

    /// Whether any mixer-bus input currently selects this source.
    ///
    /// Always computed from hardware; selector state can change outside this
    /// process.
    pub fn is_monitored(&self, source: &Source) -> Result<bool> {
        for input in &self.mixer_inputs {
            let state = self.controls.get(&input.control)?.read_enum()?;
            if state.current == source.name {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The source currently selected by a mixer-bus input
    pub fn mixer_input_source(&self, input: &MixerInput) -> Result<String> {
        Ok(self.controls.get(&input.control)?.read_enum()?.current)
    }

    /// Select the source feeding a mixer-bus input
    pub fn set_mixer_input(&self, input: &MixerInput, source: &str) -> Result<()> {
        self.set_enum_value(&input.control, source)
    }

    /// The choices an output offers: synthesized composites for a stereo
    /// output, the live hardware list for a mono one
    pub fn output_choices(&self, output: &Output) -> Result<Vec<String>> {
        match &output.kind {
            OutputKind::Mono { control } => {
                Ok(self.controls.get(control)?.read_enum()?.choices)
            }
            OutputKind::Stereo { .. } => Ok(output.choices.clone()),
        }
    }

    /// The output's current selection.
    ///
    /// For a stereo output the two underlying controls may disagree; the
    /// ambiguity is resolved here, writing the loser back to "Off" so the
    /// hardware state converges on what is reported. Resolution prefers, in
    /// order: an identical mono selection on both sides that is still a valid
    /// composite choice; the joint "L + R" label; whichever single side holds
    /// a valid choice (the other is forced to "Off"); and finally "Off" on
    /// both.
    pub fn output_selection(&self, output: &Output) -> Result<String> {
        match &output.kind {
            OutputKind::Mono { control } => {
                Ok(self.controls.get(control)?.read_enum()?.current)
            }
            OutputKind::Stereo { left, right } => {
                let l = self.controls.get(left)?.read_enum()?;
                let r = self.controls.get(right)?.read_enum()?;
                let offered = |c: &str| output.choices.iter().any(|x| x == c);

                if l.current == r.current && offered(&l.current) {
                    return Ok(l.current);
                }

                let joint = format!("{}{}{}", l.current, STEREO_SEPARATOR, r.current);
                if offered(&joint) {
                    return Ok(joint);
                }

                if offered(&l.current) {
                    debug!(
                        "'{}' selects '{}' but '{}' selects '{}'; turning '{}' off",
                        left, l.current, right, r.current, right
                    );
                    self.force_off(right, &r)?;
                    return Ok(l.current);
                }
                if offered(&r.current) {
                    debug!(
                        "'{}' selects '{}' but '{}' selects '{}'; turning '{}' off",
                        right, r.current, left, l.current, left
                    );
                    self.force_off(left, &l)?;
                    return Ok(r.current);
                }

                self.force_off(left, &l)?;
                self.force_off(right, &r)?;
                Ok(OFF.to_string())
            }
        }
    }

    /// Route a source (or composite choice) to an output.
    ///
    /// A composite "L + R" label writes its first part to the left control
    /// and its second to the right; a plain label is written to both sides.
    pub fn set_output_selection(&self, output: &Output, choice: &str) -> Result<()> {
        match &output.kind {
            OutputKind::Mono { control } => self.set_enum_value(control, choice),
            OutputKind::Stereo { left, right } => {
                let parts: Vec<&str> = choice.split(STEREO_SEPARATOR).collect();
                match parts[..] {
                    [mono] => {
                        self.set_enum_value(left, mono)?;
                        self.set_enum_value(right, mono)
                    }
                    [l, r] => {
                        self.set_enum_value(left, l)?;
                        self.set_enum_value(right, r)
                    }
                    _ => Err(ModelError::MalformedStereoLabel(choice.to_string()).into()),
                }
            }
        }
    }

    /// Level of one mix slot, in percent
    pub fn mix_level(&self, mix: &Mix, slot: usize) -> Result<i64> {
        let slot = mix.slots.get(slot).ok_or_else(|| EngineError::NoSuchSlot {
            mix: mix.name.clone(),
            slot,
        })?;
        Ok(self
            .controls
            .get(&slot.controls[0])?
            .read_volume(VolumeUnit::Percent)?)
    }

    /// Set one mix slot's level in percent, fanning out to both channels of a
    /// stereo-collapsed mix
    pub fn set_mix_level(&self, mix: &Mix, slot: usize, percent: i64) -> Result<()> {
        let slot = mix.slots.get(slot).ok_or_else(|| EngineError::NoSuchSlot {
            mix: mix.name.clone(),
            slot,
        })?;
        for control in &slot.controls {
            self.controls
                .get(control)?
                .write_volume(percent, VolumeUnit::Percent)?;
        }
        Ok(())
    }

    /// Read a global setting (e.g. clock source)
    pub fn setting(&self, name: &str) -> Result<EnumState> {
        if !self.model.global_settings().iter().any(|s| s == name) {
            return Err(EngineError::NotAGlobalSetting(name.to_string()));
        }
        Ok(self.controls.get(name)?.read_enum()?)
    }

    /// Change a global setting
    pub fn set_setting(&self, name: &str, value: &str) -> Result<()> {
        if !self.model.global_settings().iter().any(|s| s == name) {
            return Err(EngineError::NotAGlobalSetting(name.to_string()));
        }
        self.set_enum_value(name, value)
    }

    /// Select `target` on an enum control, by name.
    ///
    /// If the control does not currently offer `target` the hardware is left
    /// untouched and the mismatch is logged: a model/firmware skew discovered
    /// after validation must not take down the rest of the surface.
    fn set_enum_value(&self, control: &str, target: &str) -> Result<()> {
        let handle = self.controls.get(control)?;
        let state = handle.read_enum()?;
        if !state.offers(target) {
            error!(
                "cannot select '{}' on '{}'; valid choices: {}",
                target,
                control,
                state.choices.join(", ")
            );
            return Ok(());
        }
        handle.write_enum(target)?;
        Ok(())
    }

    /// Write "Off" to a sink unless it is already off
    fn force_off(&self, control: &str, state: &EnumState) -> Result<()> {
        if state.current != OFF {
            self.set_enum_value(control, OFF)?;
        }
        Ok(())
    }

    fn apply_forced_values(&self) -> Result<()> {
        for (control, value) in self.model.force_enum_values() {
            debug!("pinning '{}' to '{}'", control, value);
            self.set_enum_value(control, value)?;
        }
        for (control, level) in self.model.force_volumes() {
            debug!("pinning '{}' to {}%", control, level);
            self.controls
                .get(control)?
                .write_volume(*level, VolumeUnit::Percent)?;
        }
        Ok(())
    }
}

fn build_sources(model: &DeviceModel) -> Vec<Source> {
    model
        .physical_inputs()
        .iter()
        .chain(model.pcm_outputs())
        .map(|name| Source { name: name.clone() })
        .collect()
}

/// The mono sink choice list with every declared stereo-source pair replaced
/// by its synthesized "L + R" entry
fn composite_choices(model: &DeviceModel) -> Vec<String> {
    let mut choices = Vec::new();
    for choice in model.sink_choice_order() {
        if let Some(pair) = find_pair_left(model.stereo_sources(), &choice) {
            choices.push(pair.label());
        } else if find_pair_right(model.stereo_sources(), &choice).is_none() {
            choices.push(choice);
        }
        // right-hand members are absorbed into their pair's entry
    }
    choices
}

fn build_outputs(model: &DeviceModel) -> Vec<Output> {
    let composite = composite_choices(model);
    let mut outputs = Vec::new();
    for name in model.physical_outputs() {
        if let Some(pair) = find_pair_left(model.stereo_sinks(), name) {
            outputs.push(Output {
                name: pair.label(),
                kind: OutputKind::Stereo {
                    left: pair.left.clone(),
                    right: pair.right.clone(),
                },
                choices: composite.clone(),
            });
        } else if find_pair_right(model.stereo_sinks(), name).is_none() {
            outputs.push(Output {
                name: name.clone(),
                kind: OutputKind::Mono {
                    control: name.clone(),
                },
                choices: Vec::new(),
            });
        }
    }
    outputs
}

fn build_mixer_inputs(model: &DeviceModel) -> Vec<MixerInput> {
    model
        .mixer_inputs()
        .iter()
        .enumerate()
        .map(|(index, control)| MixerInput {
            index,
            control: control.clone(),
        })
        .collect()
}

fn build_mixes(model: &DeviceModel, mixer_inputs: &[MixerInput]) -> Result<Vec<Mix>> {
    let mut mixes = Vec::new();
    for def in model.mixes() {
        if def.slots.len() != mixer_inputs.len() {
            return Err(ModelError::MixSlotMismatch {
                mix: def.name.clone(),
                slots: def.slots.len(),
                mixer_inputs: mixer_inputs.len(),
            }
            .into());
        }
        if let Some(pair) = find_pair_left(model.stereo_sources(), &def.name) {
            // A stereo-linked pair of mixes becomes one mix whose slots carry
            // both sides' volume controls.
            let partner = model
                .mixes()
                .iter()
                .find(|m| m.name == pair.right)
                .ok_or_else(|| ModelError::InvalidDeclaration {
                    model: model.canonical_name().to_string(),
                    message: format!(
                        "stereo pair '{}' links mix '{}' to '{}', which is not a declared mix",
                        pair.label(),
                        pair.left,
                        pair.right
                    ),
                })?;
            mixes.push(Mix {
                name: pair.label(),
                slots: def
                    .slots
                    .iter()
                    .zip(&partner.slots)
                    .map(|(l, r)| MixSlot {
                        controls: vec![l.clone(), r.clone()],
                    })
                    .collect(),
            });
        } else if find_pair_right(model.stereo_sources(), &def.name).is_none() {
            mixes.push(Mix {
                name: def.name.clone(),
                slots: def
                    .slots
                    .iter()
                    .map(|control| MixSlot {
                        controls: vec![control.clone()],
                    })
                    .collect(),
            });
        }
    }
    Ok(mixes)
}

fn find_pair_left<'a>(pairs: &'a [StereoPair], name: &str) -> Option<&'a StereoPair> {
    pairs.iter().find(|p| p.left == name)
}

fn find_pair_right<'a>(pairs: &'a [StereoPair], name: &str) -> Option<&'a StereoPair> {
    pairs.iter().find(|p| p.right == name)
}
