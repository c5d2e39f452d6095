//! In-memory control surface
//!
//! [`FakeCard`] and [`FakeBackend`] implement the control-surface traits
//! without hardware, with enough introspection (write counters, raw state
//! pokes) to assert on exactly what a routing operation touched. The test
//! suites across the workspace are built on this module.

use crate::domain::control::{
    CardBackend, CardInfo, ControlError, ControlHandle, ControlSet, EnumState, Result, VolumeUnit,
};
use crate::domain::model::{DeviceModel, OFF};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
struct FakeControlState {
    enum_current: Option<usize>,
    enum_choices: Vec<String>,
    volume: Option<i64>,
    enum_writes: u32,
    volume_writes: u32,
}

type Store = Rc<RefCell<BTreeMap<String, FakeControlState>>>;

/// One fake card: a mutable bag of named controls
#[derive(Debug, Clone, Default)]
pub struct FakeCard {
    store: Store,
}

impl FakeCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a surface that exactly matches a model declaration: every sink
    /// exposes the expected choice set (selecting "Off"), every pinned
    /// control and mix slot exists.
    pub fn from_model(model: &DeviceModel) -> Self {
        let card = Self::new();
        let choice_order = model.sink_choice_order();
        let choices: Vec<&str> = choice_order.iter().map(String::as_str).collect();

        for sink in model.physical_outputs().iter().chain(model.mixer_inputs()) {
            card.add_enum(sink, &choices, OFF);
        }
        for mix in model.mixes() {
            for slot in &mix.slots {
                card.add_volume(slot, 0);
            }
        }
        for (name, value) in model.force_enum_values() {
            if !card.contains(name) {
                if value == OFF {
                    card.add_enum(name, &[OFF], OFF);
                } else {
                    card.add_enum(name, &[value.as_str(), OFF], OFF);
                }
            }
        }
        for (name, _) in model.force_volumes() {
            if !card.contains(name) {
                card.add_volume(name, 0);
            }
        }
        for name in model.global_settings() {
            if !card.contains(name) {
                card.add_enum(name, &["Internal", "S/PDIF", "ADAT"], "Internal");
            }
        }
        card
    }

    pub fn add_enum(&self, name: &str, choices: &[&str], current: &str) {
        let idx = choices
            .iter()
            .position(|c| *c == current)
            .expect("current choice must be offered");
        self.store.borrow_mut().insert(
            name.to_string(),
            FakeControlState {
                enum_current: Some(idx),
                enum_choices: choices.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            },
        );
    }

    pub fn add_volume(&self, name: &str, percent: i64) {
        self.store.borrow_mut().insert(
            name.to_string(),
            FakeControlState {
                volume: Some(percent),
                ..Default::default()
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.borrow().contains_key(name)
    }

    pub fn remove(&self, name: &str) {
        self.store.borrow_mut().remove(name);
    }

    pub fn add_choice(&self, name: &str, choice: &str) {
        let mut store = self.store.borrow_mut();
        let state = store.get_mut(name).expect("control exists");
        state.enum_choices.push(choice.to_string());
    }

    pub fn remove_choice(&self, name: &str, choice: &str) {
        let mut store = self.store.borrow_mut();
        let state = store.get_mut(name).expect("control exists");
        let idx = state
            .enum_choices
            .iter()
            .position(|c| c == choice)
            .expect("choice exists");
        state.enum_choices.remove(idx);
        if state.enum_current == Some(idx) {
            state.enum_current = Some(0);
        }
    }

    /// Currently selected enum choice, read without going through a handle
    pub fn current_enum(&self, name: &str) -> String {
        let store = self.store.borrow();
        let state = store.get(name).expect("control exists");
        let idx = state.enum_current.expect("control is an enum");
        state.enum_choices[idx].clone()
    }

    /// Overwrite the selected choice directly, simulating a change made
    /// outside this process
    pub fn set_current_enum(&self, name: &str, value: &str) {
        let mut store = self.store.borrow_mut();
        let state = store.get_mut(name).expect("control exists");
        let idx = state
            .enum_choices
            .iter()
            .position(|c| c == value)
            .expect("value must be offered");
        state.enum_current = Some(idx);
    }

    pub fn volume(&self, name: &str) -> i64 {
        let store = self.store.borrow();
        store.get(name).expect("control exists").volume.expect("control has volume")
    }

    /// Number of enum writes performed through handles on this control
    pub fn enum_write_count(&self, name: &str) -> u32 {
        self.store.borrow().get(name).expect("control exists").enum_writes
    }

    pub fn volume_write_count(&self, name: &str) -> u32 {
        self.store.borrow().get(name).expect("control exists").volume_writes
    }

    /// Open a fresh set of handles over this card's current controls
    pub fn control_set(&self) -> ControlSet {
        let mut set = ControlSet::new();
        for name in self.store.borrow().keys() {
            set.insert(Box::new(FakeControl {
                name: name.clone(),
                store: Rc::clone(&self.store),
            }));
        }
        set
    }
}

/// Handle over one control in a [`FakeCard`]
pub struct FakeControl {
    name: String,
    store: Store,
}

impl FakeControl {
    fn with_state<T>(&self, f: impl FnOnce(&mut FakeControlState) -> Result<T>) -> Result<T> {
        let mut store = self.store.borrow_mut();
        let state = store.get_mut(&self.name).ok_or_else(|| ControlError::HardwareIo {
            control: self.name.clone(),
            message: "control vanished from the surface".to_string(),
        })?;
        f(state)
    }
}

impl ControlHandle for FakeControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enum_capable(&self) -> bool {
        self.store
            .borrow()
            .get(&self.name)
            .is_some_and(|s| s.enum_current.is_some())
    }

    fn is_volume_capable(&self) -> bool {
        self.store
            .borrow()
            .get(&self.name)
            .is_some_and(|s| s.volume.is_some())
    }

    fn read_enum(&self) -> Result<EnumState> {
        self.with_state(|state| {
            let idx = state
                .enum_current
                .ok_or_else(|| ControlError::NotEnumCapable(self.name.clone()))?;
            Ok(EnumState {
                current: state.enum_choices[idx].clone(),
                choices: state.enum_choices.clone(),
            })
        })
    }

    fn write_enum(&self, value: &str) -> Result<()> {
        self.with_state(|state| {
            if state.enum_current.is_none() {
                return Err(ControlError::NotEnumCapable(self.name.clone()));
            }
            let idx = state
                .enum_choices
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| ControlError::HardwareIo {
                    control: self.name.clone(),
                    message: format!("enum value '{value}' not offered"),
                })?;
            state.enum_current = Some(idx);
            state.enum_writes += 1;
            Ok(())
        })
    }

    fn read_volume(&self, unit: VolumeUnit) -> Result<i64> {
        self.with_state(|state| {
            let percent = state
                .volume
                .ok_or_else(|| ControlError::NotVolumeCapable(self.name.clone()))?;
            Ok(match unit {
                // The fake's raw range is 0..=100, so raw and percent agree
                VolumeUnit::Raw | VolumeUnit::Percent => percent,
                VolumeUnit::Decibel => -6000 + percent * 60,
            })
        })
    }

    fn write_volume(&self, level: i64, unit: VolumeUnit) -> Result<()> {
        self.with_state(|state| {
            if state.volume.is_none() {
                return Err(ControlError::NotVolumeCapable(self.name.clone()));
            }
            let percent = match unit {
                VolumeUnit::Raw | VolumeUnit::Percent => level,
                VolumeUnit::Decibel => (level + 6000) / 60,
            };
            state.volume = Some(percent);
            state.volume_writes += 1;
            Ok(())
        })
    }
}

/// Backend over a list of fake cards, for discovery tests
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    cards: Vec<(CardInfo, FakeCard)>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card; its index is its position in registration order
    pub fn add_card(&mut self, name: &str, longname: &str, card: FakeCard) -> i32 {
        let index = self.cards.len() as i32;
        self.cards.push((
            CardInfo {
                index,
                name: name.to_string(),
                longname: longname.to_string(),
            },
            card,
        ));
        index
    }
}

impl CardBackend for FakeBackend {
    fn list_cards(&self) -> Result<Vec<CardInfo>> {
        Ok(self.cards.iter().map(|(info, _)| info.clone()).collect())
    }

    fn open_controls(&self, index: i32) -> Result<ControlSet> {
        self.cards
            .iter()
            .find(|(info, _)| info.index == index)
            .map(|(_, card)| card.control_set())
            .ok_or_else(|| ControlError::Card(format!("no card with index {index}")))
    }
}
