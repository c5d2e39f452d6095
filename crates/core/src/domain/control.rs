//! Hardware control-surface abstractions
//!
//! This module defines the platform-agnostic view of a sound card's mixer
//! control surface: a set of named control elements that can be read and
//! written one at a time. The ALSA implementation lives in the `infra` crate;
//! tests run against the in-memory surface in [`crate::domain::testkit`].

use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors raised at the control-surface boundary
#[derive(Debug, Error)]
pub enum ControlError {
    /// A control name was looked up but the surface does not expose it
    #[error("Control not found: {0}")]
    ControlNotFound(String),

    /// The underlying transport rejected a read or write.
    ///
    /// Always propagated: acting on a stale assumption about hardware state
    /// could corrupt the routing configuration.
    #[error("Hardware I/O error on control '{control}': {message}")]
    HardwareIo { control: String, message: String },

    /// An enum operation was attempted on a control without enum capability
    #[error("Control '{0}' has no enumerated value")]
    NotEnumCapable(String),

    /// A volume operation was attempted on a control without volume capability
    #[error("Control '{0}' has no volume")]
    NotVolumeCapable(String),

    /// Card-level enumeration or open failure
    #[error("Card error: {0}")]
    Card(String),
}

/// Unit in which a volume level is expressed over the control boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeUnit {
    /// Driver-native integer steps
    Raw,
    /// 0..=100, mapped linearly onto the control's raw range
    Percent,
    /// Millibels (hundredths of a decibel)
    Decibel,
}

/// Snapshot of an enum control: the selected choice and the full ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumState {
    pub current: String,
    pub choices: Vec<String>,
}

impl EnumState {
    pub fn offers(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c == choice)
    }
}

/// One named mixer control element.
///
/// A handle declares which capabilities it supports; callers branch on the
/// capability flags rather than attempting an operation and catching the
/// failure. Reads and writes are blocking round trips to the driver.
pub trait ControlHandle {
    fn name(&self) -> &str;

    fn is_enum_capable(&self) -> bool;
    fn is_volume_capable(&self) -> bool;

    /// Read the selected choice and the ordered choice list
    fn read_enum(&self) -> Result<EnumState>;

    /// Select a choice by name. The value must be one of the control's
    /// current choices; index resolution happens behind this call.
    fn write_enum(&self, value: &str) -> Result<()>;

    fn read_volume(&self, unit: VolumeUnit) -> Result<i64>;
    fn write_volume(&self, level: i64, unit: VolumeUnit) -> Result<()>;
}

impl std::fmt::Debug for dyn ControlHandle + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("name", &self.name())
            .finish()
    }
}

/// The named controls of one opened card, keyed by control name.
///
/// Missing-key access is a typed [`ControlError::ControlNotFound`], never an
/// implicit panic.
#[derive(Default)]
pub struct ControlSet {
    controls: BTreeMap<String, Box<dyn ControlHandle>>,
}

impl ControlSet {
    pub fn new() -> Self {
        Self {
            controls: BTreeMap::new(),
        }
    }

    /// Add a handle, keyed by its own name
    pub fn insert(&mut self, handle: Box<dyn ControlHandle>) {
        self.controls.insert(handle.name().to_string(), handle);
    }

    pub fn get(&self, name: &str) -> Result<&dyn ControlHandle> {
        self.controls
            .get(name)
            .map(|h| h.as_ref())
            .ok_or_else(|| ControlError::ControlNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controls.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl std::fmt::Debug for ControlSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSet")
            .field("controls", &self.controls.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Identity of one sound card as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub index: i32,
    pub name: String,
    pub longname: String,
}

/// Trait for enumerating cards and opening their control surfaces
pub trait CardBackend {
    /// List all cards visible to the control plane
    fn list_cards(&self) -> Result<Vec<CardInfo>>;

    /// Open every named control of one card
    fn open_controls(&self, index: i32) -> Result<ControlSet>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testkit::FakeCard;

    #[test]
    fn test_missing_control_is_typed_error() {
        let card = FakeCard::new();
        card.add_enum("Analogue Output 01", &["Off", "PCM 1"], "Off");
        let controls = card.control_set();

        assert!(controls.get("Analogue Output 01").is_ok());
        match controls.get("No Such Control") {
            Err(ControlError::ControlNotFound(name)) => assert_eq!(name, "No Such Control"),
            other => panic!("expected ControlNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_control_set_names_are_sorted() {
        let card = FakeCard::new();
        card.add_volume("Zoo", 10);
        card.add_volume("Aardvark", 20);
        let controls = card.control_set();

        let names: Vec<&str> = controls.names().collect();
        assert_eq!(names, vec!["Aardvark", "Zoo"]);
        assert_eq!(controls.len(), 2);
    }

    #[test]
    fn test_enum_state_offers() {
        let state = EnumState {
            current: "Off".to_string(),
            choices: vec!["Off".to_string(), "PCM 1".to_string()],
        };
        assert!(state.offers("PCM 1"));
        assert!(!state.offers("PCM 2"));
    }
}
