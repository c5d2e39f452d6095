//! Raw capability probe for authoring device models
//!
//! Enumerates every simple mixer element of one card and records its
//! capabilities: switches, volumes, enum choices, and volume ranges. The
//! `describe` subcommand serializes this to a sorted JSON document which is
//! the raw material for writing a new model declaration.

use alsa::mixer::{Mixer, Selem};
use redroute_core::domain::control::{ControlError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Capabilities of one mixer element
#[derive(Debug, Default, Serialize)]
pub struct ControlDump {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub switch_caps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_caps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_choices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_volume_range: Option<(i64, i64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_volume_range: Option<(i64, i64)>,
}

/// A range of 0..=0 means "no volume here"; suppress it
fn usable_range(range: (i64, i64)) -> Option<(i64, i64)> {
    if range == (0, 0) {
        None
    } else {
        Some(range)
    }
}

fn dump_selem(name: &str, selem: &Selem<'_>) -> ControlDump {
    let mut dump = ControlDump::default();

    if selem.has_playback_switch() {
        dump.switch_caps.push("playback".to_string());
    }
    if selem.has_capture_switch() {
        dump.switch_caps.push("capture".to_string());
    }
    if selem.has_playback_volume() {
        dump.volume_caps.push("playback".to_string());
        dump.playback_volume_range = usable_range(selem.get_playback_volume_range());
    }
    if selem.has_capture_volume() {
        dump.volume_caps.push("capture".to_string());
        dump.capture_volume_range = usable_range(selem.get_capture_volume_range());
    }

    if selem.is_enumerated() {
        match read_choices(selem) {
            Ok(choices) => dump.enum_choices = Some(choices),
            Err(err) => warn!("cannot read enum choices of '{}': {}", name, err),
        }
    }

    dump
}

fn read_choices(selem: &Selem<'_>) -> std::result::Result<Vec<String>, alsa::Error> {
    let count = selem.get_enum_items()?;
    let mut choices = Vec::with_capacity(count as usize);
    for idx in 0..count {
        choices.push(selem.get_enum_item_name(idx)?);
    }
    Ok(choices)
}

/// Probe every control of the card at `index`, sorted by control name
pub fn probe_card(index: i32) -> Result<BTreeMap<String, ControlDump>> {
    let mixer = Mixer::new(&format!("hw:{index}"), false)
        .map_err(|e| ControlError::Card(e.to_string()))?;
    let mut dumps = BTreeMap::new();
    for selem in mixer.iter().filter_map(Selem::new) {
        let id = selem.get_id();
        let name = id
            .get_name()
            .map_err(|e| ControlError::Card(e.to_string()))?
            .to_string();
        dumps.insert(name.clone(), dump_selem(&name, &selem));
    }
    Ok(dumps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_range_is_suppressed() {
        assert_eq!(usable_range((0, 0)), None);
        assert_eq!(usable_range((0, 255)), Some((0, 255)));
        assert_eq!(usable_range((-120, 0)), Some((-120, 0)));
    }

    #[test]
    fn test_empty_dump_serializes_compactly() {
        let dump = ControlDump::default();
        assert_eq!(serde_json::to_string(&dump).unwrap(), "{}");
    }
}
