//! ALSA implementation of [`CardBackend`] and [`ControlHandle`]
//!
//! Control handles hold a shared reference to the opened mixer and resolve
//! their simple element on every call. The whole surface is single-threaded
//! and every operation is a blocking round trip to the driver (a hung device
//! blocks the caller; there is no cancellation).

use alsa::mixer::{MilliBel, Mixer, Selem, SelemChannelId, SelemId};
use alsa::Round;
use redroute_core::domain::control::{
    CardBackend, CardInfo, ControlError, ControlHandle, ControlSet, EnumState, Result, VolumeUnit,
};
use std::rc::Rc;
use tracing::debug;

fn io_error(control: &str, err: alsa::Error) -> ControlError {
    ControlError::HardwareIo {
        control: control.to_string(),
        message: err.to_string(),
    }
}

fn card_error(err: alsa::Error) -> ControlError {
    ControlError::Card(err.to_string())
}

/// Card enumeration and control-surface opening over ALSA
#[derive(Debug, Default)]
pub struct AlsaBackend;

impl AlsaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CardBackend for AlsaBackend {
    fn list_cards(&self) -> Result<Vec<CardInfo>> {
        let mut cards = Vec::new();
        for card in alsa::card::Iter::new() {
            let card = card.map_err(card_error)?;
            cards.push(CardInfo {
                index: card.get_index(),
                name: card.get_name().map_err(card_error)?,
                longname: card.get_longname().map_err(card_error)?,
            });
        }
        Ok(cards)
    }

    fn open_controls(&self, index: i32) -> Result<ControlSet> {
        let mixer = Rc::new(Mixer::new(&format!("hw:{index}"), false).map_err(card_error)?);
        let mut set = ControlSet::new();
        for selem in mixer.iter().filter_map(Selem::new) {
            let id = selem.get_id();
            let name = match id.get_name() {
                Ok(name) => name.to_string(),
                Err(err) => return Err(card_error(err)),
            };
            let handle = AlsaControl {
                enum_capable: selem.is_enumerated(),
                playback_volume: selem.has_playback_volume(),
                capture_volume: selem.has_capture_volume(),
                id,
                name,
                mixer: Rc::clone(&mixer),
            };
            set.insert(Box::new(handle));
        }
        debug!("opened {} controls on hw:{}", set.len(), index);
        Ok(set)
    }
}

/// Handle over one simple mixer element
pub struct AlsaControl {
    name: String,
    id: SelemId,
    mixer: Rc<Mixer>,
    enum_capable: bool,
    playback_volume: bool,
    capture_volume: bool,
}

impl AlsaControl {
    fn selem(&self) -> Result<Selem<'_>> {
        self.mixer
            .find_selem(&self.id)
            .ok_or_else(|| ControlError::ControlNotFound(self.name.clone()))
    }

    fn volume_range(&self, selem: &Selem<'_>) -> (i64, i64) {
        if self.playback_volume {
            selem.get_playback_volume_range()
        } else {
            selem.get_capture_volume_range()
        }
    }

    fn raw_volume(&self, selem: &Selem<'_>) -> Result<i64> {
        let channel = SelemChannelId::mono();
        if self.playback_volume {
            selem.get_playback_volume(channel)
        } else {
            selem.get_capture_volume(channel)
        }
        .map_err(|e| io_error(&self.name, e))
    }

    fn write_raw_volume(&self, selem: &Selem<'_>, raw: i64) -> Result<()> {
        if self.playback_volume {
            selem.set_playback_volume_all(raw)
        } else {
            selem.set_capture_volume_all(raw)
        }
        .map_err(|e| io_error(&self.name, e))
    }
}

fn percent_of(raw: i64, min: i64, max: i64) -> i64 {
    if max <= min {
        0
    } else {
        ((raw - min) * 100 + (max - min) / 2) / (max - min)
    }
}

fn raw_of(percent: i64, min: i64, max: i64) -> i64 {
    min + (max - min) * percent.clamp(0, 100) / 100
}

impl ControlHandle for AlsaControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enum_capable(&self) -> bool {
        self.enum_capable
    }

    fn is_volume_capable(&self) -> bool {
        self.playback_volume || self.capture_volume
    }

    fn read_enum(&self) -> Result<EnumState> {
        if !self.enum_capable {
            return Err(ControlError::NotEnumCapable(self.name.clone()));
        }
        let selem = self.selem()?;
        let count = selem.get_enum_items().map_err(|e| io_error(&self.name, e))?;
        let mut choices = Vec::with_capacity(count as usize);
        for idx in 0..count {
            choices.push(
                selem
                    .get_enum_item_name(idx)
                    .map_err(|e| io_error(&self.name, e))?,
            );
        }
        let current = selem
            .get_enum_item(SelemChannelId::mono())
            .map_err(|e| io_error(&self.name, e))?;
        let current = choices
            .get(current as usize)
            .cloned()
            .ok_or_else(|| ControlError::HardwareIo {
                control: self.name.clone(),
                message: format!("selected index {current} outside {count} choices"),
            })?;
        Ok(EnumState { current, choices })
    }

    fn write_enum(&self, value: &str) -> Result<()> {
        let state = self.read_enum()?;
        let idx = state
            .choices
            .iter()
            .position(|c| c == value)
            .ok_or_else(|| ControlError::HardwareIo {
                control: self.name.clone(),
                message: format!("enum value '{value}' not offered"),
            })?;
        self.selem()?
            .set_enum_item(SelemChannelId::mono(), idx as u32)
            .map_err(|e| io_error(&self.name, e))
    }

    fn read_volume(&self, unit: VolumeUnit) -> Result<i64> {
        if !self.is_volume_capable() {
            return Err(ControlError::NotVolumeCapable(self.name.clone()));
        }
        let selem = self.selem()?;
        match unit {
            VolumeUnit::Raw => self.raw_volume(&selem),
            VolumeUnit::Percent => {
                let (min, max) = self.volume_range(&selem);
                Ok(percent_of(self.raw_volume(&selem)?, min, max))
            }
            VolumeUnit::Decibel => {
                let channel = SelemChannelId::mono();
                let mb = if self.playback_volume {
                    selem.get_playback_vol_db(channel)
                } else {
                    selem.get_capture_vol_db(channel)
                }
                .map_err(|e| io_error(&self.name, e))?;
                Ok(mb.0)
            }
        }
    }

    fn write_volume(&self, level: i64, unit: VolumeUnit) -> Result<()> {
        if !self.is_volume_capable() {
            return Err(ControlError::NotVolumeCapable(self.name.clone()));
        }
        let selem = self.selem()?;
        match unit {
            VolumeUnit::Raw => self.write_raw_volume(&selem, level),
            VolumeUnit::Percent => {
                let (min, max) = self.volume_range(&selem);
                self.write_raw_volume(&selem, raw_of(level, min, max))
            }
            VolumeUnit::Decibel => {
                if self.playback_volume {
                    selem.set_playback_db_all(MilliBel(level), Round::Floor)
                } else {
                    selem.set_capture_db_all(MilliBel(level), Round::Floor)
                }
                .map_err(|e| io_error(&self.name, e))
            }
        }
    }
}
