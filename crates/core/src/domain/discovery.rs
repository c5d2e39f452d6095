//! Card discovery
//!
//! Scans the cards a backend exposes, matches them against a device model by
//! name, and keeps only a card whose control surface actually validates.
//! Several cards of different models or firmware revisions can be plugged in
//! at once, so a name match alone is never trusted.

use crate::domain::control::{CardBackend, ControlError, ControlSet};
use crate::domain::model::DeviceModel;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No card both name-matched and validated. Carries every card name seen
    /// during the scan so the failure is actionable.
    #[error("no usable '{model}' card found; cards seen: [{}]", .scanned.join(", "))]
    CardNotFound { model: String, scanned: Vec<String> },

    /// The backend could not even enumerate cards
    #[error(transparent)]
    Backend(#[from] ControlError),
}

/// Find the first card that matches `model` by name and passes topology
/// validation, returning its index and opened controls.
pub fn find_card(
    model: &DeviceModel,
    backend: &dyn CardBackend,
) -> Result<(i32, ControlSet), DiscoveryError> {
    let cards = backend.list_cards()?;
    let mut scanned = Vec::with_capacity(cards.len());

    for card in &cards {
        scanned.push(format!("hw:{} '{}'", card.index, card.name));
        if card.name != model.name() {
            continue;
        }

        info!(
            card = card.index,
            "card '{}' matches model '{}', checking controls",
            card.name,
            model.canonical_name()
        );

        let controls = match backend.open_controls(card.index) {
            Ok(controls) => controls,
            Err(err) => {
                warn!(card = card.index, "cannot open controls: {err}");
                continue;
            }
        };

        if model.validate(&controls) {
            info!(card = card.index, "using card hw:{}", card.index);
            return Ok((card.index, controls));
        }

        warn!(
            card = card.index,
            "card hw:{} is named '{}' but its controls do not match; if this is the right \
             device, the kernel driver's multi-channel control mode (snd-usb-audio \
             device_setup=1) may not be enabled",
            card.index,
            card.name
        );
    }

    Err(DiscoveryError::CardNotFound {
        model: model.name().to_string(),
        scanned,
    })
}
