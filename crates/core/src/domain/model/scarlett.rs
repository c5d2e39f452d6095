//! Focusrite Scarlett declarations
//!
//! Control names follow the ALSA mixer elements exposed by the kernel's
//! Scarlett mixer support (snd-usb-audio with `device_setup=1`).

use super::{DeviceModel, MixDef, ModelSpec, StereoPair};

fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix} {i}")).collect()
}

fn numbered_padded(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix} {i:02}")).collect()
}

/// Scarlett 18i20 2nd gen: 18 capture channels, 20 playback channels,
/// ten internal mixes of 18 slots each.
pub fn scarlett_18i20_gen2() -> DeviceModel {
    let physical_inputs: Vec<String> = numbered("Analogue", 8)
        .into_iter()
        .chain(numbered("S/PDIF", 2))
        .chain(numbered("ADAT", 8))
        .collect();

    let physical_outputs: Vec<String> = numbered_padded("Analogue Output", 10)
        .into_iter()
        .chain(numbered("S/PDIF Output", 2))
        .chain(numbered("ADAT Output", 8))
        .collect();

    let pcm_outputs = numbered("PCM", 20);

    let mixes: Vec<MixDef> = "ABCDEFGHIJ"
        .chars()
        .map(|letter| MixDef {
            name: format!("Mix {letter}"),
            slots: numbered_padded(&format!("Mix {letter} Input"), 18),
        })
        .collect();

    let mixer_inputs = numbered_padded("Mixer Input", 18);

    // Each physical output has a dedicated volume-mode control. Leave most of
    // them on the hardware dial and only expose faders for the headphone
    // outputs, which share the monitor dial otherwise.
    let mut force_enum_values: Vec<(String, String)> = (1..=10)
        .map(|i| {
            let mode = if i <= 6 { "HW" } else { "SW" };
            (format!("Line Out {i:02} Volume Control"), mode.to_string())
        })
        .collect();

    // Pin each PCM capture channel to the physical input it mirrors, so the
    // signal sent back to the PC always corresponds to the matching input.
    force_enum_values.extend(
        physical_inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (format!("PCM {:02}", i + 1), input.clone())),
    );

    // Headphone levels have a physical dial; pin the element to full scale
    // rather than surfacing another fader.
    let force_volumes = vec![
        ("Line 07 (Headphones 1 L)".to_string(), 100),
        ("Line 08 (Headphones 1 R)".to_string(), 100),
        ("Line 09 (Headphones 2 L)".to_string(), 100),
        ("Line 10 (Headphones 2 R)".to_string(), 100),
    ];

    let stereo_sources: Vec<StereoPair> = (1..20)
        .step_by(2)
        .map(|i| StereoPair::new(format!("PCM {i}"), format!("PCM {}", i + 1)))
        .chain(std::iter::once(StereoPair::new("S/PDIF 1", "S/PDIF 2")))
        .collect();

    let stereo_sinks = vec![
        StereoPair::new("Analogue Output 01", "Analogue Output 02"),
        StereoPair::new("Analogue Output 03", "Analogue Output 04"),
        StereoPair::new("Analogue Output 05", "Analogue Output 06"),
        StereoPair::new("Analogue Output 07", "Analogue Output 08"),
        StereoPair::new("Analogue Output 09", "Analogue Output 10"),
        StereoPair::new("S/PDIF Output 1", "S/PDIF Output 2"),
    ];

    let spec = ModelSpec {
        canonical_name: "18i20gen2".to_string(),
        name: "Scarlett 18i20 USB".to_string(),
        physical_inputs,
        physical_outputs,
        pcm_outputs,
        mixes,
        mixer_inputs,
        force_enum_values,
        force_volumes,
        global_settings: vec!["Clock Source Clock Source".to_string()],
        stereo_sources,
        stereo_sinks,
    };

    DeviceModel::new(spec).expect("18i20gen2 declaration is internally consistent")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_18i20_shape() {
        let model = scarlett_18i20_gen2();
        assert_eq!(model.canonical_name(), "18i20gen2");
        assert_eq!(model.name(), "Scarlett 18i20 USB");
        assert_eq!(model.physical_inputs().len(), 18);
        assert_eq!(model.physical_outputs().len(), 20);
        assert_eq!(model.pcm_outputs().len(), 20);
        assert_eq!(model.mixes().len(), 10);
        assert_eq!(model.mixer_inputs().len(), 18);
        for mix in model.mixes() {
            assert_eq!(mix.slots.len(), 18);
        }
        // 10 line-out volume modes + 18 pinned PCM capture channels
        assert_eq!(model.force_enum_values().len(), 28);
        assert_eq!(model.force_volumes().len(), 4);
    }

    #[test]
    fn test_18i20_choice_set_size() {
        let model = scarlett_18i20_gen2();
        // Off + 18 inputs + 10 mixes + 20 PCM channels
        assert_eq!(model.expected_sink_choices().len(), 49);
    }

    #[test]
    fn test_18i20_stereo_links() {
        let model = scarlett_18i20_gen2();
        assert_eq!(model.stereo_sources().len(), 11);
        assert_eq!(model.stereo_sinks().len(), 6);
        assert_eq!(model.stereo_sources()[0].label(), "PCM 1 + PCM 2");
    }
}
