//! Integration tests for the discovery-to-routing pipeline
//!
//! These run the full flow against an in-memory control surface: enumerate
//! cards, match and validate against a model, build the routing engine, and
//! exercise the presentation-facing operations end to end.

use redroute_core::domain::control::ControlSet;
use redroute_core::domain::discovery::{find_card, DiscoveryError};
use redroute_core::domain::model::{models, DeviceModel, MixDef, ModelSpec, StereoPair};
use redroute_core::domain::routing::RoutingEngine;
use redroute_core::domain::testkit::{FakeBackend, FakeCard};

/// The end-to-end scenario model: 2 physical inputs, 1 mix of 2 slots,
/// 2 mixer inputs, no stereo links
fn duo_model() -> DeviceModel {
    DeviceModel::new(ModelSpec {
        canonical_name: "duo".to_string(),
        name: "Duo USB".to_string(),
        physical_inputs: vec!["Analogue 1".to_string(), "Analogue 2".to_string()],
        physical_outputs: vec!["Out 1".to_string(), "Out 2".to_string()],
        pcm_outputs: vec!["PCM 1".to_string(), "PCM 2".to_string()],
        mixes: vec![MixDef {
            name: "Mix A".to_string(),
            slots: vec!["Mix A Input 01".to_string(), "Mix A Input 02".to_string()],
        }],
        mixer_inputs: vec!["Mixer Input 01".to_string(), "Mixer Input 02".to_string()],
        ..Default::default()
    })
    .unwrap()
}

fn discover(model: &DeviceModel, backend: &FakeBackend) -> (i32, ControlSet) {
    find_card(model, backend).expect("card should be found")
}

// ============================================================================
// DISCOVERY
// ============================================================================

#[test]
fn test_discovery_then_engine_construction() {
    let model = duo_model();
    let mut backend = FakeBackend::new();
    backend.add_card("HDA Intel", "onboard audio", FakeCard::new());
    backend.add_card("Duo USB", "Duo USB at bus 3", FakeCard::from_model(&model));

    let (index, controls) = discover(&model, &backend);
    assert_eq!(index, 1);

    let engine = RoutingEngine::new(model, controls).unwrap();
    // 2 physical inputs + 2 PCM channels
    assert_eq!(engine.sources().len(), 4);
    assert_eq!(engine.outputs().len(), 2);
    assert_eq!(engine.mixer_inputs().len(), 2);
    assert_eq!(engine.mixes().len(), 1);
    let mix = &engine.mixes()[0];
    assert_eq!(mix.slots().len(), 2);
    assert_eq!(mix.slots()[0].controls(), &["Mix A Input 01".to_string()][..]);
    assert_eq!(mix.slots()[1].controls(), &["Mix A Input 02".to_string()][..]);
}

#[test]
fn test_discovery_prefers_later_valid_card_over_broken_name_match() {
    let model = duo_model();
    let broken = FakeCard::from_model(&model);
    broken.remove_choice("Out 1", "Mix A");

    let mut backend = FakeBackend::new();
    backend.add_card("Duo USB", "stale firmware", broken);
    backend.add_card("Duo USB", "current firmware", FakeCard::from_model(&model));

    let (index, _) = discover(&model, &backend);
    assert_eq!(index, 1);
}

#[test]
fn test_discovery_failure_lists_every_card() {
    let model = duo_model();
    let mut backend = FakeBackend::new();
    backend.add_card("HDA Intel", "onboard audio", FakeCard::new());

    match find_card(&model, &backend) {
        Err(DiscoveryError::CardNotFound { scanned, .. }) => {
            assert_eq!(scanned, vec!["hw:0 'HDA Intel'".to_string()]);
        }
        other => panic!("expected CardNotFound, got {other:?}"),
    }
}

// ============================================================================
// ROUTING OPERATIONS END TO END
// ============================================================================

#[test]
fn test_monitoring_and_mix_levels_through_the_engine() {
    let model = duo_model();
    let card = FakeCard::from_model(&model);
    let engine = RoutingEngine::new(model, card.control_set()).unwrap();

    let analogue_2 = engine
        .sources()
        .iter()
        .find(|s| s.name() == "Analogue 2")
        .unwrap();
    assert!(!engine.is_monitored(analogue_2).unwrap());

    let selector = &engine.mixer_inputs()[0];
    engine.set_mixer_input(selector, "Analogue 2").unwrap();
    assert!(engine.is_monitored(analogue_2).unwrap());
    assert_eq!(engine.mixer_input_source(selector).unwrap(), "Analogue 2");

    let mix = &engine.mixes()[0];
    engine.set_mix_level(mix, 0, 85).unwrap();
    assert_eq!(engine.mix_level(mix, 0).unwrap(), 85);
    assert_eq!(card.volume("Mix A Input 01"), 85);
    // The other slot is untouched
    assert_eq!(engine.mix_level(mix, 1).unwrap(), 0);

    let out = engine.outputs().iter().find(|o| o.name() == "Out 1").unwrap();
    engine.set_output_selection(out, "Mix A").unwrap();
    assert_eq!(engine.output_selection(out).unwrap(), "Mix A");
    assert_eq!(card.current_enum("Out 1"), "Mix A");
}

#[test]
fn test_stereo_pipeline_with_scarlett_style_model() {
    let model = DeviceModel::new(ModelSpec {
        canonical_name: "quad".to_string(),
        name: "Quad USB".to_string(),
        physical_inputs: vec!["Analogue 1".to_string(), "Analogue 2".to_string()],
        physical_outputs: vec![
            "Analogue Output 01".to_string(),
            "Analogue Output 02".to_string(),
        ],
        pcm_outputs: vec!["PCM 1".to_string(), "PCM 2".to_string()],
        mixes: vec![MixDef {
            name: "Mix A".to_string(),
            slots: vec!["Mix A Input 01".to_string(), "Mix A Input 02".to_string()],
        }],
        mixer_inputs: vec!["Mixer Input 01".to_string(), "Mixer Input 02".to_string()],
        stereo_sources: vec![StereoPair::new("PCM 1", "PCM 2")],
        stereo_sinks: vec![StereoPair::new("Analogue Output 01", "Analogue Output 02")],
        ..Default::default()
    })
    .unwrap();

    let card = FakeCard::from_model(&model);
    let engine = RoutingEngine::new(model, card.control_set()).unwrap();

    assert_eq!(engine.outputs().len(), 1);
    let main = &engine.outputs()[0];
    assert_eq!(main.name(), "Analogue Output 01 + Analogue Output 02");

    engine.set_output_selection(main, "PCM 1 + PCM 2").unwrap();
    assert_eq!(card.current_enum("Analogue Output 01"), "PCM 1");
    assert_eq!(card.current_enum("Analogue Output 02"), "PCM 2");
    assert_eq!(engine.output_selection(main).unwrap(), "PCM 1 + PCM 2");

    // An external change that desynchronizes the pair is resolved on read
    card.set_current_enum("Analogue Output 02", "Mix A");
    assert_eq!(engine.output_selection(main).unwrap(), "Mix A");
    assert_eq!(card.current_enum("Analogue Output 01"), "Off");
}

// ============================================================================
// SHIPPED DECLARATIONS
// ============================================================================

#[test]
fn test_shipped_models_validate_and_route() {
    for model in models() {
        let card = FakeCard::from_model(&model);
        assert!(
            model.validate(&card.control_set()),
            "model {} should validate against its own surface",
            model.canonical_name()
        );

        let sources = model.physical_inputs().len() + model.pcm_outputs().len();
        let engine = RoutingEngine::new(model, card.control_set()).unwrap();
        assert_eq!(engine.sources().len(), sources);
        assert!(!engine.outputs().is_empty());
        assert!(!engine.mixes().is_empty());
    }
}

#[test]
fn test_scarlett_18i20_engine_shape() {
    let model = models()
        .into_iter()
        .find(|m| m.canonical_name() == "18i20gen2")
        .expect("18i20gen2 is a shipped model");
    let card = FakeCard::from_model(&model);
    let engine = RoutingEngine::new(model, card.control_set()).unwrap();

    assert_eq!(engine.sources().len(), 38);
    // 20 sinks with 6 stereo-linked pairs collapsed
    assert_eq!(engine.outputs().len(), 14);
    assert_eq!(engine.mixer_inputs().len(), 18);
    assert_eq!(engine.mixes().len(), 10);

    // Forced values were applied during construction
    assert_eq!(card.current_enum("PCM 01"), "Analogue 1");
    assert_eq!(card.current_enum("Line Out 01 Volume Control"), "HW");
    assert_eq!(card.current_enum("Line Out 07 Volume Control"), "SW");
    assert_eq!(card.volume("Line 07 (Headphones 1 L)"), 100);
}
