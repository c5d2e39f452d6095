//! Subcommand implementations

use anyhow::{anyhow, bail, Context};
use redroute_core::domain::control::CardBackend;
use redroute_core::domain::discovery::{find_card, DiscoveryError};
use redroute_core::domain::model::{find_model, models};
use redroute_core::domain::routing::RoutingEngine;
use redroute_infra::control::{probe_card, AlsaBackend};
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Discover a card for one of the supported models and build the routing
/// engine over it. Discovery failure is fatal here: without a validated card
/// there is nothing useful to run against.
pub fn open_engine(model_filter: Option<&str>) -> anyhow::Result<RoutingEngine> {
    let backend = AlsaBackend::new();

    let candidates = match model_filter {
        Some(canonical) => vec![find_model(canonical).ok_or_else(|| {
            anyhow!(
                "unknown model '{}'; supported models: {}",
                canonical,
                models()
                    .iter()
                    .map(|m| m.canonical_name().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?],
        None => models(),
    };

    let mut scanned = Vec::new();
    for model in candidates {
        match find_card(&model, &backend) {
            Ok((index, controls)) => {
                info!("using '{}' at hw:{}", model.name(), index);
                return Ok(RoutingEngine::new(model, controls)?);
            }
            Err(DiscoveryError::CardNotFound { scanned: seen, .. }) => scanned = seen,
            Err(err) => return Err(err.into()),
        }
    }

    bail!(
        "no supported interface found; cards seen: [{}]",
        scanned.join(", ")
    )
}

pub fn list_cards() -> anyhow::Result<()> {
    let backend = AlsaBackend::new();
    for card in backend.list_cards()? {
        println!("hw:{}  {}  ({})", card.index, card.name, card.longname);
    }
    Ok(())
}

pub fn status(engine: &RoutingEngine) -> anyhow::Result<()> {
    println!("Model: {}", engine.model().name());

    println!("\nGlobal settings:");
    for name in engine.global_settings() {
        let state = engine.setting(name)?;
        println!("  {}: {}  [{}]", name, state.current, state.choices.join(", "));
    }

    println!("\nSources:");
    for source in engine.sources() {
        let marker = if engine.is_monitored(source)? { "*" } else { " " };
        println!("  {marker} {}", source.name());
    }

    println!("\nOutputs:");
    for output in engine.outputs() {
        println!("  {}: {}", output.name(), engine.output_selection(output)?);
    }

    println!("\nMixer inputs:");
    for input in engine.mixer_inputs() {
        println!(
            "  {:2}. {}: {}",
            input.index() + 1,
            input.name(),
            engine.mixer_input_source(input)?
        );
    }

    println!("\nMixes:");
    for mix in engine.mixes() {
        let mut levels = Vec::with_capacity(mix.slots().len());
        for slot in 0..mix.slots().len() {
            levels.push(format!("{}%", engine.mix_level(mix, slot)?));
        }
        println!("  {}: {}", mix.name(), levels.join(" "));
    }

    Ok(())
}

pub fn set_output(engine: &RoutingEngine, output: &str, choice: &str) -> anyhow::Result<()> {
    let target = engine
        .outputs()
        .iter()
        .find(|o| o.name() == output)
        .ok_or_else(|| {
            anyhow!(
                "no output '{}'; outputs: {}",
                output,
                engine
                    .outputs()
                    .iter()
                    .map(|o| o.name().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
    engine.set_output_selection(target, choice)?;
    println!("{}: {}", target.name(), engine.output_selection(target)?);
    Ok(())
}

pub fn set_mixer_input(engine: &RoutingEngine, slot: usize, source: &str) -> anyhow::Result<()> {
    let inputs = engine.mixer_inputs();
    if slot == 0 || slot > inputs.len() {
        bail!("mixer input slot must be 1-{}", inputs.len());
    }
    let input = &inputs[slot - 1];
    engine.set_mixer_input(input, source)?;
    println!("{}: {}", input.name(), engine.mixer_input_source(input)?);
    Ok(())
}

pub fn set_mix(engine: &RoutingEngine, mix: &str, slot: usize, percent: i64) -> anyhow::Result<()> {
    if !(0..=100).contains(&percent) {
        bail!("level must be 0-100 percent");
    }
    let target = engine
        .mixes()
        .iter()
        .find(|m| m.name() == mix)
        .ok_or_else(|| {
            anyhow!(
                "no mix '{}'; mixes: {}",
                mix,
                engine
                    .mixes()
                    .iter()
                    .map(|m| m.name().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
    if slot == 0 || slot > target.slots().len() {
        bail!("mix '{}' slots are 1-{}", target.name(), target.slots().len());
    }
    engine.set_mix_level(target, slot - 1, percent)?;
    println!(
        "{} slot {}: {}%",
        target.name(),
        slot,
        engine.mix_level(target, slot - 1)?
    );
    Ok(())
}

pub fn set_setting(engine: &RoutingEngine, name: &str, value: &str) -> anyhow::Result<()> {
    engine.set_setting(name, value)?;
    println!("{}: {}", name, engine.setting(name)?.current);
    Ok(())
}

/// Dump every control's capabilities for `hw:<index>` as sorted, indented
/// JSON, to stdout or a file
pub fn describe(interface: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let re = Regex::new(r"(?i)^hw:([0-9]+)$").expect("static pattern");
    let index: i32 = re
        .captures(interface)
        .ok_or_else(|| anyhow!("invalid interface format: '{}' (expected hw:<index>)", interface))?
        .get(1)
        .expect("group 1 always present on match")
        .as_str()
        .parse()
        .context("card index out of range")?;

    let backend = AlsaBackend::new();
    let cards = backend.list_cards()?;
    let card = cards.iter().find(|c| c.index == index).ok_or_else(|| {
        anyhow!(
            "no such card index {}; available: {}",
            index,
            cards
                .iter()
                .map(|c| c.index.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;
    info!("selected card hw:{}: {}", card.index, card.longname);

    let dumps = probe_card(index)?;
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            serde_json::to_writer_pretty(&mut file, &dumps)?;
            file.write_all(b"\n")?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &dumps)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
