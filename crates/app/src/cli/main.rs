//! redroute CLI
//!
//! Discovers a supported interface, builds the routing engine over it, and
//! exposes one-shot query/mutate commands plus the `describe` capability dump
//! used when authoring new device models.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "redroute")]
#[command(about = "Routing-matrix control for Focusrite Scarlett USB interfaces", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Restrict discovery to one model (canonical name, e.g. "18i20gen2")
    #[arg(long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sound cards visible to the control plane
    ListCards,
    /// Discover a supported interface and print its live routing state
    Status,
    /// Route a source (or stereo pair) to an output
    SetOutput {
        /// Output name as shown by `status`
        output: String,
        /// Choice name as shown by `status` (e.g. "PCM 1 + PCM 2", "Off")
        choice: String,
    },
    /// Select the source feeding a mixer-bus input slot
    SetMixerInput {
        /// Slot number, 1-based
        slot: usize,
        /// Source name, or "Off"
        source: String,
    },
    /// Set a mix slot's level
    SetMix {
        /// Mix name as shown by `status`
        mix: String,
        /// Slot number, 1-based
        slot: usize,
        /// Level in percent (0-100)
        percent: i64,
    },
    /// Change a global setting (e.g. clock source)
    SetSetting { name: String, value: String },
    /// Dump every control's capabilities for a card given as "hw:<index>"
    Describe {
        interface: String,
        /// Write the JSON document to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Command::ListCards => commands::list_cards(),
        Command::Status => commands::status(&commands::open_engine(cli.model.as_deref())?),
        Command::SetOutput { output, choice } => {
            let engine = commands::open_engine(cli.model.as_deref())?;
            commands::set_output(&engine, &output, &choice)
        }
        Command::SetMixerInput { slot, source } => {
            let engine = commands::open_engine(cli.model.as_deref())?;
            commands::set_mixer_input(&engine, slot, &source)
        }
        Command::SetMix { mix, slot, percent } => {
            let engine = commands::open_engine(cli.model.as_deref())?;
            commands::set_mix(&engine, &mix, slot, percent)
        }
        Command::SetSetting { name, value } => {
            let engine = commands::open_engine(cli.model.as_deref())?;
            commands::set_setting(&engine, &name, &value)
        }
        Command::Describe { interface, output } => {
            commands::describe(&interface, output.as_deref())
        }
    }
}
