//! ALSA control-surface backend

pub mod alsa_backend;
pub mod probe;

pub use alsa_backend::AlsaBackend;
pub use probe::{probe_card, ControlDump};
