//! Domain entities and business rules

pub mod control;
pub mod discovery;
pub mod model;
pub mod routing;
pub mod testkit;

// Re-export specific items to avoid ambiguous glob imports
pub use control::{
    CardBackend, CardInfo, ControlError, ControlHandle, ControlSet, EnumState, VolumeUnit,
};
pub use discovery::{find_card, DiscoveryError};
pub use model::{find_model, models, DeviceModel, MixDef, ModelError, ModelSpec, StereoPair};
pub use routing::{EngineError, Mix, MixerInput, Output, RoutingEngine, Source};
