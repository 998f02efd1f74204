pub mod config;
pub mod constants;

pub use config::{
    ConfigError, NoiseFloorInput, ObservationRequest, ObservationSettings, PlanetConfig,
    StarConfig, load_observation_request,
};
