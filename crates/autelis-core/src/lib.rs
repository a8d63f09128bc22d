// autelis-core: Device state layer between autelis-api and consumers (CLI).

pub mod command;
pub mod config;
pub mod controller;
mod convert;
pub mod error;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{ControllerConfig, ReconnectConfig};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use store::DeviceStore;

pub use model::{
    ControllerStatus, HeatCoolStatus, HeaterAddress, PoolState, TempUnit, Temperature,
    Thermostat, ThermostatMode,
};

// Re-exported so consumers need not depend on autelis-api directly.
pub use autelis_api::listener::ListenerConfig;
pub use autelis_api::{StatusSnapshot, StatusUpdateEvent};
