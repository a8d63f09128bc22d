// ── Domain model ──
//
// Canonical pool types, built from status snapshots and push updates.

pub mod heater;
pub mod state;

pub use heater::{HeatCoolStatus, HeaterAddress, ThermostatMode};
pub use state::{ControllerStatus, PoolState, TempUnit, Temperature, Thermostat};
