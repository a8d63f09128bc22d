// ── Pool state domain types ──

use std::fmt;

use autelis_api::StatusSnapshot;
use autelis_api::status::{EQUIPMENT, SYSTEM, TEMP};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use super::heater::{HeatCoolStatus, HeaterAddress, ThermostatMode};
use crate::convert::{self, Field};
use crate::error::CoreError;

/// Unit every temperature on the controller is reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TempUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TempUnit {
    /// Read a `tempunits` value.
    ///
    /// `"0"` is what the push `UNITS=F` token becomes after value translation.
    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim() {
            "C" => Some(Self::Celsius),
            "F" | "0" => Some(Self::Fahrenheit),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Celsius => "°C",
        }
    }
}

/// A whole-degree reading, labelled with the controller's current unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temperature {
    pub degrees: i32,
    pub unit: TempUnit,
}

impl Temperature {
    pub fn new(degrees: i32, unit: TempUnit) -> Self {
        Self { degrees, unit }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.degrees, self.unit.symbol())
    }
}

/// Controller-level readings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub runstate: i32,
    pub opmode: i32,
    pub freeze: i32,
    pub water_sensor: i32,
    pub solar_sensor: i32,
    pub air_sensor: i32,
    pub air_temp: Temperature,
    pub solar_temp: Temperature,
}

/// One heater's thermostat view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thermostat {
    pub heater: HeaterAddress,
    /// Raw Pentair heater setting code.
    pub setting: i32,
    pub setpoint: Temperature,
    /// Current water temperature.
    pub current: Temperature,
    pub mode: ThermostatMode,
    pub status: HeatCoolStatus,
}

impl Thermostat {
    pub fn new(heater: HeaterAddress) -> Self {
        Self {
            heater,
            setting: 0,
            setpoint: Temperature::default(),
            current: Temperature::default(),
            mode: ThermostatMode::Off,
            status: HeatCoolStatus::Idle,
        }
    }

    /// Recompute mode and heat/cool status.
    pub(crate) fn derive(&mut self, htstatus: u32) {
        self.mode = ThermostatMode::from_setting(self.setting);
        self.status = self.heater.heat_cool_status(htstatus);
    }
}

/// Everything known about one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// `false` until the first good snapshot, and again after a failed poll.
    pub reachable: bool,
    pub unit: TempUnit,
    pub controller: ControllerStatus,
    /// Heater status bit field shared by both heaters.
    pub htstatus: u32,
    pub pool_heater: Thermostat,
    pub spa_heater: Thermostat,
    /// Installed circuits and features, in discovery order.
    pub equipment: IndexMap<String, bool>,
}

impl Default for PoolState {
    fn default() -> Self {
        Self {
            reachable: false,
            unit: TempUnit::default(),
            controller: ControllerStatus::default(),
            htstatus: 0,
            pool_heater: Thermostat::new(HeaterAddress::PoolHeater),
            spa_heater: Thermostat::new(HeaterAddress::SpaHeater),
            equipment: IndexMap::new(),
        }
    }
}

impl PoolState {
    pub fn heater(&self, heater: HeaterAddress) -> &Thermostat {
        match heater {
            HeaterAddress::PoolHeater => &self.pool_heater,
            HeaterAddress::SpaHeater => &self.spa_heater,
        }
    }

    pub(crate) fn heater_mut(&mut self, heater: HeaterAddress) -> &mut Thermostat {
        match heater {
            HeaterAddress::PoolHeater => &mut self.pool_heater,
            HeaterAddress::SpaHeater => &mut self.spa_heater,
        }
    }

    /// Switch the unit and relabel every temperature already held.
    pub fn set_unit(&mut self, unit: TempUnit) {
        self.unit = unit;
        for temperature in [
            &mut self.controller.air_temp,
            &mut self.controller.solar_temp,
            &mut self.pool_heater.setpoint,
            &mut self.pool_heater.current,
            &mut self.spa_heater.setpoint,
            &mut self.spa_heater.current,
        ] {
            temperature.unit = unit;
        }
    }

    pub(crate) fn derive_thermostats(&mut self) {
        let htstatus = self.htstatus;
        self.pool_heater.derive(htstatus);
        self.spa_heater.derive(htstatus);
    }

    /// Register the installed equipment of a snapshot.
    ///
    /// Blank equipment elements are not installed and are skipped. States
    /// are filled in by the following [`apply_snapshot`](Self::apply_snapshot).
    pub fn register_equipment(&mut self, snapshot: &StatusSnapshot) {
        for (name, _) in snapshot.installed_equipment() {
            self.equipment.entry(name.to_owned()).or_insert(false);
        }
    }

    /// Map a full snapshot onto this state.
    ///
    /// Every required element is validated before anything changes: on
    /// error the state is left exactly as it was.
    pub fn apply_snapshot(&mut self, snapshot: &StatusSnapshot) -> Result<(), CoreError> {
        let mut next = self.clone();

        // Units first: later temperatures are read in the new unit.
        let units = required(snapshot, TEMP, convert::TEMP_UNITS)?;
        convert::apply_field(&mut next, Field::TempUnits, convert::TEMP_UNITS, units)?;

        for &element in convert::REQUIRED_SYSTEM {
            let value = required(snapshot, SYSTEM, element)?;
            apply_required(&mut next, element, value)?;
        }
        for &element in convert::REQUIRED_TEMP {
            let value = required(snapshot, TEMP, element)?;
            apply_required(&mut next, element, value)?;
        }

        if let Some(section) = snapshot.section(EQUIPMENT) {
            for (name, value) in section {
                let Some(value) = value.as_deref() else { continue };
                if let Some(slot) = next.equipment.get_mut(name) {
                    *slot = convert::parse_switch(name, value)?;
                }
            }
        }

        next.reachable = true;
        *self = next;
        Ok(())
    }

    /// Apply one translated push update.
    ///
    /// Returns `false` if the element is unknown (including equipment that
    /// was not discovered) or the value cannot be read; nothing changes then.
    pub fn apply_event(&mut self, element: &str, value: &str) -> bool {
        let result = if let Some(field) = Field::for_element(element) {
            convert::apply_field(self, field, element, value)
        } else if self.equipment.contains_key(element) {
            convert::parse_switch(element, value).map(|on| {
                self.equipment.insert(element.to_owned(), on);
            })
        } else {
            return false;
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "push update not applied");
                false
            }
        }
    }
}

fn required<'a>(
    snapshot: &'a StatusSnapshot,
    section: &str,
    element: &str,
) -> Result<&'a str, CoreError> {
    snapshot
        .value(section, element)
        .ok_or_else(|| CoreError::MissingElement {
            element: element.to_owned(),
        })
}

fn apply_required(state: &mut PoolState, element: &str, value: &str) -> Result<(), CoreError> {
    let field = Field::for_element(element).ok_or_else(|| {
        CoreError::Internal(format!("no field mapping for required element <{element}>"))
    })?;
    convert::apply_field(state, field, element, value)
}
