// ── Element-to-state mapping ──
//
// One table maps status-document element names to `PoolState` fields. Both
// the snapshot path and the push path go through `apply_field`, so a value
// lands in the same place whichever way it arrived.

use crate::error::CoreError;
use crate::model::{HeaterAddress, PoolState, TempUnit, Temperature};

pub(crate) const TEMP_UNITS: &str = "tempunits";

/// `<system>` elements a status document must carry.
pub(crate) const REQUIRED_SYSTEM: &[&str] =
    &["runstate", "opmode", "freeze", "sensor1", "sensor2", "sensor3"];

/// `<temp>` elements a status document must carry, besides `tempunits`.
pub(crate) const REQUIRED_TEMP: &[&str] = &[
    "airtemp", "soltemp", "htstatus", "poolht", "poolsp", "pooltemp", "spaht", "spasp", "spatemp",
];

/// A scalar `PoolState` field addressed by element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    RunState,
    OpMode,
    Freeze,
    WaterSensor,
    SolarSensor,
    AirSensor,
    AirTemp,
    SolarTemp,
    TempUnits,
    HeatStatus,
    HeaterSetting(HeaterAddress),
    Setpoint(HeaterAddress),
    WaterTemp(HeaterAddress),
}

impl Field {
    pub(crate) fn for_element(element: &str) -> Option<Self> {
        let field = match element {
            "runstate" => Self::RunState,
            "opmode" => Self::OpMode,
            "freeze" => Self::Freeze,
            "sensor1" => Self::WaterSensor,
            "sensor2" => Self::SolarSensor,
            "sensor3" => Self::AirSensor,
            "airtemp" => Self::AirTemp,
            // status document and push vocabulary name it differently
            "soltemp" | "solartemp" => Self::SolarTemp,
            TEMP_UNITS => Self::TempUnits,
            "htstatus" => Self::HeatStatus,
            "poolht" => Self::HeaterSetting(HeaterAddress::PoolHeater),
            "spaht" => Self::HeaterSetting(HeaterAddress::SpaHeater),
            "poolsp" => Self::Setpoint(HeaterAddress::PoolHeater),
            "spasp" => Self::Setpoint(HeaterAddress::SpaHeater),
            "pooltemp" => Self::WaterTemp(HeaterAddress::PoolHeater),
            "spatemp" => Self::WaterTemp(HeaterAddress::SpaHeater),
            _ => return None,
        };
        Some(field)
    }
}

/// Parse `value` for `field` and store it. On error `state` is untouched.
pub(crate) fn apply_field(
    state: &mut PoolState,
    field: Field,
    element: &str,
    value: &str,
) -> Result<(), CoreError> {
    let unit = state.unit;

    match field {
        Field::RunState => state.controller.runstate = parse_int(element, value)?,
        Field::OpMode => state.controller.opmode = parse_int(element, value)?,
        Field::Freeze => state.controller.freeze = parse_int(element, value)?,
        Field::WaterSensor => state.controller.water_sensor = parse_int(element, value)?,
        Field::SolarSensor => state.controller.solar_sensor = parse_int(element, value)?,
        Field::AirSensor => state.controller.air_sensor = parse_int(element, value)?,
        Field::AirTemp => {
            state.controller.air_temp = Temperature::new(parse_int(element, value)?, unit);
        }
        Field::SolarTemp => {
            state.controller.solar_temp = Temperature::new(parse_int(element, value)?, unit);
        }
        Field::TempUnits => {
            let unit = TempUnit::from_text(value).ok_or_else(|| invalid(element, value))?;
            state.set_unit(unit);
        }
        Field::HeatStatus => {
            state.htstatus = value.trim().parse().map_err(|_| invalid(element, value))?;
            state.derive_thermostats();
        }
        Field::HeaterSetting(heater) => {
            let setting = parse_int(element, value)?;
            let htstatus = state.htstatus;
            let thermostat = state.heater_mut(heater);
            thermostat.setting = setting;
            thermostat.derive(htstatus);
        }
        Field::Setpoint(heater) => {
            state.heater_mut(heater).setpoint = Temperature::new(parse_int(element, value)?, unit);
        }
        Field::WaterTemp(heater) => {
            state.heater_mut(heater).current = Temperature::new(parse_int(element, value)?, unit);
        }
    }

    Ok(())
}

/// Read an equipment state: any non-zero integer is on.
pub(crate) fn parse_switch(element: &str, value: &str) -> Result<bool, CoreError> {
    parse_int(element, value).map(|v| v != 0)
}

fn parse_int(element: &str, value: &str) -> Result<i32, CoreError> {
    value.trim().parse().map_err(|_| invalid(element, value))
}

fn invalid(element: &str, value: &str) -> CoreError {
    CoreError::InvalidValue {
        element: element.to_owned(),
        value: value.to_owned(),
    }
}
