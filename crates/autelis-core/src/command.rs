// ── Command API ──
//
// All write operations flow through `Command`. The controller turns each
// variant into one `set.cgi` request and, once accepted, mirrors the new
// value into the store as if the controller had pushed it.

use autelis_api::{CommandLabel, StatusUpdateEvent};

use crate::model::{HeaterAddress, ThermostatMode};

/// All write operations against an Autelis controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch a circuit or feature on.
    TurnOn { element: String },
    /// Switch a circuit or feature off.
    TurnOff { element: String },
    /// Change a heater's setpoint, in the controller's current unit.
    SetSetpoint { heater: HeaterAddress, degrees: i32 },
    /// Change a heater's mode.
    SetMode {
        heater: HeaterAddress,
        mode: ThermostatMode,
    },
}

/// One `set.cgi` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandRequest<'a> {
    pub element: &'a str,
    pub label: CommandLabel,
    pub value: i32,
}

impl Command {
    pub(crate) fn request(&self) -> CommandRequest<'_> {
        match self {
            Self::TurnOn { element } => CommandRequest {
                element,
                label: CommandLabel::Value,
                value: 1,
            },
            Self::TurnOff { element } => CommandRequest {
                element,
                label: CommandLabel::Value,
                value: 0,
            },
            Self::SetSetpoint { heater, degrees } => CommandRequest {
                element: heater.setpoint_element(),
                label: CommandLabel::Temp,
                value: *degrees,
            },
            Self::SetMode { heater, mode } => CommandRequest {
                element: heater.address(),
                label: CommandLabel::HeatValue,
                value: mode.setting(),
            },
        }
    }

    /// Equipment element this command switches, if any.
    pub fn equipment(&self) -> Option<&str> {
        match self {
            Self::TurnOn { element } | Self::TurnOff { element } => Some(element),
            Self::SetSetpoint { .. } | Self::SetMode { .. } => None,
        }
    }

    /// The update the controller would push once the command takes effect.
    pub(crate) fn expected_update(&self) -> StatusUpdateEvent {
        let request = self.request();
        StatusUpdateEvent::new(request.element, request.value.to_string())
    }
}
