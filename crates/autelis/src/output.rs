//! Output formatting: table or JSON.
//!
//! Renders data in the format selected by `--output` (or the config's
//! `defaults.output`). Tables use `tabled`, JSON uses serde.

use std::io::{self, Write};

use clap::ValueEnum;
use tabled::{Table, Tabled, settings::Style};

use autelis_config::Defaults;
use autelis_core::{PoolState, Thermostat};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Pick the output format: flag first, then the config default.
pub fn resolve_format(flag: Option<&OutputFormat>, defaults: &Defaults) -> OutputFormat {
    flag.cloned().unwrap_or_else(|| {
        OutputFormat::from_str(&defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views are assembled by hand.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Pool state views ─────────────────────────────────────────────────

#[derive(Tabled)]
struct HeaterRow {
    #[tabled(rename = "Heater")]
    name: &'static str,
    #[tabled(rename = "Water")]
    current: String,
    #[tabled(rename = "Setpoint")]
    setpoint: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Thermostat> for HeaterRow {
    fn from(t: &Thermostat) -> Self {
        Self {
            name: t.heater.label(),
            current: t.current.to_string(),
            setpoint: t.setpoint.to_string(),
            mode: t.mode.to_string(),
            status: t.status.to_string(),
        }
    }
}

#[derive(Tabled)]
struct EquipmentRow {
    #[tabled(rename = "Equipment")]
    element: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Multi-table detail view used by `status`.
pub fn pool_state_detail(state: &PoolState) -> String {
    let c = &state.controller;
    let reachable = if state.reachable {
        "reachable"
    } else {
        "not responding"
    };

    let summary = format!(
        "Controller: {reachable}\n\
         Units:      {}\n\
         Air:        {}\n\
         Solar:      {}\n\
         Run state:  {}   Op mode: {}   Freeze: {}",
        state.unit, c.air_temp, c.solar_temp, c.runstate, c.opmode, c.freeze,
    );

    let heaters = [
        HeaterRow::from(&state.pool_heater),
        HeaterRow::from(&state.spa_heater),
    ];
    let heater_table = Table::new(heaters).with(Style::rounded()).to_string();

    let equipment: Vec<EquipmentRow> = state
        .equipment
        .iter()
        .map(|(element, on)| EquipmentRow {
            element: element.clone(),
            state: on_off(*on),
        })
        .collect();
    let equipment_table = Table::new(equipment).with(Style::rounded()).to_string();

    format!("{summary}\n\n{heater_table}\n\n{equipment_table}")
}

/// One-line summary used by `watch`.
pub fn pool_state_line(state: &PoolState) -> String {
    let heater = |t: &Thermostat| {
        format!(
            "{} {} (set {}, {}, {})",
            t.heater, t.current, t.setpoint, t.mode, t.status
        )
    };
    let equipment = state
        .equipment
        .iter()
        .map(|(element, on)| format!("{element}={}", on_off(*on)))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{}air {} | {} | {} | {equipment}",
        if state.reachable { "" } else { "[not responding] " },
        state.controller.air_temp,
        heater(&state.pool_heater),
        heater(&state.spa_heater),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use autelis_core::{TempUnit, Temperature, ThermostatMode};

    fn sample() -> PoolState {
        let mut state = PoolState {
            reachable: true,
            ..PoolState::default()
        };
        state.controller.air_temp = Temperature::new(71, TempUnit::Fahrenheit);
        state.pool_heater.current = Temperature::new(79, TempUnit::Fahrenheit);
        state.pool_heater.setpoint = Temperature::new(82, TempUnit::Fahrenheit);
        state.pool_heater.mode = ThermostatMode::Heat;
        state.equipment.insert("pump".into(), true);
        state.equipment.insert("aux1".into(), false);
        state
    }

    #[test]
    fn watch_line_lists_equipment_in_order() {
        let line = pool_state_line(&sample());
        assert!(line.starts_with("air 71"), "{line}");
        assert!(line.ends_with("pump=on aux1=off"), "{line}");
        assert!(line.contains("pool 79"), "{line}");
    }

    #[test]
    fn unreachable_state_is_flagged() {
        let state = PoolState {
            reachable: false,
            ..sample()
        };
        assert!(pool_state_line(&state).starts_with("[not responding]"));
        assert!(pool_state_detail(&state).contains("not responding"));
    }

    #[test]
    fn detail_view_has_heater_and_equipment_tables() {
        let detail = pool_state_detail(&sample());
        assert!(detail.contains("Pool Heater"));
        assert!(detail.contains("Spa Heater"));
        assert!(detail.contains("Equipment"));
        assert!(detail.contains("pump"));
    }

    #[test]
    fn config_default_applies_without_flag() {
        let defaults = Defaults {
            output: "json".into(),
            ..Defaults::default()
        };
        assert!(matches!(
            resolve_format(None, &defaults),
            OutputFormat::Json
        ));
        assert!(matches!(
            resolve_format(Some(&OutputFormat::Table), &defaults),
            OutputFormat::Table
        ));
    }
}
