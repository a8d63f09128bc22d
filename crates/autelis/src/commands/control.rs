//! Equipment and heater control handlers.

use autelis_core::{Command as CoreCommand, Controller, ControllerConfig};

use crate::cli::{EquipmentArgs, GlobalOpts, SetModeArgs, SetTempArgs};
use crate::error::CliError;

/// Run one command against a fresh connection; a refusal is an error.
async fn execute(config: ControllerConfig, cmd: CoreCommand) -> Result<(), CliError> {
    let element = match &cmd {
        CoreCommand::TurnOn { element } | CoreCommand::TurnOff { element } => element.clone(),
        CoreCommand::SetSetpoint { heater, .. } => heater.setpoint_element().to_owned(),
        CoreCommand::SetMode { heater, .. } => heater.address().to_owned(),
    };

    let accepted = Controller::oneshot(config, |controller| async move {
        controller.execute(cmd).await
    })
    .await?;

    if accepted {
        Ok(())
    } else {
        Err(CliError::CommandRejected { element })
    }
}

pub async fn turn(
    config: ControllerConfig,
    args: EquipmentArgs,
    on: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let element = args.element.to_lowercase();
    let cmd = if on {
        CoreCommand::TurnOn {
            element: element.clone(),
        }
    } else {
        CoreCommand::TurnOff {
            element: element.clone(),
        }
    };

    execute(config, cmd).await?;
    if !global.quiet {
        eprintln!("{element} turned {}", if on { "on" } else { "off" });
    }
    Ok(())
}

pub async fn set_temp(
    config: ControllerConfig,
    args: SetTempArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    execute(
        config,
        CoreCommand::SetSetpoint {
            heater: args.heater,
            degrees: args.degrees,
        },
    )
    .await?;
    if !global.quiet {
        eprintln!("{} setpoint set to {}", args.heater.label(), args.degrees);
    }
    Ok(())
}

pub async fn set_mode(
    config: ControllerConfig,
    args: SetModeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    execute(
        config,
        CoreCommand::SetMode {
            heater: args.heater,
            mode: args.mode,
        },
    )
    .await?;
    if !global.quiet {
        eprintln!("{} mode set to {}", args.heater.label(), args.mode);
    }
    Ok(())
}
