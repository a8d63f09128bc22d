//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod status;
pub mod watch;

use autelis_core::ControllerConfig;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    global: &GlobalOpts,
    format: &OutputFormat,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(config, global, format).await,
        Command::On(args) => control::turn(config, args, true, global).await,
        Command::Off(args) => control::turn(config, args, false, global).await,
        Command::SetTemp(args) => control::set_temp(config, args, global).await,
        Command::SetMode(args) => control::set_mode(config, args, global).await,
        Command::Watch => watch::handle(config, global, format).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
