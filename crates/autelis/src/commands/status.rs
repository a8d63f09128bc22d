//! `status`: one poll, printed.

use autelis_core::{Controller, ControllerConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: ControllerConfig,
    global: &GlobalOpts,
    format: &OutputFormat,
) -> Result<(), CliError> {
    let state = Controller::oneshot(config, |controller| async move { Ok(controller.state()) }).await?;

    let rendered = output::render_single(format, &state, output::pool_state_detail)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
