//! `watch`: stay connected and print every state change until Ctrl-C.

use autelis_core::{ConnectionState, Controller, ControllerConfig, PoolState};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

fn render(state: &PoolState, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => output::pool_state_line(state),
        // One document per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(state)?,
    })
}

pub async fn handle(
    config: ControllerConfig,
    global: &GlobalOpts,
    format: &OutputFormat,
) -> Result<(), CliError> {
    let controller = Controller::new(config)?;
    controller.connect().await?;

    let mut states = controller.subscribe();
    let mut connection = controller.connection_state();

    output::print_output(&render(&states.borrow_and_update(), format)?, global.quiet);

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),

            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = states.borrow_and_update().clone();
                match render(&state, format) {
                    Ok(line) => output::print_output(&line, global.quiet),
                    Err(e) => break Err(e),
                }
            }

            changed = connection.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = connection.borrow_and_update().clone();
                match current {
                    ConnectionState::Reconnecting { attempt } => {
                        tracing::warn!(attempt, "push connection lost, retrying");
                    }
                    ConnectionState::Failed => {
                        break Err(CliError::ConnectionFailed {
                            address: controller.endpoint().http_url().to_string(),
                            reason: "controller stopped answering status requests".into(),
                        });
                    }
                    other => tracing::info!(state = ?other, "connection state changed"),
                }
            }
        }
    };

    controller.disconnect().await;
    result
}
