use agora::cli::{actions, actions::Action, start, telemetry};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args, set up logging, and resolve the action to run
    let action = start()?;

    // Handle the action
    match action {
        Action::Server { .. } => actions::server::handle(action).await?,
    }

    telemetry::shutdown_tracer();

    Ok(())
}
