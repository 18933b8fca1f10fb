//! Command implementations

pub mod envelopes;

use std::time::Duration;

use tracing::debug;

use atelier_protocol::{Envelope, MessageKind, ToolStatus};
use atelier_utils::Result;

use crate::cli::{Cli, Command};
use crate::client::Client;

/// Build the envelope a command sends
pub fn build(command: &Command) -> Result<Envelope> {
    match command {
        Command::Preview { url } => Ok(envelopes::preview(url)),
        Command::Design { input } => envelopes::design(input),
        Command::Image {
            path,
            name,
            width,
            height,
        } => envelopes::image(path, name.as_deref(), *width, *height),
        Command::Asset { path, asset_base } => envelopes::asset(path, asset_base),
        Command::Script { path } => envelopes::script(path),
        Command::Tool { tool, action, data } => envelopes::tool(tool, action, data.as_deref()),
        Command::Chat { text } => Ok(envelopes::chat(text)),
    }
}

/// Execute a CLI command, returning the process exit code
pub async fn execute(cli: Cli) -> Result<i32> {
    let envelope = build(&cli.command)?;

    let mut client = Client::connect(&cli.addr).await?;
    client.send(&envelope).await?;
    println!("Sent {} to {}", envelope.msg_type, cli.addr);

    if let Some(secs) = cli.wait {
        client
            .watch(Duration::from_secs(secs), |env| println!("{}", describe(&env)))
            .await?;
    }

    if let Err(e) = client.close().await {
        debug!("Close failed: {}", e);
    }
    Ok(0)
}

/// One-line rendering of a received envelope
pub fn describe(envelope: &Envelope) -> String {
    if envelope.kind() == MessageKind::ToolStatus {
        if let Some(status) = ToolStatus::from_payload(&envelope.payload) {
            return format!(
                "[{}] {}: {}",
                status.tool,
                status.status.as_str(),
                status.message
            );
        }
    }
    format!("{} {}", envelope.msg_type, envelope.payload)
}
