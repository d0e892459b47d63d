//! Host shell: start/close commands in, finished/failed/closed events out.

use crate::document::DocumentFormat;
use crate::session::{ChartOutcome, ChartSession};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    StartBuild { text: String },
    Close,
}

#[derive(Debug)]
pub enum HostEvent {
    Finished(Box<ChartOutcome>),
    Failed(String),
    Closed,
}

#[derive(Debug)]
pub struct HostHandle {
    pub commands: mpsc::UnboundedSender<HostCommand>,
    pub events: mpsc::UnboundedReceiver<HostEvent>,
}

/// Spawns the host loop on the current runtime.
pub fn spawn_host(session: ChartSession, format: DocumentFormat) -> HostHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_host(session, format, command_rx, event_tx));
    HostHandle {
        commands: command_tx,
        events: event_rx,
    }
}

/// Serves commands until a build finishes or the host is closed. A failed build
/// leaves the host open for another attempt. Closing mid-build drops the build,
/// which aborts its outstanding avatar lookups.
pub async fn run_host(
    mut session: ChartSession,
    format: DocumentFormat,
    mut commands: mpsc::UnboundedReceiver<HostCommand>,
    events: mpsc::UnboundedSender<HostEvent>,
) {
    while let Some(command) = commands.recv().await {
        let text = match command {
            HostCommand::Close => break,
            HostCommand::StartBuild { text } => text,
        };

        let result = {
            let build = session.build(&text, format);
            tokio::pin!(build);
            loop {
                tokio::select! {
                    result = &mut build => break Some(result),
                    command = commands.recv() => match command {
                        Some(HostCommand::StartBuild { .. }) => {
                            tracing::warn!("build already running, ignoring start request");
                        }
                        Some(HostCommand::Close) | None => {
                            tracing::info!("host closed during build");
                            break None;
                        }
                    },
                }
            }
        };

        match result {
            Some(Ok(outcome)) => {
                let _ = events.send(HostEvent::Finished(Box::new(outcome)));
                return;
            }
            Some(Err(err)) => {
                tracing::error!(error = %err, "chart build failed");
                let _ = events.send(HostEvent::Failed(err.to_string()));
            }
            None => break,
        }
    }
    let _ = events.send(HostEvent::Closed);
}
