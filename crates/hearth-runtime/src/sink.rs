//! Outbound plugin that mirrors broadcasts as JSON log lines.

use tokio::sync::mpsc;
use tracing::{info, warn};

use hearth_core::{Event, OutboundPlugin};

const SINK_CAPACITY: usize = 64;

/// An outbound plugin that serializes every broadcast event to JSON and
/// logs it. Handy alongside the real chat plugin when verifying what the
/// bot would say without watching the channel.
pub struct LogSink {
    tx: mpsc::Sender<Event>,
}

impl LogSink {
    /// Creates the sink and spawns its drain task.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::channel::<Event>(SINK_CAPACITY);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "hearth::sink", %json, "outbound event"),
                    Err(err) => warn!(error = %err, "failed to serialize outbound event"),
                }
            }
        });
        Self { tx }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundPlugin for LogSink {
    fn id(&self) -> &str {
        "log-sink"
    }

    fn outbound_sink(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }
}
