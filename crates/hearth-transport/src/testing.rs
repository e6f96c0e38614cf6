//! In-memory transport for tests.
//!
//! Scripts inbound lines through a channel and captures everything the
//! client writes, so protocol and end-to-end tests run without a network.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use hearth_core::{Transport, TransportError, TransportResult};

/// A [`Transport`] backed by channels instead of a socket.
pub struct ChannelTransport {
    inbound: Mutex<mpsc::Receiver<String>>,
    written: mpsc::UnboundedSender<String>,
}

/// Test-side handle: feed lines in, observe writes out.
pub struct Wire {
    lines: mpsc::Sender<String>,
    written: mpsc::UnboundedReceiver<String>,
}

/// Creates a connected transport/wire pair.
pub fn channel_transport() -> (ChannelTransport, Wire) {
    let (lines_tx, lines_rx) = mpsc::channel(64);
    let (written_tx, written_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            inbound: Mutex::new(lines_rx),
            written: written_tx,
        },
        Wire {
            lines: lines_tx,
            written: written_rx,
        },
    )
}

impl Wire {
    /// Feeds one line to the transport, as if it arrived off the wire.
    pub async fn send_line(&self, line: impl Into<String>) {
        self.lines
            .send(line.into())
            .await
            .expect("transport dropped");
    }

    /// Waits for the next line the client wrote.
    pub async fn next_write(&mut self) -> String {
        self.written.recv().await.expect("transport dropped")
    }

    /// Returns the next written line if one is already queued.
    pub fn try_next_write(&mut self) -> Option<String> {
        self.written.try_recv().ok()
    }

    /// Closing the wire makes subsequent reads fail, like a dead socket
    /// with no retry budget.
    pub fn hang_up(self) {}
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn read_line(&self) -> TransportResult<String> {
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::ConnectionClosed {
                reason: "test wire hung up".into(),
            })
    }

    async fn write_line(&self, line: &str) -> TransportResult<()> {
        self.written
            .send(line.to_string())
            .map_err(|_| TransportError::SendFailed("test wire hung up".into()))
    }

    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_lines() {
        let (transport, mut wire) = channel_transport();
        wire.send_line("PING :tmi").await;
        assert_eq!(transport.read_line().await.unwrap(), "PING :tmi");

        transport.write_line("PONG :tmi").await.unwrap();
        assert_eq!(wire.next_write().await, "PONG :tmi");
    }

    #[tokio::test]
    async fn read_fails_after_hang_up() {
        let (transport, wire) = channel_transport();
        wire.hang_up();
        assert!(transport.read_line().await.is_err());
    }
}
