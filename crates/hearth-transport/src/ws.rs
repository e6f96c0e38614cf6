//! Reconnecting WebSocket client.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use hearth_core::{Transport, TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Lines to re-issue after every successful reconnect, e.g. the full IRC
/// handshake. Re-evaluated per reconnect so rotated credentials are picked
/// up.
type ReplayHook = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Connection and retry settings.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket endpoint, e.g. `wss://irc-ws.chat.twitch.tv:443`.
    pub url: String,
    /// Reconnect attempts before a read/write error is surfaced.
    /// Zero disables reconnection entirely.
    pub max_retries: u32,
    /// Backoff is linear: attempt `n` sleeps `n * base_delay`.
    pub base_delay: Duration,
}

/// A WebSocket connection that survives transient failures.
///
/// By contract exactly one task reads; writes may come from several tasks
/// and are serialized on the writer lock. Reconnection is reader-owned: a
/// reconnect performed on the write path installs the fresh writer half and
/// parks the fresh reader half in a pending slot the reader adopts on its
/// next failure, so the two paths never wait on each other.
pub struct WsConnection {
    config: WsConfig,
    reader: Mutex<ReaderState>,
    writer: Mutex<Option<WsSink>>,
    pending_reader: parking_lot::Mutex<Option<WsSource>>,
    replay: parking_lot::Mutex<Option<ReplayHook>>,
}

struct ReaderState {
    source: Option<WsSource>,
    /// One WebSocket frame may batch several protocol lines.
    buffered: VecDeque<String>,
}

impl WsConnection {
    /// Creates the container without connecting. Call [`connect`] when
    /// ready to dial.
    ///
    /// [`connect`]: WsConnection::connect
    pub fn new(config: WsConfig) -> Self {
        Self {
            config,
            reader: Mutex::new(ReaderState {
                source: None,
                buffered: VecDeque::new(),
            }),
            writer: Mutex::new(None),
            pending_reader: parking_lot::Mutex::new(None),
            replay: parking_lot::Mutex::new(None),
        }
    }

    /// Registers the post-reconnect replay hook. The returned lines are
    /// written to every fresh connection before reads or writes resume.
    pub fn set_replay_hook<F>(&self, hook: F)
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        *self.replay.lock() = Some(Arc::new(hook));
    }

    /// Dials the configured endpoint.
    pub async fn connect(&self) -> TransportResult<()> {
        info!(url = %self.config.url, "connecting");
        let (sink, source) = dial(&self.config.url).await?;
        self.reader.lock().await.source = Some(source);
        *self.writer.lock().await = Some(sink);
        Ok(())
    }

    fn replay_lines(&self) -> Vec<String> {
        self.replay.lock().as_ref().map(|hook| hook()).unwrap_or_default()
    }

    /// Dials a fresh connection and replays protocol state onto it.
    /// Returns both halves; the caller decides where each one goes.
    async fn redial(&self) -> TransportResult<(WsSink, WsSource)> {
        let (mut sink, source) = dial(&self.config.url).await?;
        for line in self.replay_lines() {
            sink.send(Message::text(line)).await.map_err(|err| {
                TransportError::SendFailed(format!("replay after reconnect: {err}"))
            })?;
        }
        Ok((sink, source))
    }

    /// Retry loop shared by the read and write paths: sleep
    /// `attempt * base_delay`, redial, replay. Returns the last error once
    /// the budget is exhausted.
    async fn reconnect_with_backoff(&self) -> TransportResult<(WsSink, WsSource)> {
        let max = self.config.max_retries;
        let mut last = TransportError::ConnectionClosed {
            reason: "no reconnect attempts configured".into(),
        };

        for attempt in 1..=max {
            tokio::time::sleep(self.config.base_delay * attempt).await;
            warn!(attempt, max, url = %self.config.url, "reconnecting");
            match self.redial().await {
                Ok(halves) => {
                    info!(attempt, "reconnected");
                    return Ok(halves);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "reconnect attempt failed");
                    last = err;
                }
            }
        }

        Err(last)
    }

    /// Handles a read failure: adopt a reader half parked by a write-path
    /// reconnect if one exists, otherwise reconnect here and install the
    /// fresh writer half too.
    async fn recover_reader(&self, state: &mut ReaderState) -> TransportResult<()> {
        if let Some(fresh) = self.pending_reader.lock().take() {
            debug!("adopting reader half from write-path reconnect");
            state.source = Some(fresh);
            return Ok(());
        }

        if self.config.max_retries == 0 {
            return Err(TransportError::ConnectionClosed {
                reason: "connection lost and reconnection is disabled".into(),
            });
        }

        let (sink, source) = self.reconnect_with_backoff().await?;
        *self.writer.lock().await = Some(sink);
        state.source = Some(source);
        Ok(())
    }
}

#[async_trait]
impl Transport for WsConnection {
    /// Reads one protocol line, reconnecting on failure until the retry
    /// budget runs out.
    async fn read_line(&self) -> TransportResult<String> {
        let mut state = self.reader.lock().await;

        loop {
            if let Some(line) = state.buffered.pop_front() {
                return Ok(line);
            }

            let source = state.source.as_mut().ok_or(TransportError::NotConnected)?;
            match source.next().await {
                Some(Ok(Message::Text(text))) => {
                    state
                        .buffered
                        .extend(text.lines().filter(|l| !l.is_empty()).map(str::to_string));
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data);
                    state
                        .buffered
                        .extend(text.lines().filter(|l| !l.is_empty()).map(str::to_string));
                }
                Some(Ok(Message::Ping(payload))) => {
                    // Socket-level keepalive, below the protocol.
                    if let Some(sink) = self.writer.lock().await.as_mut() {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | Some(Ok(Message::Frame(_))) | None => {
                    warn!("connection closed by peer");
                    state.source = None;
                    self.recover_reader(&mut state).await?;
                }
                Some(Err(err)) => {
                    warn!(error = %err, "read failed");
                    state.source = None;
                    self.recover_reader(&mut state).await?;
                }
            }
        }
    }

    /// Writes one line, reconnecting on failure until the retry budget runs
    /// out. A write that exhausts its retries is dropped with an error
    /// returned; it is not replayed on the next connection.
    async fn write_line(&self, line: &str) -> TransportResult<()> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(TransportError::NotConnected)?;

        let first_try = sink.send(Message::text(line.to_string())).await;
        let Err(err) = first_try else {
            return Ok(());
        };

        warn!(error = %err, "write failed");
        if self.config.max_retries == 0 {
            return Err(TransportError::SendFailed(err.to_string()));
        }

        // Reconnect on the write path; the reader adopts the fresh read
        // half from the pending slot on its next failure.
        let (mut sink, source) = self.reconnect_with_backoff().await?;
        let result = sink
            .send(Message::text(line.to_string()))
            .await
            .map_err(|err| TransportError::SendFailed(err.to_string()));
        *writer = Some(sink);
        *self.pending_reader.lock() = Some(source);
        result
    }

    /// Closes the connection. Idempotent: closing a never-opened or
    /// already-closed connection succeeds.
    async fn close(&self) -> TransportResult<()> {
        let mut writer = self.writer.lock().await;
        if let Some(sink) = writer.as_mut() {
            let _ = sink.close().await;
        }
        *writer = None;
        self.reader.lock().await.source = None;
        Ok(())
    }
}

async fn dial(url: &str) -> TransportResult<(WsSink, WsSource)> {
    let (stream, _response) =
        connect_async(url)
            .await
            .map_err(|err| TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
    Ok(stream.split())
}
