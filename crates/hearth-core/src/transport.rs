//! Transport abstraction underlying the protocol client.
//!
//! The trait lives here so the protocol client stays agnostic of both the
//! concrete network stack and the reconnect policy: `hearth-transport`
//! implements it over a reconnecting WebSocket, tests implement it over
//! in-memory channels.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportResult;

/// A persistent, line-oriented byte-stream connection.
///
/// Contract: exactly one task reads at a time; writes may come from several
/// tasks but the implementation serializes them. Transient failures are the
/// implementation's problem (bounded retry, reconnect, protocol-state
/// replay); callers only see an error once recovery is exhausted.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reads one frame/line. Blocks until data arrives or recovery fails.
    async fn read_line(&self) -> TransportResult<String>;

    /// Writes one frame/line. Serialized with any concurrent writers.
    async fn write_line(&self, line: &str) -> TransportResult<()>;

    /// Releases the connection. Idempotent.
    async fn close(&self) -> TransportResult<()>;
}

/// A shared, type-erased transport.
pub type BoxedTransport = Arc<dyn Transport>;
