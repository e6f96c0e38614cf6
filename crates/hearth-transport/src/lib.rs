//! # Hearth Transport
//!
//! The network layer of the Hearth chat gateway: a WebSocket client
//! implementing the core [`Transport`](hearth_core::Transport) trait with
//! bounded linear-backoff reconnection and a post-reconnect replay hook for
//! restoring protocol state (re-authenticate, re-join) after every redial.
//!
//! The protocol client never learns about network failures that recovery
//! absorbed; it only sees an error once the retry budget is exhausted.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use hearth_transport::{WsConfig, WsConnection};
//!
//! let conn = WsConnection::new(WsConfig {
//!     url: "wss://irc-ws.chat.twitch.tv:443".into(),
//!     max_retries: 5,
//!     base_delay: Duration::from_secs(2),
//! });
//! conn.set_replay_hook(|| vec!["PASS ...".into(), "NICK ...".into()]);
//! conn.connect().await?;
//! ```

mod ws;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use ws::{WsConfig, WsConnection};
