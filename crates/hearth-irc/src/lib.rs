//! # Hearth IRC
//!
//! The protocol client of the Hearth chat gateway: performs the connection
//! handshake over a [`Transport`](hearth_core::Transport), tokenizes and
//! classifies tag-annotated wire lines into typed [`Event`](hearth_core::Event)s,
//! and drains outbound chat messages back onto the wire.
//!
//! The client is a [`Plugin`](hearth_core::Plugin) in both roles: inbound
//! (parsed events flow into the bot) and outbound (broadcast chat messages
//! flow out as `PRIVMSG` lines).
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hearth_irc::{IrcClient, IrcConfig};
//!
//! let client = Arc::new(IrcClient::new(transport, IrcConfig {
//!     nick: "medgelabs".into(),
//!     token: std::env::var("TWITCH_TOKEN")?,
//!     channel: "medgelabs".into(),
//! }));
//! bot.register_plugin(client.as_ref())?;
//! client.start().await?;
//! ```

mod client;
mod message;

pub use client::{IrcClient, IrcConfig};
pub use message::Message;
