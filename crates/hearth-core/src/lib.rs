//! # Hearth Core
//!
//! The core engine of the Hearth chat gateway.
//!
//! This crate provides the domain event model, the transport abstraction the
//! protocol client builds on, and the central [`Bot`] dispatcher that fans
//! inbound events out to registered handlers and broadcasts outbound chat
//! messages to registered plugins.
//!
//! ## Data flow
//!
//! ```text
//! wire bytes ─▶ protocol client ─▶ Event ─▶ Bot inbound queue
//!                                              │ (single blocking fan-out)
//!                     ┌────────────────────────┼────────────────────────┐
//!                     ▼                        ▼                        ▼
//!               Handler mailbox          Handler mailbox          Handler mailbox
//!               (worker, FIFO)           (worker, FIFO)           (worker, FIFO)
//!                     │ may call Bot::send_message
//!                     ▼
//!               outbound broadcast ─▶ every registered outbound plugin
//! ```
//!
//! Handlers are registered before [`Bot::start`]; each gets a private
//! bounded mailbox and a dedicated worker, so a panicking or slow consumer
//! never takes the others down. A full mailbox applies backpressure to
//! the fan-out loop.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hearth_cache::Store;
//! use hearth_core::{Bot, Event};
//!
//! let bot = Arc::new(Bot::new(Store::in_memory(0)));
//! bot.register_handler(|event: Event| {
//!     Box::pin(async move {
//!         if let Event::Chat { sender, message } = event {
//!             println!("{sender}: {message}");
//!         }
//!     })
//! })?;
//! bot.start()?;
//! ```

mod bot;
mod error;
mod event;
mod plugin;
mod poll;
mod transport;

pub use bot::{Bot, HANDLER_MAILBOX_CAPACITY};
pub use error::{BotError, BotResult, TransportError, TransportResult};
pub use event::Event;
pub use plugin::{InboundPlugin, OutboundPlugin, Plugin};
pub use poll::PollStatus;
pub use transport::{BoxedTransport, Transport};

/// A boxed future, the return type of handler consumers.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;
