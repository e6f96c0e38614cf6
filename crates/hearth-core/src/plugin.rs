//! Plugin roles at the system boundary.
//!
//! Plugins differ from handlers: they sit at the edge of the system
//! (the chat connection itself, dashboards, alert overlays) rather than
//! implementing feature logic. The two capability roles are modeled as two
//! small traits so a concrete integration can implement just the role(s)
//! it needs; the [`Plugin`] marker covers integrations that do both, like
//! the protocol client.

use tokio::sync::mpsc;

use crate::event::Event;

/// A plugin that produces events into the bot.
///
/// At registration the bot hands the plugin a clone of the shared inbound
/// sink; everything the plugin pushes into it flows through the full
/// handler fan-out.
pub trait InboundPlugin: Send + Sync {
    /// Stable identity, used for the duplicate-registration check.
    fn id(&self) -> &str;

    /// Wires the bot's inbound sink into the plugin.
    fn bind_inbound(&self, sink: mpsc::Sender<Event>);
}

/// A plugin that consumes events the bot broadcasts outward.
pub trait OutboundPlugin: Send + Sync {
    /// Stable identity, used for the duplicate-registration check.
    fn id(&self) -> &str;

    /// The sink the bot should broadcast outbound events into.
    fn outbound_sink(&self) -> mpsc::Sender<Event>;
}

/// A plugin implementing both roles.
pub trait Plugin: InboundPlugin + OutboundPlugin {}

impl<T: InboundPlugin + OutboundPlugin> Plugin for T {}
