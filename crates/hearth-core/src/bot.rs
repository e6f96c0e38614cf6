//! The central event dispatcher.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use hearth_cache::Store;

use crate::BoxFuture;
use crate::error::{BotError, BotResult};
use crate::event::Event;
use crate::plugin::{InboundPlugin, OutboundPlugin, Plugin};
use crate::poll::ActivePoll;

/// Capacity of each handler's private mailbox. When a handler falls this far
/// behind, the fan-out loop blocks on it and backpressure reaches the
/// protocol read loop.
pub const HANDLER_MAILBOX_CAPACITY: usize = 10;

/// Capacity of the shared inbound queue and of each plugin's outbound sink.
const CHANNEL_CAPACITY: usize = 64;

type Consumer = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

/// One registered handler: a consumer function plus the private mailbox its
/// worker drains in FIFO order.
struct Handler {
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
    consumer: Consumer,
}

/// The bot core: single point of truth for who gets told what.
///
/// Handlers and plugins are registered first, then [`Bot::start`] spawns one
/// worker per handler and exactly one fan-out loop over the shared inbound
/// queue. Delivery to handler mailboxes happens in registration order and is
/// strictly FIFO per handler; there is no ordering guarantee *between*
/// handlers.
pub struct Bot {
    inbound_tx: mpsc::Sender<Event>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Event>>>,
    handlers: Mutex<Vec<Handler>>,
    inbound_ids: Mutex<HashSet<String>>,
    outbound_plugins: Mutex<HashMap<String, mpsc::Sender<Event>>>,
    started: AtomicBool,
    pub(crate) poll: Mutex<Option<ActivePoll>>,
    /// Constructor-injected store for stateful behaviors (poll voter dedup).
    pub(crate) store: Store,
}

impl Bot {
    /// Creates a bot backed by the given store.
    pub fn new(store: Store) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            handlers: Mutex::new(Vec::new()),
            inbound_ids: Mutex::new(HashSet::new()),
            outbound_plugins: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
            poll: Mutex::new(None),
            store,
        }
    }

    /// A clone of the shared inbound sink. Everything pushed into it flows
    /// through the full handler fan-out.
    pub fn inbound_sink(&self) -> mpsc::Sender<Event> {
        self.inbound_tx.clone()
    }

    /// Registers a consumer of inbound events. Each handler gets a private
    /// bounded mailbox and, once the bot starts, a dedicated worker.
    ///
    /// Fails with [`BotError::AlreadyListening`] after [`Bot::start`]; the
    /// fan-out loop captures the handler set when it launches.
    pub fn register_handler<F>(&self, consumer: F) -> BotResult<()>
    where
        F: Fn(Event) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        if self.started.load(Ordering::SeqCst) {
            return Err(BotError::AlreadyListening);
        }

        let (tx, rx) = mpsc::channel(HANDLER_MAILBOX_CAPACITY);
        self.handlers.lock().push(Handler {
            tx,
            rx,
            consumer: Arc::new(consumer),
        });
        Ok(())
    }

    /// Registers an inbound plugin and hands it the shared inbound sink.
    pub fn register_inbound_plugin(&self, plugin: &dyn InboundPlugin) -> BotResult<()> {
        let id = plugin.id().to_string();
        {
            let mut ids = self.inbound_ids.lock();
            if !ids.insert(id.clone()) {
                return Err(BotError::DuplicatePlugin { id });
            }
        }
        plugin.bind_inbound(self.inbound_tx.clone());
        debug!(plugin = %id, "inbound plugin registered");
        Ok(())
    }

    /// Registers an outbound plugin; every [`Bot::send_message`] broadcast
    /// is delivered to its sink.
    pub fn register_outbound_plugin(&self, plugin: &dyn OutboundPlugin) -> BotResult<()> {
        let id = plugin.id().to_string();
        let mut plugins = self.outbound_plugins.lock();
        if plugins.contains_key(&id) {
            return Err(BotError::DuplicatePlugin { id });
        }
        plugins.insert(id.clone(), plugin.outbound_sink());
        debug!(plugin = %id, "outbound plugin registered");
        Ok(())
    }

    /// Registers a plugin in both roles. Fails without side effect if the
    /// identity already exists in either registry.
    pub fn register_plugin(&self, plugin: &dyn Plugin) -> BotResult<()> {
        let id = InboundPlugin::id(plugin).to_string();
        if self.inbound_ids.lock().contains(&id)
            || self.outbound_plugins.lock().contains_key(&id)
        {
            return Err(BotError::DuplicatePlugin { id });
        }

        self.register_inbound_plugin(plugin)?;
        self.register_outbound_plugin(plugin)
    }

    /// Starts the dispatcher: one worker per registered handler, then the
    /// single fan-out loop over the shared inbound queue.
    ///
    /// The fan-out loop blocks on `recv()`, never a non-blocking poll, and
    /// delivers every event to each handler mailbox in registration order
    /// with a blocking send. One saturated handler therefore delays delivery
    /// to the rest.
    pub fn start(&self) -> BotResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BotError::AlreadyListening);
        }
        let mut inbound_rx = self
            .inbound_rx
            .lock()
            .take()
            .ok_or(BotError::AlreadyListening)?;

        let handlers: Vec<Handler> = self.handlers.lock().drain(..).collect();
        let mut mailboxes = Vec::with_capacity(handlers.len());

        for (index, handler) in handlers.into_iter().enumerate() {
            mailboxes.push(handler.tx);
            tokio::spawn(run_handler_worker(index, handler.rx, handler.consumer));
        }

        tokio::spawn(async move {
            while let Some(event) = inbound_rx.recv().await {
                for mailbox in &mailboxes {
                    if mailbox.send(event.clone()).await.is_err() {
                        warn!("handler mailbox closed; skipping delivery");
                    }
                }
            }
            debug!("inbound queue closed; fan-out loop exiting");
        });

        Ok(())
    }

    /// Broadcasts a chat message to every registered outbound plugin.
    ///
    /// Blank or whitespace-only text is silently dropped. Each plugin is fed
    /// on a detached task, so the caller never blocks and concurrent sends
    /// carry no global order.
    pub fn send_message(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let event = Event::chat("", text);
        for (id, sink) in self.outbound_plugins.lock().iter() {
            let id = id.clone();
            let sink = sink.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if sink.send(event).await.is_err() {
                    warn!(plugin = %id, "outbound plugin dropped its sink");
                }
            });
        }
    }

    /// Re-injects an event into the inbound queue so the full handler set
    /// processes it again. Used for command aliasing: a handler rewrites the
    /// message and loops it back through dispatch.
    pub fn receive_event(&self, event: Event) {
        let sink = self.inbound_tx.clone();
        tokio::spawn(async move {
            if sink.send(event).await.is_err() {
                warn!("inbound queue closed; re-injected event dropped");
            }
        });
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("handlers", &self.handlers.lock().len())
            .field("outbound_plugins", &self.outbound_plugins.lock().len())
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish()
    }
}

/// Drains one handler's mailbox in arrival order. A panicking consumer is
/// caught and logged so the worker keeps serving later events.
async fn run_handler_worker(
    index: usize,
    mut rx: mpsc::Receiver<Event>,
    consumer: Consumer,
) {
    while let Some(event) = rx.recv().await {
        let fut = std::panic::AssertUnwindSafe((consumer)(event)).catch_unwind();
        if fut.await.is_err() {
            error!(handler = index, "handler panicked; continuing");
        }
    }
}
