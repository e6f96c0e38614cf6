//! Welcomes first-time chatters.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use hearth_cache::Store;
use hearth_core::{Bot, BotResult};

use crate::config::GreeterConfig;
use crate::template::MessageTemplate;

/// Registers the greeter handler.
///
/// A chatter is greeted once per ledger lifetime: the store remembers who
/// has been seen, so a file-backed store keeps the memory across restarts.
/// The welcome is delayed a little so it lands after the user's first
/// message settles in chat.
pub fn register(bot: &Arc<Bot>, store: Store, config: &GreeterConfig) -> BotResult<()> {
    let template = MessageTemplate::new(&config.template);
    let delay = Duration::from_secs(config.delay_seconds);
    let bot_ref = Arc::clone(bot);

    bot.register_handler(move |event| {
        let bot = Arc::clone(&bot_ref);
        let store = store.clone();
        let template = template.clone();
        Box::pin(async move {
            if !event.is_chat() {
                return;
            }
            let sender = event.sender();
            if sender.is_empty() || !store.absent(sender) {
                return;
            }
            store.put(sender, "greeted");
            debug!(chatter = %sender, "first-time chatter");

            tokio::time::sleep(delay).await;
            bot.send_message(&template.render(&event));
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GreeterConfig;
    use hearth_core::Event;
    use hearth_core::OutboundPlugin;
    use tokio::sync::mpsc;

    struct ChatSink {
        tx: mpsc::Sender<Event>,
    }

    impl OutboundPlugin for ChatSink {
        fn id(&self) -> &str {
            "chat"
        }

        fn outbound_sink(&self) -> mpsc::Sender<Event> {
            self.tx.clone()
        }
    }

    fn config() -> GreeterConfig {
        GreeterConfig {
            enabled: true,
            template: "Welcome @{sender}!".to_string(),
            delay_seconds: 0,
            ttl_seconds: 0,
        }
    }

    #[tokio::test]
    async fn greets_each_chatter_exactly_once() {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, mut rx) = mpsc::channel(8);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        register(&bot, Store::in_memory(0), &config()).unwrap();
        bot.start().unwrap();

        let sink = bot.inbound_sink();
        sink.send(Event::chat("ann", "hello")).await.unwrap();
        sink.send(Event::chat("ann", "hello again")).await.unwrap();
        sink.send(Event::chat("bob", "hi")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Event::chat("", "Welcome @ann!"));
        assert_eq!(rx.recv().await.unwrap(), Event::chat("", "Welcome @bob!"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ignores_non_chat_and_anonymous_events() {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, mut rx) = mpsc::channel(8);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        register(&bot, Store::in_memory(0), &config()).unwrap();
        bot.start().unwrap();

        let sink = bot.inbound_sink();
        sink.send(Event::raid("ann", 5)).await.unwrap();
        sink.send(Event::chat("", "system notice")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }
}
