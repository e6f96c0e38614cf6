//! Canned chat command responses.

use std::sync::Arc;

use hearth_core::{Bot, BotResult};

use crate::config::CommandsConfig;
use crate::template::MessageTemplate;

/// Built-in prefix that lists every known command.
const LIST_PREFIX: &str = "!commands";

/// Registers the command handler.
///
/// A chat message matches a command when it starts with the command's
/// prefix. `!commands` is always available and lists the configured
/// prefixes.
pub fn register(bot: &Arc<Bot>, config: &CommandsConfig) -> BotResult<()> {
    let known: Vec<(String, MessageTemplate)> = config
        .known
        .iter()
        .map(|spec| (spec.prefix.clone(), MessageTemplate::new(&spec.template)))
        .collect();

    let listing = {
        let mut prefixes: Vec<&str> = known.iter().map(|(p, _)| p.as_str()).collect();
        prefixes.push(LIST_PREFIX);
        format!("Available commands: {}", prefixes.join(", "))
    };

    let bot_ref = Arc::clone(bot);
    bot.register_handler(move |event| {
        let bot = Arc::clone(&bot_ref);
        let known = known.clone();
        let listing = listing.clone();
        Box::pin(async move {
            if !event.is_chat() {
                return;
            }
            let contents = event.message().trim();

            if contents.starts_with(LIST_PREFIX) {
                bot.send_message(&listing);
                return;
            }
            for (prefix, template) in &known {
                if contents.starts_with(prefix.as_str()) {
                    bot.send_message(&template.render(&event));
                    return;
                }
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandSpec;
    use hearth_core::{Event, OutboundPlugin};
    use hearth_cache::Store;
    use std::time::Duration;
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

    fn command_bot(specs: Vec<CommandSpec>) -> (Arc<Bot>, mpsc::Receiver<Event>) {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, rx) = mpsc::channel(8);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        register(
            &bot,
            &CommandsConfig {
                enabled: true,
                known: specs,
            },
        )
        .unwrap();
        bot.start().unwrap();
        (bot, rx)
    }

    #[tokio::test]
    async fn responds_to_matching_prefix() {
        let (bot, mut rx) = command_bot(vec![CommandSpec {
            prefix: "!discord".to_string(),
            template: "Join us at example.com/discord".to_string(),
        }]);

        bot.inbound_sink()
            .send(Event::chat("ann", "!discord please"))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap().message(),
            "Join us at example.com/discord"
        );
    }

    #[tokio::test]
    async fn lists_known_commands() {
        let (bot, mut rx) = command_bot(vec![CommandSpec {
            prefix: "!discord".to_string(),
            template: "x".to_string(),
        }]);

        bot.inbound_sink()
            .send(Event::chat("ann", "!commands"))
            .await
            .unwrap();

        let message = rx.recv().await.unwrap().message().to_string();
        assert!(message.contains("!discord"));
        assert!(message.contains("!commands"));
    }

    #[tokio::test]
    async fn unmatched_chat_is_silent() {
        let (bot, mut rx) = command_bot(vec![CommandSpec {
            prefix: "!discord".to_string(),
            template: "x".to_string(),
        }]);

        bot.inbound_sink()
            .send(Event::chat("ann", "just chatting"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }
}
