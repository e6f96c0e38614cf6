//! Collects poll votes from chat.

use std::sync::Arc;

use hearth_core::{Bot, BotResult};

/// Registers the poll vote collector.
///
/// While a poll is running, a chat message that is nothing but a number is
/// treated as a vote for that answer. `!poll` re-announces the current
/// standings. Everything else is ignored; vote validation (range, voter
/// dedup) lives in the bot itself.
pub fn register(bot: &Arc<Bot>) -> BotResult<()> {
    let bot_ref = Arc::clone(bot);
    bot.register_handler(move |event| {
        let bot = Arc::clone(&bot_ref);
        Box::pin(async move {
            if !event.is_chat() {
                return;
            }
            let contents = event.message().trim();

            if contents.starts_with("!poll") {
                if let Some(status) = bot.poll_status() {
                    let listing = status
                        .answers
                        .iter()
                        .enumerate()
                        .map(|(i, (label, count))| format!("{}) {}: {}", i + 1, label, count))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    bot.send_message(&format!("POLL: {} | {}", status.question, listing));
                }
                return;
            }

            if let Ok(index) = contents.parse::<usize>() {
                bot.add_poll_vote(event.sender(), index);
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_cache::Store;
    use hearth_core::{Event, OutboundPlugin};
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

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn numeric_chat_counts_as_a_vote() {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, mut rx) = mpsc::channel(8);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        register(&bot).unwrap();
        bot.start().unwrap();

        bot.start_poll(
            Duration::from_secs(60),
            "Tabs or spaces?",
            vec!["tabs".to_string(), "spaces".to_string()],
        )
        .unwrap();
        let _announcement = rx.recv().await.unwrap();

        let sink = bot.inbound_sink();
        sink.send(Event::chat("ann", "2")).await.unwrap();
        sink.send(Event::chat("bob", " 1 ")).await.unwrap();
        sink.send(Event::chat("cat", "two")).await.unwrap();
        settle().await;

        let status = bot.poll_status().unwrap();
        assert_eq!(status.answers[0].1, 1);
        assert_eq!(status.answers[1].1, 1);
    }

    #[tokio::test]
    async fn poll_command_reannounces_standings() {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, mut rx) = mpsc::channel(8);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        register(&bot).unwrap();
        bot.start().unwrap();

        bot.start_poll(
            Duration::from_secs(60),
            "Q?",
            vec!["x".to_string()],
        )
        .unwrap();
        let _announcement = rx.recv().await.unwrap();

        bot.inbound_sink()
            .send(Event::chat("ann", "!poll"))
            .await
            .unwrap();

        let message = rx.recv().await.unwrap().message().to_string();
        assert!(message.contains("Q?"));
        assert!(message.contains("1) x: 0"));
    }

    #[tokio::test]
    async fn votes_ignored_when_no_poll_running() {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, mut rx) = mpsc::channel(8);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        register(&bot).unwrap();
        bot.start().unwrap();

        bot.inbound_sink()
            .send(Event::chat("ann", "1"))
            .await
            .unwrap();
        bot.inbound_sink()
            .send(Event::chat("ann", "!poll"))
            .await
            .unwrap();
        settle().await;

        assert!(rx.try_recv().is_err());
        assert!(!bot.is_poll_running());
    }
}
