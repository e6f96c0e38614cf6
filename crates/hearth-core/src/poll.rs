//! Poll state machine: Idle → Running → Idle.
//!
//! The bot owns at most one running poll. Votes come in from chat (via the
//! runtime's poll collector handler), voters are deduplicated through the
//! bot's store, and closing (by timer or explicitly) announces every
//! answer tied at the maximum count.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::bot::Bot;
use crate::error::{BotError, BotResult};

/// Store key holding the comma-joined list of voters for the running poll.
const VOTERS_KEY: &str = "poll.voters";

/// In-flight poll state. Question plus parallel (label, count) pairs.
#[derive(Debug)]
pub(crate) struct ActivePoll {
    question: String,
    answers: Vec<(String, u64)>,
}

/// Read-only snapshot of the running poll, for dashboards and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStatus {
    pub question: String,
    pub answers: Vec<(String, u64)>,
}

impl Bot {
    /// Starts a poll and schedules its automatic close after `duration`.
    ///
    /// Invalid inputs while a poll is running surface as
    /// [`BotError::PollAlreadyRunning`]; the announcement message is
    /// broadcast to every outbound plugin on success.
    pub fn start_poll(
        self: &Arc<Self>,
        duration: Duration,
        question: impl Into<String>,
        answers: Vec<String>,
    ) -> BotResult<()> {
        let question = question.into();
        {
            let mut poll = self.poll.lock();
            if poll.is_some() {
                return Err(BotError::PollAlreadyRunning);
            }
            *poll = Some(ActivePoll {
                question: question.clone(),
                answers: answers.iter().map(|label| (label.clone(), 0)).collect(),
            });
        }

        let listing = answers
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}) {}", i + 1, label))
            .collect::<Vec<_>>()
            .join(" | ");
        self.send_message(&format!(
            "POLL: {question} | {listing} | vote with the answer number"
        ));

        // The timer is not cancellable; an explicit close may win the race,
        // in which case the timer fires on an idle poll and no-ops.
        let bot = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            bot.close_poll();
        });

        Ok(())
    }

    /// Records one vote for the 1-based answer `index`.
    ///
    /// Silently ignored when no poll is running, the index is out of range,
    /// or the voter already voted in this poll. Invalid votes are not
    /// errors; chat is full of them.
    pub fn add_poll_vote(&self, voter: &str, index: usize) {
        if !self.is_poll_running() {
            return;
        }

        let voted = self.store.get_or_default(VOTERS_KEY, "");
        if voted.split(',').any(|v| v == voter) {
            debug!(voter = %voter, "duplicate vote ignored");
            return;
        }

        {
            let mut poll = self.poll.lock();
            let Some(active) = poll.as_mut() else {
                return;
            };
            if index == 0 || index > active.answers.len() {
                return;
            }
            active.answers[index - 1].1 += 1;
        }

        self.store.append(VOTERS_KEY, ",", voter);
    }

    /// Closes the running poll, announcing the winner(s): every answer tied
    /// at the maximum count, or "no winner" if nobody voted. Safe no-op
    /// when no poll is running.
    pub fn close_poll(&self) {
        let Some(poll) = self.poll.lock().take() else {
            return;
        };

        let top = poll.answers.iter().map(|(_, count)| *count).max();
        match top {
            Some(max) if max > 0 => {
                let winners = poll
                    .answers
                    .iter()
                    .filter(|(_, count)| *count == max)
                    .map(|(label, _)| label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.send_message(&format!(
                    "Poll closed! Winner(s) with {max} votes: {winners}"
                ));
            }
            _ => self.send_message("Poll closed, no votes were cast, no winner"),
        }

        self.store.clear(VOTERS_KEY);
    }

    /// True while a poll is running.
    pub fn is_poll_running(&self) -> bool {
        self.poll.lock().is_some()
    }

    /// Snapshot of the running poll, if any.
    pub fn poll_status(&self) -> Option<PollStatus> {
        self.poll.lock().as_ref().map(|poll| PollStatus {
            question: poll.question.clone(),
            answers: poll.answers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::plugin::OutboundPlugin;
    use hearth_cache::Store;
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

    fn poll_bot() -> (Arc<Bot>, mpsc::Receiver<Event>) {
        let bot = Arc::new(Bot::new(Store::in_memory(0)));
        let (tx, rx) = mpsc::channel(16);
        bot.register_outbound_plugin(&ChatSink { tx }).unwrap();
        (bot, rx)
    }

    fn answers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[tokio::test]
    async fn only_one_poll_at_a_time() {
        let (bot, _rx) = poll_bot();
        bot.start_poll(Duration::from_secs(60), "Q?", answers(&["x", "y"]))
            .unwrap();

        let err = bot
            .start_poll(Duration::from_secs(60), "Again?", answers(&["z"]))
            .unwrap_err();
        assert_eq!(err, BotError::PollAlreadyRunning);
    }

    #[tokio::test]
    async fn announces_poll_on_start() {
        let (bot, mut rx) = poll_bot();
        bot.start_poll(Duration::from_secs(60), "Tabs or spaces?", answers(&["tabs", "spaces"]))
            .unwrap();

        let Event::Chat { message, .. } = rx.recv().await.unwrap() else {
            panic!("expected chat announcement");
        };
        assert!(message.contains("Tabs or spaces?"));
        assert!(message.contains("1) tabs"));
        assert!(message.contains("2) spaces"));
    }

    #[tokio::test]
    async fn ties_report_every_winner_and_duplicates_are_ignored() {
        let (bot, mut rx) = poll_bot();
        bot.start_poll(Duration::from_secs(60), "Q?", answers(&["x", "y"]))
            .unwrap();
        let _announcement = rx.recv().await.unwrap();

        bot.add_poll_vote("ann", 1);
        bot.add_poll_vote("bob", 1);
        bot.add_poll_vote("cat", 2);
        bot.add_poll_vote("dan", 2);
        // Ann already voted for answer 1; this must not count.
        bot.add_poll_vote("ann", 2);

        bot.close_poll();

        let Event::Chat { message, .. } = rx.recv().await.unwrap() else {
            panic!("expected close announcement");
        };
        assert!(message.contains("2 votes"), "message: {message}");
        assert!(message.contains("x"));
        assert!(message.contains("y"));
        assert!(!bot.is_poll_running());
    }

    #[tokio::test]
    async fn out_of_range_and_idle_votes_are_no_ops() {
        let (bot, mut rx) = poll_bot();

        // No poll running at all.
        bot.add_poll_vote("ann", 1);

        bot.start_poll(Duration::from_secs(60), "Q?", answers(&["x"]))
            .unwrap();
        let _announcement = rx.recv().await.unwrap();

        bot.add_poll_vote("ann", 0);
        bot.add_poll_vote("ann", 2);

        let status = bot.poll_status().unwrap();
        assert_eq!(status.answers, vec![("x".to_string(), 0)]);
    }

    #[tokio::test]
    async fn no_votes_announces_no_winner() {
        let (bot, mut rx) = poll_bot();
        bot.start_poll(Duration::from_secs(60), "Q?", answers(&["x"]))
            .unwrap();
        let _announcement = rx.recv().await.unwrap();

        bot.close_poll();
        let Event::Chat { message, .. } = rx.recv().await.unwrap() else {
            panic!("expected close announcement");
        };
        assert!(message.contains("no winner"));
    }

    #[tokio::test]
    async fn closing_an_idle_poll_is_safe() {
        let (bot, _rx) = poll_bot();
        // Twice: once idle, once after a timer-vs-explicit race would have
        // already emptied the state.
        bot.close_poll();
        bot.close_poll();
        assert!(!bot.is_poll_running());
    }

    #[tokio::test]
    async fn timer_closes_the_poll() {
        let (bot, mut rx) = poll_bot();
        bot.start_poll(Duration::from_millis(20), "Q?", answers(&["x"]))
            .unwrap();
        let _announcement = rx.recv().await.unwrap();

        let closed = rx.recv().await.unwrap();
        assert!(closed.message().contains("Poll closed"));
        assert!(!bot.is_poll_running());
    }

    #[tokio::test]
    async fn voter_list_resets_between_polls() {
        let (bot, mut rx) = poll_bot();
        bot.start_poll(Duration::from_secs(60), "Q?", answers(&["x"]))
            .unwrap();
        let _announcement = rx.recv().await.unwrap();
        bot.add_poll_vote("ann", 1);
        bot.close_poll();
        let _result = rx.recv().await.unwrap();

        bot.start_poll(Duration::from_secs(60), "Q2?", answers(&["x"]))
            .unwrap();
        let _announcement = rx.recv().await.unwrap();
        bot.add_poll_vote("ann", 1);

        let status = bot.poll_status().unwrap();
        assert_eq!(status.answers[0].1, 1);
    }
}
