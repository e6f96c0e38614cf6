//! The protocol client: handshake, classification, outbound drain.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use hearth_core::{
    BoxedTransport, Event, InboundPlugin, OutboundPlugin, TransportResult,
};

use crate::message::Message;

/// Capacity of the outbound chat mailbox the bot broadcasts into.
const OUTBOUND_CAPACITY: usize = 64;

/// Identity, credential, and target channel for the handshake.
#[derive(Debug, Clone)]
pub struct IrcConfig {
    /// Nickname to authenticate as.
    pub nick: String,
    /// OAuth credential, sent as `PASS`.
    pub token: String,
    /// Channel to join, with or without the leading `#`.
    pub channel: String,
}

impl IrcConfig {
    /// Channel with the leading `#` guaranteed.
    fn channel_tag(&self) -> String {
        if self.channel.starts_with('#') {
            self.channel.clone()
        } else {
            format!("#{}", self.channel)
        }
    }
}

/// Recognized `USERNOTICE` subtypes, keyed by the `msg-id` tag. The set is
/// closed; everything else lands in `Unrecognized` and is dropped with a
/// log line.
#[derive(Debug, PartialEq, Eq)]
enum NoticeKind {
    Raid,
    Sub,
    Resub,
    SubGift,
    Unrecognized(String),
}

impl NoticeKind {
    fn from_msg_id(msg_id: &str) -> Self {
        match msg_id {
            "raid" => Self::Raid,
            "sub" => Self::Sub,
            "resub" => Self::Resub,
            "subgift" => Self::SubGift,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// What one inbound line amounts to.
enum Classified {
    /// Heartbeat probe; answer with `PONG <payload>`, emit nothing.
    Heartbeat(String),
    /// A domain event for the bot.
    Event(Event),
    /// Recognized noise (capability acks, unknown notices); dropped.
    Ignored,
}

/// The protocol client.
///
/// Owns the handshake, the single read loop over the transport, and the
/// outbound drain loop. Registers with the bot in both plugin roles under
/// the identity `"irc"`.
pub struct IrcClient {
    transport: BoxedTransport,
    config: IrcConfig,
    /// Bot inbound sink, wired at plugin registration.
    inbound: parking_lot::Mutex<Option<mpsc::Sender<Event>>>,
    outbound_tx: mpsc::Sender<Event>,
    outbound_rx: parking_lot::Mutex<Option<mpsc::Receiver<Event>>>,
}

impl IrcClient {
    /// Creates a client over the given transport. Nothing is written until
    /// [`IrcClient::start`].
    pub fn new(transport: BoxedTransport, config: IrcConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        Self {
            transport,
            config,
            inbound: parking_lot::Mutex::new(None),
            outbound_tx,
            outbound_rx: parking_lot::Mutex::new(Some(outbound_rx)),
        }
    }

    /// The full handshake, in mandated order: credential, identity, join,
    /// then the two capability requests for tagged metadata and system
    /// notices.
    ///
    /// Also suitable as the transport's post-reconnect replay hook.
    pub fn handshake_lines(&self) -> Vec<String> {
        vec![
            format!("PASS {}", self.config.token),
            format!("NICK {}", self.config.nick),
            format!("JOIN {}", self.config.channel_tag()),
            "CAP REQ :twitch.tv/commands".to_string(),
            "CAP REQ :twitch.tv/tags".to_string(),
        ]
    }

    /// Performs the handshake, then launches the read loop and the outbound
    /// drain loop.
    ///
    /// A handshake write failure is fatal and propagated immediately;
    /// retrying with a stale credential is pointless. The spawned loops run
    /// until the transport's retry budget is exhausted or the bot goes away.
    pub async fn start(self: &Arc<Self>) -> TransportResult<()> {
        let Some(mut outbound_rx) = self.outbound_rx.lock().take() else {
            warn!("client already started");
            return Ok(());
        };

        for line in self.handshake_lines() {
            self.transport.write_line(&line).await?;
        }
        info!(channel = %self.config.channel_tag(), "handshake complete");

        let client = Arc::clone(self);
        tokio::spawn(async move {
            client.read_loop().await;
        });

        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                client.drain_outbound(event).await;
            }
        });

        Ok(())
    }

    /// Sends one chat message to the channel. Retry and reconnect are the
    /// transport's concern.
    pub async fn send(&self, channel: &str, text: &str) -> TransportResult<()> {
        self.transport
            .write_line(&format!("PRIVMSG {channel} :{text}"))
            .await
    }

    /// Single reader of the transport. Terminates when the transport gives
    /// up recovering; the rest of the system keeps running and simply sees
    /// no new events.
    async fn read_loop(&self) {
        loop {
            let line = match self.transport.read_line().await {
                Ok(line) => line,
                Err(err) => {
                    error!(error = %err, "read loop terminating");
                    return;
                }
            };
            self.handle_line(&line).await;
        }
    }

    async fn handle_line(&self, line: &str) {
        match classify(&Message::parse(line)) {
            Classified::Heartbeat(payload) => {
                debug!("heartbeat probe, answering");
                if let Err(err) = self
                    .transport
                    .write_line(&format!("PONG :{payload}"))
                    .await
                {
                    warn!(error = %err, "failed to answer heartbeat");
                }
            }
            Classified::Event(event) => {
                let sink = self.inbound.lock().clone();
                match sink {
                    Some(sink) => {
                        if sink.send(event).await.is_err() {
                            warn!("bot inbound queue closed; event dropped");
                        }
                    }
                    None => warn!("no inbound sink bound; event dropped"),
                }
            }
            Classified::Ignored => {}
        }
    }

    /// Outbound drain: each broadcast chat event becomes one `PRIVMSG`.
    async fn drain_outbound(&self, event: Event) {
        match event {
            Event::Chat { message, .. } => {
                if let Err(err) = self.send(&self.config.channel_tag(), &message).await {
                    warn!(error = %err, "outbound chat message dropped");
                }
            }
            other => debug!(event = ?other, "non-chat event on outbound path; skipped"),
        }
    }
}

impl InboundPlugin for IrcClient {
    fn id(&self) -> &str {
        "irc"
    }

    fn bind_inbound(&self, sink: mpsc::Sender<Event>) {
        *self.inbound.lock() = Some(sink);
    }
}

impl OutboundPlugin for IrcClient {
    fn id(&self) -> &str {
        "irc"
    }

    fn outbound_sink(&self) -> mpsc::Sender<Event> {
        self.outbound_tx.clone()
    }
}

/// Classifies one parsed line.
fn classify(msg: &Message) -> Classified {
    match msg.command.as_str() {
        "PING" => Classified::Heartbeat(msg.trailing.clone()),

        // PRIVMSG with a bits tag is a cheer; otherwise a chat message.
        "PRIVMSG" => {
            if !msg.tag("bits").is_empty() {
                let sender = if msg.tag("display-name").is_empty() {
                    msg.user.clone()
                } else {
                    msg.tag("display-name").to_string()
                };
                Classified::Event(Event::bits_cheer(
                    sender,
                    numeric_tag(msg, "bits"),
                ))
            } else {
                Classified::Event(Event::chat(msg.user.clone(), msg.trailing.clone()))
            }
        }

        "USERNOTICE" => match NoticeKind::from_msg_id(msg.tag("msg-id")) {
            NoticeKind::Raid => Classified::Event(Event::raid(
                msg.tag("msg-param-displayName"),
                numeric_tag(msg, "msg-param-viewerCount"),
            )),
            NoticeKind::Sub | NoticeKind::Resub => Classified::Event(Event::subscription(
                msg.tag("display-name"),
                numeric_tag(msg, "msg-param-cumulative-months"),
            )),
            NoticeKind::SubGift => Classified::Event(Event::gift_sub(
                msg.tag("display-name"),
                msg.tag("msg-param-recipient-display-name"),
            )),
            NoticeKind::Unrecognized(kind) => {
                debug!(msg_id = %kind, line = %msg, "unrecognized system notice dropped");
                Classified::Ignored
            }
        },

        other => {
            debug!(command = %other, "unhandled command dropped");
            Classified::Ignored
        }
    }
}

/// Parses a numeric tag, defaulting to 0 with a warning on garbage. A bad
/// count must never crash the read loop.
fn numeric_tag(msg: &Message, name: &str) -> u64 {
    let raw = msg.tag(name);
    raw.parse().unwrap_or_else(|_| {
        warn!(tag = %name, value = %raw, "non-numeric tag value, defaulting to 0");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_transport::testing::{Wire, channel_transport};

    fn test_client() -> (Arc<IrcClient>, Wire) {
        let (transport, wire) = channel_transport();
        let client = Arc::new(IrcClient::new(
            Arc::new(transport),
            IrcConfig {
                nick: "medgelabs".into(),
                token: "oauth:secret".into(),
                channel: "medgelabs".into(),
            },
        ));
        (client, wire)
    }

    /// Starts the client with a bound inbound sink, returning the event
    /// receiver.
    async fn started_client() -> (Arc<IrcClient>, Wire, mpsc::Receiver<Event>) {
        let (client, wire) = test_client();
        let (tx, rx) = mpsc::channel(16);
        client.bind_inbound(tx);
        client.start().await.unwrap();
        (client, wire, rx)
    }

    #[tokio::test]
    async fn handshake_is_ordered() {
        let (_client, mut wire, _rx) = started_client().await;

        assert_eq!(wire.next_write().await, "PASS oauth:secret");
        assert_eq!(wire.next_write().await, "NICK medgelabs");
        assert_eq!(wire.next_write().await, "JOIN #medgelabs");
        assert_eq!(wire.next_write().await, "CAP REQ :twitch.tv/commands");
        assert_eq!(wire.next_write().await, "CAP REQ :twitch.tv/tags");
    }

    #[tokio::test]
    async fn heartbeat_is_answered_without_an_event() {
        let (_client, mut wire, mut rx) = started_client().await;
        for _ in 0..5 {
            wire.next_write().await; // handshake
        }

        wire.send_line("PING :tmi.twitch.tv").await;
        assert_eq!(wire.next_write().await, "PONG :tmi.twitch.tv");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn privmsg_classifies_as_chat() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line(":ann!a@a PRIVMSG #medgelabs :hello world")
            .await;
        assert_eq!(rx.recv().await.unwrap(), Event::chat("ann", "hello world"));
    }

    #[tokio::test]
    async fn privmsg_with_bits_tag_classifies_as_cheer() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line("@display-name=Ann;bits=100 :ann!a@a PRIVMSG #medgelabs :Cheer100")
            .await;
        assert_eq!(rx.recv().await.unwrap(), Event::bits_cheer("Ann", 100));
    }

    #[tokio::test]
    async fn raid_notice_classifies_with_viewer_count() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line(
            "@msg-id=raid;msg-param-displayName=Ann;msg-param-viewerCount=25 \
             :tmi USERNOTICE #medgelabs",
        )
        .await;
        assert_eq!(rx.recv().await.unwrap(), Event::raid("Ann", 25));
    }

    #[tokio::test]
    async fn non_numeric_raid_size_defaults_to_zero() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line(
            "@msg-id=raid;msg-param-displayName=Ann;msg-param-viewerCount=lots \
             :tmi USERNOTICE #medgelabs",
        )
        .await;
        assert_eq!(rx.recv().await.unwrap(), Event::raid("Ann", 0));
    }

    #[tokio::test]
    async fn sub_and_resub_classify_as_subscription() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line(
            "@msg-id=sub;display-name=Ann;msg-param-cumulative-months=1 \
             :tmi USERNOTICE #medgelabs",
        )
        .await;
        assert_eq!(rx.recv().await.unwrap(), Event::subscription("Ann", 1));

        wire.send_line(
            "@msg-id=resub;display-name=Bob;msg-param-cumulative-months=12 \
             :tmi USERNOTICE #medgelabs",
        )
        .await;
        assert_eq!(rx.recv().await.unwrap(), Event::subscription("Bob", 12));
    }

    #[tokio::test]
    async fn subgift_carries_gifter_and_recipient() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line(
            "@msg-id=subgift;display-name=Ann;msg-param-recipient-display-name=Bob \
             :tmi USERNOTICE #medgelabs",
        )
        .await;
        assert_eq!(rx.recv().await.unwrap(), Event::gift_sub("Ann", "Bob"));
    }

    #[tokio::test]
    async fn unknown_notice_and_malformed_tags_are_dropped_quietly() {
        let (_client, wire, mut rx) = started_client().await;

        wire.send_line("@msg-id=charity;k=v; :tmi USERNOTICE #medgelabs")
            .await;
        wire.send_line("@ :tmi USERNOTICE #medgelabs").await;
        wire.send_line("353 medgelabs = #medgelabs :names").await;

        // Still alive: a normal message afterwards flows through.
        wire.send_line(":ann!a@a PRIVMSG #medgelabs :still here")
            .await;
        assert_eq!(rx.recv().await.unwrap(), Event::chat("ann", "still here"));
    }

    #[tokio::test]
    async fn outbound_chat_event_becomes_privmsg() {
        let (client, mut wire, _rx) = started_client().await;
        for _ in 0..5 {
            wire.next_write().await; // handshake
        }

        client
            .outbound_sink()
            .send(Event::chat("", "Welcome @ann!"))
            .await
            .unwrap();
        assert_eq!(
            wire.next_write().await,
            "PRIVMSG #medgelabs :Welcome @ann!"
        );
    }

    #[tokio::test]
    async fn classification_is_stable_under_reserialization() {
        let line = "@display-name=Ann;bits=100 :ann!a@a PRIVMSG #chan :Cheer100";
        let once = Message::parse(line);
        let twice = Message::parse(&once.to_string());

        let (Classified::Event(a), Classified::Event(b)) = (classify(&once), classify(&twice))
        else {
            panic!("expected events");
        };
        assert_eq!(a, b);
    }
}
