//! The domain event model.

use serde::{Deserialize, Serialize};

/// One classified domain occurrence, delivered once to every registered
/// handler.
///
/// Events are immutable value objects. The protocol client creates them on
/// ingress; handlers create them on egress via the constructor helpers.
/// Every variant carries a sender, empty when the event is not attributable
/// to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A plain chat message.
    Chat { sender: String, message: String },

    /// A bits cheer attached to a chat message.
    BitsCheer { sender: String, amount: u64 },

    /// An incoming raid; `amount` is the raider's viewer count.
    Raid { sender: String, amount: u64 },

    /// A subscription or resubscription; `months` is the cumulative total.
    Subscription { sender: String, months: u64 },

    /// A gifted subscription from `sender` to `recipient`.
    GiftSub { sender: String, recipient: String },

    /// A channel point redemption.
    PointRedemption {
        sender: String,
        title: String,
        message: String,
        amount: u64,
    },
}

impl Event {
    /// Creates a chat message event.
    pub fn chat(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Chat {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Creates a bits cheer event.
    pub fn bits_cheer(sender: impl Into<String>, amount: u64) -> Self {
        Self::BitsCheer {
            sender: sender.into(),
            amount,
        }
    }

    /// Creates a raid event.
    pub fn raid(sender: impl Into<String>, amount: u64) -> Self {
        Self::Raid {
            sender: sender.into(),
            amount,
        }
    }

    /// Creates a subscription event.
    pub fn subscription(sender: impl Into<String>, months: u64) -> Self {
        Self::Subscription {
            sender: sender.into(),
            months,
        }
    }

    /// Creates a gift subscription event.
    pub fn gift_sub(sender: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self::GiftSub {
            sender: sender.into(),
            recipient: recipient.into(),
        }
    }

    /// The user this event is attributed to, empty if none.
    pub fn sender(&self) -> &str {
        match self {
            Self::Chat { sender, .. }
            | Self::BitsCheer { sender, .. }
            | Self::Raid { sender, .. }
            | Self::Subscription { sender, .. }
            | Self::GiftSub { sender, .. }
            | Self::PointRedemption { sender, .. } => sender,
        }
    }

    /// The user-supplied message text, empty for variants that carry none.
    pub fn message(&self) -> &str {
        match self {
            Self::Chat { message, .. } | Self::PointRedemption { message, .. } => message,
            _ => "",
        }
    }

    /// True for plain chat messages.
    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Chat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_is_empty_when_not_user_attributable() {
        let event = Event::chat("", "system notice");
        assert_eq!(event.sender(), "");
    }

    #[test]
    fn message_is_empty_for_non_chat_variants() {
        assert_eq!(Event::raid("ann", 5).message(), "");
        assert_eq!(Event::chat("ann", "hi").message(), "hi");
    }
}
