//! Message templates for feature responses.

use hearth_core::Event;

/// A response template with `{placeholder}` substitution.
///
/// Recognized placeholders are `{sender}`, `{message}`, `{amount}`,
/// `{months}`, `{recipient}` and `{title}`. Placeholders without a value
/// for the event at hand render as an empty string (`{amount}` and
/// `{months}` as `0`). Unrecognized braces pass through verbatim.
/// Rendering never fails.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    raw: String,
}

impl MessageTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Renders the template against an event.
    pub fn render(&self, event: &Event) -> String {
        let amount = match event {
            Event::BitsCheer { amount, .. }
            | Event::Raid { amount, .. }
            | Event::PointRedemption { amount, .. } => *amount,
            _ => 0,
        };
        let months = match event {
            Event::Subscription { months, .. } => *months,
            _ => 0,
        };
        let recipient = match event {
            Event::GiftSub { recipient, .. } => recipient.as_str(),
            _ => "",
        };
        let title = match event {
            Event::PointRedemption { title, .. } => title.as_str(),
            _ => "",
        };

        self.raw
            .replace("{sender}", event.sender())
            .replace("{message}", event.message())
            .replace("{amount}", &amount.to_string())
            .replace("{months}", &months.to_string())
            .replace("{recipient}", recipient)
            .replace("{title}", title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_sender_and_amount() {
        let template = MessageTemplate::new("{sender} cheered {amount} bits!");
        let rendered = template.render(&Event::bits_cheer("ann", 500));
        assert_eq!(rendered, "ann cheered 500 bits!");
    }

    #[test]
    fn months_for_subscriptions() {
        let template = MessageTemplate::new("{sender} has been here {months} months");
        let rendered = template.render(&Event::subscription("ann", 12));
        assert_eq!(rendered, "ann has been here 12 months");
    }

    #[test]
    fn recipient_for_gift_subs() {
        let template = MessageTemplate::new("{sender} gifted a sub to {recipient}");
        let rendered = template.render(&Event::gift_sub("ann", "bob"));
        assert_eq!(rendered, "ann gifted a sub to bob");
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let template = MessageTemplate::new("hi {sender} {mystery}");
        let rendered = template.render(&Event::chat("ann", "yo"));
        assert_eq!(rendered, "hi ann {mystery}");
    }

    #[test]
    fn irrelevant_placeholders_render_neutral() {
        let template = MessageTemplate::new("{recipient}:{amount}");
        let rendered = template.render(&Event::chat("ann", "yo"));
        assert_eq!(rendered, ":0");
    }
}
