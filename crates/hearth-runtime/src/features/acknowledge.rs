//! Acknowledges channel happenings (raids, subs, gift subs, bits) in chat.

use std::sync::Arc;
use std::time::Duration;

use hearth_core::{Bot, BotResult, Event};

use crate::config::AckConfig;
use crate::template::MessageTemplate;

/// Registers a handler that responds to events selected by `matches` with
/// the configured template, after an optional delay.
///
/// One registration per event family keeps the mailboxes independent: a
/// delayed raid shout-out does not hold up sub acknowledgements.
pub fn register<M>(bot: &Arc<Bot>, config: &AckConfig, matches: M) -> BotResult<()>
where
    M: Fn(&Event) -> bool + Send + Sync + 'static,
{
    let template = MessageTemplate::new(&config.template);
    let delay = Duration::from_secs(config.delay_seconds);
    let bot_ref = Arc::clone(bot);

    bot.register_handler(move |event| {
        let bot = Arc::clone(&bot_ref);
        let template = template.clone();
        let relevant = matches(&event);
        Box::pin(async move {
            if !relevant {
                return;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            bot.send_message(&template.render(&event));
        })
    })
}
