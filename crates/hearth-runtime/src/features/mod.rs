//! Chat feature handlers.
//!
//! Each feature is a plain [`Bot`] handler registered before startup,
//! driven by its section of [`FeatureConfig`]. Features never talk to the
//! transport directly; responses go through [`Bot::send_message`].

use std::sync::Arc;

use tracing::info;

use hearth_cache::Store;
use hearth_core::{Bot, BotResult};

use crate::config::FeatureConfig;

mod acknowledge;
mod commands;
mod greet;
mod poll;

/// Registers every enabled feature against the bot.
///
/// `greet_store` backs the greeter's seen-chatters ledger; it is unused
/// when the greeter is disabled.
pub fn register_all(bot: &Arc<Bot>, config: &FeatureConfig, greet_store: Store) -> BotResult<()> {
    if config.read_logger {
        register_read_logger(bot)?;
    }
    if config.greeter.enabled {
        greet::register(bot, greet_store, &config.greeter)?;
    }
    if config.commands.enabled {
        commands::register(bot, &config.commands)?;
    }
    if config.raids.enabled {
        acknowledge::register(bot, &config.raids, |event| {
            matches!(event, hearth_core::Event::Raid { .. })
        })?;
    }
    if config.subs.enabled {
        acknowledge::register(bot, &config.subs, |event| {
            matches!(event, hearth_core::Event::Subscription { .. })
        })?;
    }
    if config.gift_subs.enabled {
        acknowledge::register(bot, &config.gift_subs, |event| {
            matches!(event, hearth_core::Event::GiftSub { .. })
        })?;
    }
    if config.bits.enabled {
        acknowledge::register(bot, &config.bits, |event| {
            matches!(event, hearth_core::Event::BitsCheer { .. })
        })?;
    }
    if config.polls.enabled {
        poll::register(bot)?;
    }
    Ok(())
}

/// Logs every inbound event at info level. Useful while wiring up a new
/// channel, too noisy for steady state.
fn register_read_logger(bot: &Arc<Bot>) -> BotResult<()> {
    bot.register_handler(|event| {
        Box::pin(async move {
            info!(?event, "event received");
        })
    })
}

pub use acknowledge::register as register_acknowledger;
pub use commands::register as register_commands;
pub use greet::register as register_greeter;
pub use poll::register as register_poll_collector;
