//! The `hearth` binary: loads configuration, wires the pieces together
//! and runs until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use hearth_cache::Store;
use hearth_core::{Bot, BoxedTransport, Transport};
use hearth_irc::{IrcClient, IrcConfig};
use hearth_runtime::config::{self, CacheKind, HearthConfig};
use hearth_runtime::sink::LogSink;
use hearth_runtime::{RuntimeError, features, logging};
use hearth_transport::{WsConfig, WsConnection};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be initialized yet when configuration fails.
            error!(error = %err, "fatal error");
            eprintln!("hearth: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RuntimeError> {
    let config = config::load()?;
    logging::init(&config.logging);

    let greet_store = build_greet_store(&config)?;
    let bot = Arc::new(Bot::new(Store::in_memory(0)));

    let connection = Arc::new(WsConnection::new(WsConfig {
        url: config.url.clone(),
        max_retries: config.retry.max_retries,
        base_delay: config.retry.base_delay(),
    }));

    let transport: BoxedTransport = connection.clone();
    let irc = Arc::new(IrcClient::new(
        transport,
        IrcConfig {
            nick: config.nick.clone(),
            token: config.token.clone(),
            channel: config.channel.clone(),
        },
    ));

    // Every reconnect repeats the login handshake before traffic resumes.
    let replay_client = Arc::clone(&irc);
    connection.set_replay_hook(move || replay_client.handshake_lines());

    connection.connect().await?;

    bot.register_plugin(irc.as_ref())?;
    if config.features.log_sink {
        bot.register_outbound_plugin(&LogSink::new())?;
    }
    features::register_all(&bot, &config.features, greet_store.clone())?;

    irc.start().await?;
    bot.start()?;

    info!(channel = %config.channel, url = %config.url, "hearth is up");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    greet_store.close();
    connection.close().await?;
    Ok(())
}

fn build_greet_store(config: &HearthConfig) -> Result<Store, RuntimeError> {
    let ttl = config.features.greeter.ttl_seconds;
    let store = match config.cache.kind {
        CacheKind::File => Store::file_persisted(&config.cache.path, ttl)?,
        CacheKind::Memory => Store::in_memory(ttl),
    };
    Ok(store)
}
