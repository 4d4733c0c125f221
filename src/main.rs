use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cc_finder::config::Args;
use cc_finder::router::build_sync_message;
use cc_finder::store::{DocumentStore, MongoStore};
use cc_finder::writer::{spawn_writer_task, DEFAULT_CHANNEL_CAPACITY};
use cc_finder::{commands, transport, Bot, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    init_tracing(&config.log_level);

    let store: Arc<dyn DocumentStore> = Arc::new(MongoStore::connect(&config.store).await?);

    let registry = commands::registry(store.clone(), &config.wiki);
    let declarations = commands::declarations();

    let (incoming, _reader_task) = transport::spawn_stdin_reader(DEFAULT_CHANNEL_CAPACITY);

    // The control line must precede any response, so emit it before the
    // writer task takes over stdout.
    if config.sync.enabled {
        transport::write_stdout_line(&build_sync_message(
            &declarations,
            &config.sync.guild_ids,
        ))?;
        tracing::info!(guilds = ?config.sync.guild_ids, "Requested command sync");
    }
    let (sink, writer_task) = spawn_writer_task(tokio::io::stdout(), DEFAULT_CHANNEL_CAPACITY);

    let mut bot = Bot::builder()
        .registry(registry)
        .max_concurrent_handlers(config.max_concurrent_handlers)
        .start(incoming, sink)?;
    bot.router().check_declarations(&declarations)?;

    tracing::info!("Bot is running. Press CTRL-C to exit.");

    let signalled = tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            true
        }
        result = bot.wait_for_shutdown() => {
            if let Err(e) = result {
                tracing::error!("Dispatch loop failed: {}", e);
            }
            tracing::info!("Gateway closed the input stream");
            false
        }
    };

    tracing::info!("Shutting down...");
    if signalled {
        if let Err(e) = bot.shutdown(config.shutdown_grace).await {
            tracing::error!("Dispatch loop failed: {}", e);
        }
    } else {
        drop(bot);
    }

    // Every sink is gone once the handlers are; the writer drains and ends.
    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Response writer failed: {}", e),
        Err(e) => tracing::error!("Response writer task failed: {}", e),
    }

    if let Err(e) = store.disconnect().await {
        tracing::error!("Failed to disconnect store: {}", e);
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
