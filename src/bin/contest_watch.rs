//! contest-watch bot binary.
//!
//! Usage: `contest-watch [CONFIG_PATH]`. Without a path the default config
//! location is used; a missing file means built-in defaults.

use contest_watch::codeforces::CodeforcesClient;
use contest_watch::commands::{FutureCommand, FutureQuery};
use contest_watch::contests::{ContestCache, RefreshScheduler};
use contest_watch::discord::{DiscordGateway, DiscordPresenter, GatewayEvent};
use contest_watch::pages::PageBuilder;
use contest_watch::session::SessionRegistry;
use contest_watch::{Presenter, WatchConfig, logging};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

fn load_config() -> anyhow::Result<WatchConfig> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(WatchConfig::default_config_path);

    let mut config = if path.exists() {
        WatchConfig::from_file(&path)?
    } else {
        WatchConfig::default()
    };
    if let Ok(token) = std::env::var("BOT_TOKEN") {
        config.discord.bot_token = token;
    }
    config.validate()?;
    Ok(config)
}

async fn handle_future(command: &FutureCommand, channel_id: &str, args: &str) {
    let query = match FutureQuery::parse(args) {
        Ok(query) => query,
        Err(message) => {
            if let Err(e) = command.reject(channel_id, message).await {
                warn!("could not reply in {channel_id}: {e}");
            }
            return;
        }
    };
    if let Err(e) = command.run(channel_id, &query).await {
        error!("future command failed in {channel_id}: {e}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let _log_guard = logging::init(&config.logging)?;
    info!("contest-watch v{} starting", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();

    let source = Arc::new(CodeforcesClient::new(&config.upstream));
    let cache = Arc::new(ContestCache::new(
        source,
        Duration::from_secs(config.upstream.timeout_secs),
    ));
    let refresher = RefreshScheduler::new(
        Arc::clone(&cache),
        Duration::from_secs(config.refresh.interval_secs),
        cancel.clone(),
    )
    .start()
    .await;

    let presenter: Arc<dyn Presenter> = Arc::new(DiscordPresenter::new(&config.discord));
    let (registry, registry_task) = SessionRegistry::spawn(
        Arc::clone(&presenter),
        Duration::from_secs(config.pagination.wait_secs),
        config.pagination.same_target,
        cancel.clone(),
    );
    let command = Arc::new(FutureCommand::new(
        Arc::clone(&cache),
        registry.clone(),
        presenter,
        PageBuilder::new(config.upstream.contest_url_base.clone()),
        config.pagination.page_size,
        cancel.clone(),
    ));
    let handlers = TaskTracker::new();

    let (inbound_tx, mut inbound_rx) = mpsc::channel(64);
    let gateway = DiscordGateway::new(&config.discord);
    let gateway_cancel = cancel.clone();
    let gateway_task = tokio::spawn(async move {
        while !gateway_cancel.is_cancelled() {
            if let Err(e) = gateway.run(inbound_tx.clone()).await {
                warn!("discord gateway disconnected: {e}");
            }
            tokio::select! {
                _ = gateway_cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            inbound = inbound_rx.recv() => {
                let Some(event) = inbound else { break };
                match event {
                    GatewayEvent::Command { channel_id, args } => {
                        let command = Arc::clone(&command);
                        let handler_cancel = cancel.clone();
                        handlers.spawn(async move {
                            tokio::select! {
                                _ = handler_cancel.cancelled() => {}
                                _ = handle_future(&command, &channel_id, &args) => {}
                            }
                        });
                    }
                    GatewayEvent::Navigation { output, event, .. } => {
                        if let Err(e) = registry.navigate(output, event).await {
                            warn!("navigation dropped: {e}");
                        }
                    }
                }
            }
        }
    }

    cancel.cancel();
    gateway_task.abort();
    handlers.close();
    handlers.wait().await;
    if let Err(e) = refresher.await {
        warn!("refresh loop ended abnormally: {e}");
    }
    if let Err(e) = registry_task.await {
        warn!("session registry ended abnormally: {e}");
    }
    info!("contest-watch shut down cleanly");
    Ok(())
}
