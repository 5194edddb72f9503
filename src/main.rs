mod config;
mod health;
mod platform;
mod scheduler;
mod tracker;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::platform::telegram::TelegramAlertSink;
use crate::scheduler::Scheduler;
use crate::tracker::{Tracker, TrackerSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tg_reminder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Alert chat: {}", config.reminder.alert_chat_id);
    info!("  Reply timeout: {}s", config.reminder.reply_timeout_secs);
    info!("  Privileged user ids: {:?}", config.reminder.privileged_user_ids);
    info!("  Privileged usernames: {:?}", config.reminder.privileged_usernames);

    let bot = Bot::new(&config.telegram.bot_token);
    let sink = Arc::new(TelegramAlertSink::new(bot.clone()));
    let tracker = Arc::new(Tracker::new(TrackerSettings::from(&config.reminder), sink));

    if config.health.enabled {
        let health = config.health.clone();
        tokio::spawn(async move {
            if let Err(e) = health::run(&health.host, health.port).await {
                error!("Health server stopped: {:#}", e);
            }
        });
    }

    let mut scheduler = Scheduler::new().await?;
    scheduler::tasks::register_builtin_tasks(&scheduler, Arc::clone(&tracker)).await?;
    scheduler.start().await?;

    info!("Bot is starting...");
    platform::telegram::run(bot, Arc::clone(&tracker)).await?;

    let dropped = tracker.shutdown().await;
    info!("Shutting down, {} pending question(s) dropped", dropped);
    scheduler.shutdown().await?;

    Ok(())
}
