mod bot;
mod classify;
mod config;
mod config_validators;
mod context;
mod db;
mod domain;
mod natsort;
mod providers;
mod utils;

use anyhow::Context;
use argh::FromArgs;
use context::AppContext;
use std::{fs, path::PathBuf, process, sync::Arc};
use teloxide::Bot;

/// Telegram bot that mirrors social media links into the chat.
#[derive(FromArgs)]
struct Args {
    /// path to the configuration file
    #[argh(option, default = "PathBuf::from(\"config.toml\")")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();
    hello();

    match run().await {
        Ok(()) => {
            process::exit(0);
        }
        Err(err) => {
            log::error!("Fatal error: {err:#}");
            process::exit(1);
        }
    }
}

fn hello() {
    log::info!(
        "{name} version {version}",
        name = env!("CARGO_BIN_NAME"),
        version = env!("CARGO_PKG_VERSION")
    );
}

async fn run() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let config = config::Config::read_from(&args.config)?;

    let db = db::Db::new(&config.database.path).context("opening database")?;

    fs::create_dir_all(&config.downloads.dir).with_context(|| {
        format!("creating downloads dir '{}'", config.downloads.dir.display())
    })?;
    cleanup_stray_artifacts(&config.downloads.dir);

    let bot = Bot::new(config.telegram.bot_token.clone());
    let ctx = Arc::new(AppContext::new(config, db));

    log::info!("Starting dispatcher");
    bot::run(bot, ctx).await;

    Ok(())
}

/// Removes per-identity directories left over by sessions that were
/// interrupted by a previous shutdown.
fn cleanup_stray_artifacts(downloads_dir: &std::path::Path) {
    let entries = match fs::read_dir(downloads_dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("Reading '{}' failed: {err}", downloads_dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => log::info!("Removed stray artifacts at '{}'", path.display()),
            Err(err) => log::warn!("Removing '{}' failed: {err}", path.display()),
        }
    }
}
