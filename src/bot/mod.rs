mod data;
mod delivery;
mod send;

use crate::{
    classify::{self, Classified},
    context::AppContext,
};
use delivery::DownloadSession;
use std::sync::Arc;
use teloxide::{
    dispatching::UpdateHandler,
    macros::BotCommands,
    payloads::SendPhotoSetters,
    prelude::*,
    types::InputFile,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum BotCommand {
    Start,
}

pub async fn run(bot: Bot, ctx: Arc<AppContext>) {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

#[rustfmt::skip]
fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = teloxide::filter_command::<BotCommand, _>()
        .branch(dptree::case![BotCommand::Start].endpoint(bot_start));

    Update::filter_message()
        .branch(command_handler)
        .branch(dptree::endpoint(on_message))
}

const EASTER_EGG_TRIGGER: &str = "bigrat.monster";

async fn bot_start(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    send_image_reply(&bot, &msg, ctx.config.telegram.greeting_image.as_deref()).await
}

async fn send_image_reply(
    bot: &Bot,
    msg: &Message,
    image: Option<&std::path::Path>,
) -> HandlerResult {
    let Some(image) = image else {
        return Ok(());
    };

    if !image.exists() {
        log::warn!("Static image '{}' does not exist", image.display());
        return Ok(());
    }

    bot.send_photo(msg.chat.id, InputFile::file(image.to_owned()))
        .reply_to_message_id(msg.id)
        .await?;

    Ok(())
}

/// Every non-command message is scanned for the first https link;
/// messages without a supported one are ignored silently.
async fn on_message(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.contains(EASTER_EGG_TRIGGER) {
        return send_image_reply(&bot, &msg, ctx.config.telegram.easter_egg_image.as_deref())
            .await;
    }

    let Some(url) = classify::extract_https_url(text) else {
        return Ok(());
    };

    match classify::classify(url) {
        Classified::Media(identity) => {
            DownloadSession::run(bot, ctx, &msg, url, identity).await;
        }
        Classified::DirectFile => {
            delivery::deliver_direct(bot, ctx, &msg, url).await;
        }
        Classified::Unsupported => {}
    }

    Ok(())
}
