use super::{data, send, send::OutgoingMedia};
use crate::{
    context::AppContext,
    db::MediaRecord,
    domain::{ContentIdentity, MediaKind},
    natsort, providers,
    providers::FetchErrorKind,
};
use anyhow::Context as _;
use std::{path::PathBuf, sync::Arc, time::Duration};
use teloxide::{
    payloads::{
        EditMessageTextSetters, SendAudioSetters, SendMessageSetters, SendPhotoSetters,
        SendVideoSetters,
    },
    prelude::*,
    types::{InputFile, MessageId, ParseMode},
};

/// How long a final error text stays on screen before the status
/// message is removed.
const STATUS_LINGER: Duration = Duration::from_secs(3);

const CAPPED_HEIGHT: u32 = 720;

/// Terminal state of one delivery session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Delivered,

    /// Silent no-op: duplicate in-flight request, failed probe.
    Skipped,

    /// Source duration exceeds the ceiling. Silent by design, so
    /// intentionally-skipped long content doesn't spam failures.
    TooLong,

    /// Fetched artifact exceeds the upload ceiling.
    TooLarge,

    FetchFailed(FetchErrorKind),

    UploadFailed,

    /// Internal failure (database, filesystem) before any upload
    /// began.
    Failed,
}

/// One inbound platform URL, resolved sequentially: cache lookup,
/// fetch, upload, delivery, cleanup. Cleanup runs on every exit
/// path, success or failure.
pub struct DownloadSession {
    bot: Bot,
    ctx: Arc<AppContext>,
    chat_id: ChatId,
    reply_to: MessageId,
    source_url: String,
    identity: ContentIdentity,
    work_dir: PathBuf,
    status: Option<Message>,
}

impl DownloadSession {
    pub async fn run(bot: Bot, ctx: Arc<AppContext>, msg: &Message, url: &str, identity: ContentIdentity) {
        let key = identity.lock_key();

        if !ctx.try_acquire(&key) {
            log::debug!("'{key}' is already in flight, dropping duplicate request");
            return;
        }

        let work_dir = identity.work_dir(&ctx.config.downloads.dir);

        let mut session = DownloadSession {
            bot,
            ctx: ctx.clone(),
            chat_id: msg.chat.id,
            reply_to: msg.id,
            source_url: url.to_owned(),
            identity,
            work_dir,
            status: None,
        };

        let outcome = match session.execute().await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("Session for '{url}' failed: {err:#}");
                Outcome::Failed
            }
        };

        log::info!("Resolved '{key}' with {outcome:?}");

        session.finalize(outcome).await;
        ctx.release(&key);
    }

    async fn execute(&mut self) -> anyhow::Result<Outcome> {
        match self.ctx.db.media_count(&self.identity.content_id)? {
            0 if self.identity.platform.is_gallery() => self.fetch_gallery().await,
            0 => self.fetch_single().await,
            1 => self.resend_single().await,
            _ => self.resend_gallery().await,
        }
    }

    /// Cache hit with exactly one record: resend by file id, no
    /// provider involved.
    async fn resend_single(&mut self) -> anyhow::Result<Outcome> {
        let Some(record) = self.ctx.db.first_media(&self.identity.content_id)? else {
            return Ok(Outcome::Skipped);
        };

        let caption = data::MEDIA_CAPTION(&self.source_url);
        let file = InputFile::file_id(record.file_id.clone());

        match redelivery_kind(&record) {
            MediaKind::Photo => {
                self.bot
                    .send_photo(self.chat_id, file)
                    .caption(caption)
                    .parse_mode(ParseMode::Markdown)
                    .reply_to_message_id(self.reply_to)
                    .await
                    .context("resending cached photo")?;
            }
            // A gallery can end up cached as a lone audio track when
            // every photo/video sibling failed archival.
            MediaKind::Audio => {
                self.bot
                    .send_audio(self.chat_id, file)
                    .caption(caption)
                    .parse_mode(ParseMode::Markdown)
                    .reply_to_message_id(self.reply_to)
                    .await
                    .context("resending cached audio")?;
            }
            MediaKind::Video => {
                self.bot
                    .send_video(self.chat_id, file)
                    .supports_streaming(true)
                    .caption(caption)
                    .parse_mode(ParseMode::Markdown)
                    .reply_to_message_id(self.reply_to)
                    .await
                    .context("resending cached video")?;
            }
        }

        Ok(Outcome::Delivered)
    }

    /// Cache hit with several records: regroup and resend in the
    /// original insertion order, audio track trailing.
    async fn resend_gallery(&mut self) -> anyhow::Result<Outcome> {
        let records = self.ctx.db.all_media(&self.identity.content_id)?;

        let items: Vec<OutgoingMedia> = records
            .iter()
            .filter(|record| record.kind() != Some(MediaKind::Audio))
            .filter_map(|record| {
                Some(OutgoingMedia {
                    file_id: record.file_id.clone(),
                    kind: record.kind()?,
                })
            })
            .collect();

        let groups = send::build_media_groups(&items, &data::MEDIA_CAPTION(&self.source_url));
        send::send_media_groups(&self.bot, self.chat_id, self.reply_to, groups).await?;

        if let Some(audio) = self.ctx.db.first_audio(&self.identity.content_id)? {
            self.bot
                .send_audio(self.chat_id, InputFile::file_id(audio.file_id))
                .reply_to_message_id(self.reply_to)
                .await
                .context("resending cached audio")?;
        }

        Ok(Outcome::Delivered)
    }

    /// Cache miss on a single-video platform: probe, fetch, guard
    /// size, upload straight to the requester, cache the returned
    /// file id.
    async fn fetch_single(&mut self) -> anyhow::Result<Outcome> {
        let fetch_url = self.identity.fetch_url(&self.source_url);
        let limits = self.ctx.config.limits.clone();

        let duration = match providers::probe_duration(&fetch_url).await {
            Ok(duration) => duration,
            Err(err) => {
                log::warn!("Probing '{fetch_url}' failed: {err}");
                return Ok(Outcome::Skipped);
            }
        };

        if duration.is_some_and(|secs| secs > limits.max_duration_secs) {
            return Ok(Outcome::TooLong);
        }

        self.set_status(data::STATUS_DOWNLOADING).await;

        // Longer clips get capped at 720p to keep the file under the
        // upload ceiling; short ones are fetched at best quality.
        let max_height = duration
            .filter(|secs| *secs > limits.best_quality_max_secs)
            .map(|_| CAPPED_HEIGHT);

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .with_context(|| format!("creating '{}'", self.work_dir.display()))?;

        let target = self.work_dir.join(format!("{}.mp4", self.identity.content_id));

        if let Err(err) = providers::fetch_video(&fetch_url, &target, max_height).await {
            log::error!("Fetching '{fetch_url}' failed: {err}");
            return Ok(Outcome::FetchFailed(err.kind));
        }

        let size = tokio::fs::metadata(&target)
            .await
            .with_context(|| format!("sizing '{}'", target.display()))?
            .len();

        if size > limits.max_upload_bytes {
            return Ok(Outcome::TooLarge);
        }

        self.edit_status(data::STATUS_UPLOADING).await;

        let sent = match self
            .bot
            .send_video(self.chat_id, InputFile::file(target))
            .supports_streaming(true)
            .caption(data::VIDEO_CAPTION(&self.source_url))
            .parse_mode(ParseMode::Markdown)
            .reply_to_message_id(self.reply_to)
            .await
        {
            Ok(sent) => sent,
            Err(err) => {
                log::error!("Uploading '{fetch_url}' failed: {err}");
                return Ok(Outcome::UploadFailed);
            }
        };

        match sent.video().map(|video| video.file.id.clone()) {
            Some(file_id) => self.cache_record(file_id, MediaKind::Video),
            None => log::warn!("Response for '{fetch_url}' carries no video file id"),
        }

        Ok(Outcome::Delivered)
    }

    /// Cache miss on a gallery platform: fetch all items into the
    /// scoped directory, archive each one for a durable file id,
    /// cache, then deliver grouped. A single item's failure skips
    /// that item only.
    async fn fetch_gallery(&mut self) -> anyhow::Result<Outcome> {
        self.set_status(data::STATUS_DOWNLOADING).await;

        if let Err(err) = providers::fetch_gallery(&self.source_url, &self.work_dir).await {
            log::error!("Fetching gallery '{}' failed: {err}", self.source_url);
            return Ok(Outcome::FetchFailed(err.kind));
        }

        let mut names = self.enumerate_artifacts().await?;
        natsort::natural_sort(&mut names);

        if names.is_empty() {
            log::error!("Gallery '{}' produced no known media files", self.source_url);
            return Ok(Outcome::FetchFailed(FetchErrorKind::Extraction));
        }

        self.edit_status(data::STATUS_UPLOADING).await;

        let mut items = Vec::new();
        let mut audio_id = None;

        for name in &names {
            let path = self.work_dir.join(name);
            let Some(kind) = MediaKind::from_path(&path) else {
                continue;
            };

            let file_id = match self.archive_upload(&path, kind).await {
                Ok(file_id) => file_id,
                Err(err) => {
                    log::warn!("Archiving '{}' failed, item skipped: {err:#}", path.display());
                    continue;
                }
            };

            self.cache_record(file_id.clone(), kind);

            if kind == MediaKind::Audio {
                audio_id.get_or_insert(file_id);
            } else {
                items.push(OutgoingMedia { file_id, kind });
            }
        }

        if items.is_empty() && audio_id.is_none() {
            return Ok(Outcome::UploadFailed);
        }

        let groups = send::build_media_groups(&items, &data::MEDIA_CAPTION(&self.source_url));

        if let Err(err) =
            send::send_media_groups(&self.bot, self.chat_id, self.reply_to, groups).await
        {
            log::error!("Delivering gallery '{}' failed: {err:#}", self.source_url);
            return Ok(Outcome::UploadFailed);
        }

        if let Some(file_id) = audio_id {
            let sent = self
                .bot
                .send_audio(self.chat_id, InputFile::file_id(file_id))
                .reply_to_message_id(self.reply_to)
                .await;

            if let Err(err) = sent {
                log::error!("Sending gallery audio track failed: {err}");
                return Ok(Outcome::UploadFailed);
            }
        }

        Ok(Outcome::Delivered)
    }

    /// File names of the fetched artifacts the bot knows how to
    /// deliver, unsorted.
    async fn enumerate_artifacts(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.work_dir)
            .await
            .with_context(|| format!("reading '{}'", self.work_dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !path.is_file() || MediaKind::from_path(&path).is_none() {
                continue;
            }

            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_owned());
            }
        }

        Ok(names)
    }

    /// Uploads one local artifact to the private archival channel
    /// and returns the host-assigned file id.
    async fn archive_upload(&self, path: &std::path::Path, kind: MediaKind) -> anyhow::Result<String> {
        let archive = ChatId(self.ctx.config.telegram.archive_channel_id);
        let file = InputFile::file(path.to_owned());

        let file_id = match kind {
            MediaKind::Photo => self
                .bot
                .send_photo(archive, file)
                .await?
                .photo()
                .and_then(|sizes| sizes.last())
                .map(|size| size.file.id.clone()),
            MediaKind::Video => self
                .bot
                .send_video(archive, file)
                .await?
                .video()
                .map(|video| video.file.id.clone()),
            MediaKind::Audio => self
                .bot
                .send_audio(archive, file)
                .await?
                .audio()
                .map(|audio| audio.file.id.clone()),
        };

        file_id.context("archived message carries no file id")
    }

    fn cache_record(&self, file_id: String, kind: MediaKind) {
        let record = MediaRecord {
            file_id,
            platform_id: self.identity.content_id.clone(),
            platform: self.identity.platform.as_str().to_owned(),
            media_type: kind.as_str().to_owned(),
        };

        // The artifact is already delivered or archived at this
        // point; a failed cache write only costs a future re-fetch.
        if let Err(err) = self.ctx.db.add_media(&record) {
            log::error!("Caching '{}' failed: {err:#}", self.identity.lock_key());
        }
    }

    async fn set_status(&mut self, text: &str) {
        let sent = self
            .bot
            .send_message(self.chat_id, text)
            .reply_to_message_id(self.reply_to)
            .await;

        match sent {
            Ok(message) => self.status = Some(message),
            Err(err) => log::warn!("Sending status message failed: {err}"),
        }
    }

    async fn edit_status(&self, text: &str) {
        let Some(status) = &self.status else {
            return;
        };

        if let Err(err) = self
            .bot
            .edit_message_text(self.chat_id, status.id, text)
            .await
        {
            log::warn!("Editing status message failed: {err}");
        }
    }

    /// Unconditional teardown: local artifacts removed, status
    /// message resolved into a short-lived error text or deleted.
    async fn finalize(&mut self, outcome: Outcome) {
        if self.work_dir.exists() {
            if let Err(err) = tokio::fs::remove_dir_all(&self.work_dir).await {
                log::error!("Removing '{}' failed: {err}", self.work_dir.display());
            }
        }

        let Some(status) = self.status.take() else {
            return;
        };

        if let Some(text) = error_text(outcome) {
            let edited = self
                .bot
                .edit_message_text(self.chat_id, status.id, text)
                .parse_mode(ParseMode::Markdown)
                .await;

            if let Err(err) = edited {
                log::warn!("Editing status message failed: {err}");
            }

            tokio::time::sleep(STATUS_LINGER).await;
        }

        if let Err(err) = self.bot.delete_message(self.chat_id, status.id).await {
            log::warn!("Deleting status message failed: {err}");
        }
    }
}

/// Which send call redelivers a cached record. Unknown kinds (a
/// record written by a newer version) fall back to video, the
/// common case.
fn redelivery_kind(record: &MediaRecord) -> MediaKind {
    record.kind().unwrap_or(MediaKind::Video)
}

/// Final status text for an outcome. Silent outcomes resolve to
/// `None` and only remove the status message.
fn error_text(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Delivered | Outcome::Skipped | Outcome::TooLong => None,
        Outcome::TooLarge => Some(data::TOO_BIG_MESSAGE),
        Outcome::FetchFailed(FetchErrorKind::AgeRestricted) => Some(data::AGE_RESTRICTED_MESSAGE),
        Outcome::FetchFailed(_) | Outcome::Failed => Some(data::ERROR_DOWNLOADING_MESSAGE),
        Outcome::UploadFailed => Some(data::ERROR_UPLOADING_MESSAGE),
    }
}

/// Direct `.mp4` links bypass platform identity entirely: guarded
/// by a HEAD size probe, fetched into scratch space, delivered and
/// forgotten. Never cached.
pub async fn deliver_direct(bot: Bot, ctx: Arc<AppContext>, msg: &Message, url: &str) {
    if let Err(err) = direct_session(&bot, &ctx, msg, url).await {
        log::error!("Direct delivery of '{url}' failed: {err:#}");
    }
}

async fn direct_session(
    bot: &Bot,
    ctx: &AppContext,
    msg: &Message,
    url: &str,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let reply_to = msg.id;

    match providers::head_size(&ctx.http, url).await {
        Ok(Some(size)) if size > ctx.config.limits.max_upload_bytes => {
            let status = bot
                .send_message(chat_id, data::TOO_BIG_MESSAGE)
                .parse_mode(ParseMode::Markdown)
                .reply_to_message_id(reply_to)
                .await?;

            tokio::time::sleep(STATUS_LINGER).await;
            bot.delete_message(chat_id, status.id).await?;

            return Ok(());
        }
        Ok(_) => {}
        // The guard is best effort; an unsized artifact still hits
        // the gateway's own ceiling on upload.
        Err(err) => log::warn!("HEAD '{url}' failed: {err}"),
    }

    let status = bot
        .send_message(chat_id, data::STATUS_DOWNLOADING)
        .reply_to_message_id(reply_to)
        .await?;

    let scratch = tempfile::tempdir().context("creating scratch dir")?;
    let target = scratch.path().join("video.mp4");

    let error_text = match providers::fetch_direct(&ctx.http, url, &target).await {
        Ok(()) => {
            let edited = bot
                .edit_message_text(chat_id, status.id, data::STATUS_UPLOADING)
                .await;

            if let Err(err) = edited {
                log::warn!("Editing status message failed: {err}");
            }

            let sent = bot
                .send_video(chat_id, InputFile::file(target))
                .supports_streaming(true)
                .caption(data::VIDEO_CAPTION(url))
                .parse_mode(ParseMode::Markdown)
                .reply_to_message_id(reply_to)
                .await;

            match sent {
                Ok(_) => None,
                Err(err) => {
                    log::error!("Uploading '{url}' failed: {err}");
                    Some(data::ERROR_UPLOADING_MESSAGE)
                }
            }
        }
        Err(err) => {
            log::error!("Fetching '{url}' failed: {err}");
            Some(data::ERROR_DOWNLOADING_MESSAGE)
        }
    };

    if let Some(text) = error_text {
        let edited = bot
            .edit_message_text(chat_id, status.id, text)
            .parse_mode(ParseMode::Markdown)
            .await;

        if let Err(err) = edited {
            log::warn!("Editing status message failed: {err}");
        }

        tokio::time::sleep(STATUS_LINGER).await;
    }

    bot.delete_message(chat_id, status.id).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db::Db, domain::Platform};

    fn record(media_type: &str) -> MediaRecord {
        MediaRecord {
            file_id: "CAACAgIAAxkBAAE".to_owned(),
            platform_id: "7301234567890123456".to_owned(),
            platform: Platform::Tiktok.as_str().to_owned(),
            media_type: media_type.to_owned(),
        }
    }

    fn test_session(work_dir: PathBuf) -> DownloadSession {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            archive_channel_id = -1001234567890

            [database]
            path = "media.db"

            [downloads]
            dir = "media-downloads"
            "#,
        )
        .unwrap();

        DownloadSession {
            bot: Bot::new("123:abc"),
            ctx: Arc::new(AppContext::new(config, Db::open_in_memory().unwrap())),
            chat_id: ChatId(1),
            reply_to: MessageId(1),
            source_url: "https://www.instagram.com/p/C1aBcDeFgHi/".to_owned(),
            identity: ContentIdentity::new(Platform::Instagram, "C1aBcDeFgHi"),
            work_dir,
            status: None,
        }
    }

    #[test]
    fn lone_cached_audio_redelivers_as_audio() {
        // A gallery whose photo/video items all failed archival
        // leaves a single audio record behind; it must not be
        // resent through the video call.
        assert_eq!(redelivery_kind(&record("audio")), MediaKind::Audio);
        assert_eq!(redelivery_kind(&record("photo")), MediaKind::Photo);
        assert_eq!(redelivery_kind(&record("video")), MediaKind::Video);
    }

    #[test]
    fn unknown_cached_kind_falls_back_to_video() {
        assert_eq!(redelivery_kind(&record("sticker")), MediaKind::Video);
    }

    #[test]
    fn error_texts_match_the_failure_stage() {
        assert_eq!(error_text(Outcome::Delivered), None);
        assert_eq!(error_text(Outcome::Skipped), None);
        assert_eq!(error_text(Outcome::TooLong), None);
        assert_eq!(error_text(Outcome::TooLarge), Some(data::TOO_BIG_MESSAGE));
        assert_eq!(
            error_text(Outcome::FetchFailed(FetchErrorKind::AgeRestricted)),
            Some(data::AGE_RESTRICTED_MESSAGE)
        );
        assert_eq!(
            error_text(Outcome::FetchFailed(FetchErrorKind::Network)),
            Some(data::ERROR_DOWNLOADING_MESSAGE)
        );
        assert_eq!(
            error_text(Outcome::Failed),
            Some(data::ERROR_DOWNLOADING_MESSAGE)
        );
        assert_eq!(
            error_text(Outcome::UploadFailed),
            Some(data::ERROR_UPLOADING_MESSAGE)
        );
    }

    #[tokio::test]
    async fn finalize_removes_artifacts_for_every_outcome() {
        let downloads = tempfile::tempdir().unwrap();

        let outcomes = [
            Outcome::Delivered,
            Outcome::Skipped,
            Outcome::TooLong,
            Outcome::TooLarge,
            Outcome::FetchFailed(FetchErrorKind::AgeRestricted),
            Outcome::FetchFailed(FetchErrorKind::Extraction),
            Outcome::UploadFailed,
            Outcome::Failed,
        ];

        for outcome in outcomes {
            let work_dir = downloads.path().join("instagram").join("C1aBcDeFgHi");
            std::fs::create_dir_all(&work_dir).unwrap();
            std::fs::write(work_dir.join("C1aBcDeFgHi_1.jpg"), b"jpeg").unwrap();

            let mut session = test_session(work_dir.clone());
            session.finalize(outcome).await;

            assert!(!work_dir.exists(), "{outcome:?} left artifacts behind");
        }
    }
}
