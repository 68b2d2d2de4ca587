use crate::domain::MediaKind;
use anyhow::Context;
use teloxide::{
    payloads::SendMediaGroupSetters,
    prelude::*,
    types::{InputFile, InputMedia, InputMediaPhoto, InputMediaVideo, MessageId, ParseMode},
};

/// Telegram refuses grouped posts with more than ten items.
pub const MEDIA_GROUP_LIMIT: usize = 10;

/// A cached or freshly uploaded artifact ready for grouped delivery.
#[derive(Clone, Debug)]
pub struct OutgoingMedia {
    pub file_id: String,
    pub kind: MediaKind,
}

/// Chunks items into groups of at most [`MEDIA_GROUP_LIMIT`],
/// preserving order across chunk boundaries. Only the globally
/// first item carries the caption.
pub fn build_media_groups(items: &[OutgoingMedia], caption: &str) -> Vec<Vec<InputMedia>> {
    items
        .chunks(MEDIA_GROUP_LIMIT)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    let caption = (chunk_idx == 0 && idx == 0).then(|| caption.to_owned());
                    to_input_media(item, caption)
                })
                .collect()
        })
        .collect()
}

fn to_input_media(item: &OutgoingMedia, caption: Option<String>) -> InputMedia {
    let file = InputFile::file_id(item.file_id.clone());

    match item.kind {
        MediaKind::Video | MediaKind::Audio => {
            let mut media = InputMediaVideo::new(file);
            media.caption = caption;
            media.parse_mode = Some(ParseMode::Markdown);
            InputMedia::Video(media)
        }
        MediaKind::Photo => {
            let mut media = InputMediaPhoto::new(file);
            media.caption = caption;
            media.parse_mode = Some(ParseMode::Markdown);
            InputMedia::Photo(media)
        }
    }
}

/// Sends each prepared group as one grouped-media call, replying to
/// the requesting message.
pub async fn send_media_groups(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: MessageId,
    groups: Vec<Vec<InputMedia>>,
) -> anyhow::Result<()> {
    for group in groups {
        if group.is_empty() {
            continue;
        }

        bot.send_media_group(chat_id, group)
            .reply_to_message_id(reply_to)
            .await
            .with_context(|| format!("sending media group to chat {chat_id}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<OutgoingMedia> {
        (0..n)
            .map(|i| OutgoingMedia {
                file_id: format!("file-{i}"),
                kind: if i % 2 == 0 {
                    MediaKind::Photo
                } else {
                    MediaKind::Video
                },
            })
            .collect()
    }

    fn caption_of(media: &InputMedia) -> Option<&str> {
        match media {
            InputMedia::Photo(photo) => photo.caption.as_deref(),
            InputMedia::Video(video) => video.caption.as_deref(),
            _ => None,
        }
    }

    #[test]
    fn twenty_three_items_chunk_into_10_10_3() {
        let groups = build_media_groups(&items(23), "caption");
        let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();

        assert_eq!(sizes, [10, 10, 3]);
    }

    #[test]
    fn caption_only_on_the_globally_first_item() {
        let groups = build_media_groups(&items(23), "the caption");

        for (chunk_idx, group) in groups.iter().enumerate() {
            for (idx, media) in group.iter().enumerate() {
                if chunk_idx == 0 && idx == 0 {
                    assert_eq!(caption_of(media), Some("the caption"));
                } else {
                    assert_eq!(caption_of(media), None, "chunk {chunk_idx} item {idx}");
                }
            }
        }
    }

    #[test]
    fn order_is_preserved_across_chunks() {
        // Input alternates photo/video, so the flattened output has
        // to alternate too, including across the chunk boundary.
        let groups = build_media_groups(&items(12), "caption");

        for (i, media) in groups.iter().flatten().enumerate() {
            let is_photo = matches!(media, InputMedia::Photo(_));
            assert_eq!(is_photo, i % 2 == 0, "item {i} out of order");
        }
    }

    #[test]
    fn single_item_makes_a_single_group() {
        let groups = build_media_groups(&items(1), "caption");

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
    }

    #[test]
    fn no_items_make_no_groups() {
        assert!(build_media_groups(&[], "caption").is_empty());
    }
}
