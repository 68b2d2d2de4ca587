use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

/// Closed set of platforms the bot can resolve. Id extraction,
/// provider selection and single-vs-gallery classification all
/// dispatch on this enum instead of on URL substrings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Youtube,
    Twitter,
    Tiktok,
    Instagram,
    Reddit,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Reddit => "reddit",
        }
    }

    pub fn parse(s: &str) -> Option<Platform> {
        match s {
            "youtube" => Some(Platform::Youtube),
            "twitter" => Some(Platform::Twitter),
            "tiktok" => Some(Platform::Tiktok),
            "instagram" => Some(Platform::Instagram),
            "reddit" => Some(Platform::Reddit),
            _ => None,
        }
    }

    /// Platforms whose posts carry multiple media items plus an
    /// optional audio track. They go through the gallery provider
    /// and the archival channel; the rest are single-video.
    pub fn is_gallery(&self) -> bool {
        matches!(self, Platform::Tiktok | Platform::Instagram)
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<MediaKind> {
        match s {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }

    /// Classifies a downloaded gallery artifact by file extension.
    /// Unknown extensions (metadata sidecars etc.) return `None` and
    /// are skipped by the orchestrator.
    pub fn from_path(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" => Some(MediaKind::Photo),
            "mp4" | "webm" | "mov" => Some(MediaKind::Video),
            "mp3" | "m4a" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

/// The `(platform, content id)` pair naming one piece of remote
/// content independently of URL surface variations. Used as the
/// cache key and the in-flight lock key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentIdentity {
    pub platform: Platform,
    pub content_id: String,
}

impl ContentIdentity {
    pub fn new(platform: Platform, content_id: impl Into<String>) -> Self {
        Self {
            platform,
            content_id: content_id.into(),
        }
    }

    pub fn lock_key(&self) -> String {
        format!("{}:{}", self.platform, self.content_id)
    }

    /// Scoped directory for local artifacts of this identity. Unique
    /// per `(platform, content_id)` so concurrent sessions on
    /// different content never collide.
    pub fn work_dir(&self, downloads_dir: &Path) -> PathBuf {
        downloads_dir
            .join(self.platform.as_str())
            .join(&self.content_id)
    }

    /// URL passed to the fetch provider. YouTube ids are rebuilt into
    /// the canonical watch URL so shorts, short links and
    /// playlist-decorated URLs all fetch identically.
    pub fn fetch_url(&self, source_url: &str) -> String {
        match self.platform {
            Platform::Youtube => {
                format!("https://www.youtube.com/watch?v={}", self.content_id)
            }
            _ => source_url.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_roundtrips_through_db_string() {
        for platform in [
            Platform::Youtube,
            Platform::Twitter,
            Platform::Tiktok,
            Platform::Instagram,
            Platform::Reddit,
        ] {
            assert_eq!(Platform::parse(platform.as_str()), Some(platform));
        }

        assert_eq!(Platform::parse("vimeo"), None);
    }

    #[test]
    fn media_kind_from_extension() {
        assert_eq!(
            MediaKind::from_path(Path::new("abc_1.jpg")),
            Some(MediaKind::Photo)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("abc_2.WEBP")),
            Some(MediaKind::Photo)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("clip.mp4")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("track.mp3")),
            Some(MediaKind::Audio)
        );
        assert_eq!(MediaKind::from_path(Path::new("info.json")), None);
        assert_eq!(MediaKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn youtube_fetch_url_is_canonical() {
        let identity = ContentIdentity::new(Platform::Youtube, "R4q-bxbxfXc");

        assert_eq!(
            identity.fetch_url("https://youtu.be/R4q-bxbxfXc?t=10"),
            "https://www.youtube.com/watch?v=R4q-bxbxfXc"
        );
    }

    #[test]
    fn non_youtube_fetch_url_is_source() {
        let identity = ContentIdentity::new(Platform::Twitter, "123");

        assert_eq!(
            identity.fetch_url("https://x.com/u/status/123"),
            "https://x.com/u/status/123"
        );
    }
}
