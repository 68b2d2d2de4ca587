use crate::domain::{ContentIdentity, Platform};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Result of running a URL through the platform patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    /// A supported platform URL with an extracted content id.
    Media(ContentIdentity),

    /// A bare `.mp4` link. Fetched and delivered once, never cached.
    DirectFile,

    /// Anything else. The orchestrator ignores these silently.
    Unsupported,
}

static URL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://\S+").expect("regex should be valid"));

static YOUTUBE_WATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})").expect("regex should be valid"));

static YOUTUBE_SHORTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/shorts/([A-Za-z0-9_-]{11})").expect("regex should be valid"));

static YOUTUBE_SHORT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([A-Za-z0-9_-]{11})").expect("regex should be valid"));

static TWITTER_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/status/(\d+)").expect("regex should be valid"));

static TIKTOK_POST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/@[^/]+/(?:video|photo)/(\d+)").expect("regex should be valid"));

static TIKTOK_SHORT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([A-Za-z0-9]+)").expect("regex should be valid"));

static INSTAGRAM_POST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(?:p|reel|reels)/([A-Za-z0-9_-]{11})").expect("regex should be valid")
});

static REDDIT_COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/comments/([a-z0-9]+)").expect("regex should be valid"));

static REDDIT_SHORT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([a-z0-9]+)").expect("regex should be valid"));

/// Returns the first `https://` link embedded in a message, if any.
pub fn extract_https_url(text: &str) -> Option<&str> {
    URL_IN_TEXT.find(text).map(|m| m.as_str())
}

/// Matches a raw URL against the known platform shapes and derives
/// the content identity. A URL that looks like a platform link but
/// fails fine-grained id extraction is `Unsupported`, never an error.
pub fn classify(raw: &str) -> Classified {
    let Ok(url) = Url::parse(raw) else {
        return Classified::Unsupported;
    };

    let Some(host) = url.host_str() else {
        return Classified::Unsupported;
    };

    if url.scheme() != "https" && url.scheme() != "http" {
        return Classified::Unsupported;
    }

    // Query strings never participate in identity, so direct links
    // are detected on the path component alone.
    if url.path().ends_with(".mp4") {
        return Classified::DirectFile;
    }

    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = url.path();

    let identity = match host {
        "youtube.com" | "m.youtube.com" => YOUTUBE_WATCH
            .captures(raw)
            .or_else(|| YOUTUBE_SHORTS.captures(path))
            .map(|c| ContentIdentity::new(Platform::Youtube, &c[1])),

        "youtu.be" => YOUTUBE_SHORT_LINK
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Youtube, &c[1])),

        "twitter.com" | "x.com" => TWITTER_STATUS
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Twitter, &c[1])),

        "tiktok.com" => TIKTOK_POST
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Tiktok, &c[1])),

        "vm.tiktok.com" | "vt.tiktok.com" => TIKTOK_SHORT_LINK
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Tiktok, &c[1])),

        "instagram.com" => INSTAGRAM_POST
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Instagram, &c[1])),

        "reddit.com" | "old.reddit.com" => REDDIT_COMMENTS
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Reddit, &c[1])),

        "redd.it" => REDDIT_SHORT_LINK
            .captures(path)
            .map(|c| ContentIdentity::new(Platform::Reddit, &c[1])),

        _ => None,
    };

    match identity {
        Some(identity) => Classified::Media(identity),
        None => Classified::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(platform: Platform, id: &str) -> Classified {
        Classified::Media(ContentIdentity::new(platform, id))
    }

    #[test]
    fn extracts_first_https_url_from_text() {
        assert_eq!(
            extract_https_url("look at this https://youtu.be/R4q-bxbxfXc lol"),
            Some("https://youtu.be/R4q-bxbxfXc")
        );
        assert_eq!(extract_https_url("no links here"), None);
    }

    #[test]
    fn youtube_watch_url_with_tracking_params() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=R4q-bxbxfXc&list=RDMM&start_radio=1"),
            media(Platform::Youtube, "R4q-bxbxfXc")
        );
    }

    #[test]
    fn youtube_shorts_and_short_link() {
        assert_eq!(
            classify("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            media(Platform::Youtube, "dQw4w9WgXcQ")
        );
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ?t=42"),
            media(Platform::Youtube, "dQw4w9WgXcQ")
        );
    }

    #[test]
    fn same_video_normalizes_to_same_identity() {
        let a = classify("https://youtu.be/R4q-bxbxfXc");
        let b = classify("https://www.youtube.com/watch?v=R4q-bxbxfXc&feature=share");

        assert_eq!(a, b);
    }

    #[test]
    fn twitter_status_url() {
        assert_eq!(
            classify("https://x.com/lyanmyan/status/2008657476544327848?s=20"),
            media(Platform::Twitter, "2008657476544327848")
        );
        assert_eq!(
            classify("https://twitter.com/lyanmyan/status/2008657476544327848"),
            media(Platform::Twitter, "2008657476544327848")
        );
    }

    #[test]
    fn tiktok_urls() {
        assert_eq!(
            classify("https://www.tiktok.com/@someuser/video/7301234567890123456"),
            media(Platform::Tiktok, "7301234567890123456")
        );
        assert_eq!(
            classify("https://www.tiktok.com/@someuser/photo/7301234567890123456"),
            media(Platform::Tiktok, "7301234567890123456")
        );
        assert_eq!(
            classify("https://vm.tiktok.com/ZMhbXmJQd/"),
            media(Platform::Tiktok, "ZMhbXmJQd")
        );
    }

    #[test]
    fn instagram_post_and_reel() {
        assert_eq!(
            classify("https://www.instagram.com/p/C1aBcDeFgHi/?igsh=abc"),
            media(Platform::Instagram, "C1aBcDeFgHi")
        );
        assert_eq!(
            classify("https://www.instagram.com/reel/C1aBcDeFgHi/"),
            media(Platform::Instagram, "C1aBcDeFgHi")
        );
        assert_eq!(
            classify("https://www.instagram.com/reels/C1aBcDeFgHi"),
            media(Platform::Instagram, "C1aBcDeFgHi")
        );
    }

    #[test]
    fn reddit_urls() {
        assert_eq!(
            classify("https://www.reddit.com/r/rust/comments/1abc2de/some_title/"),
            media(Platform::Reddit, "1abc2de")
        );
        assert_eq!(
            classify("https://redd.it/1abc2de"),
            media(Platform::Reddit, "1abc2de")
        );
    }

    #[test]
    fn unsupported_urls_are_rejected() {
        assert_eq!(classify("http://google.com"), Classified::Unsupported);
        assert_eq!(classify("not a url at all"), Classified::Unsupported);
        assert_eq!(classify("ftp://example.com/file.mp4"), Classified::Unsupported);
    }

    #[test]
    fn malformed_platform_urls_fail_closed() {
        // Coarse host match without an extractable id.
        assert_eq!(
            classify("https://www.instagram.com/someprofile/"),
            Classified::Unsupported
        );
        assert_eq!(
            classify("https://www.youtube.com/feed/subscriptions"),
            Classified::Unsupported
        );
        assert_eq!(
            classify("https://x.com/lyanmyan"),
            Classified::Unsupported
        );
    }

    #[test]
    fn direct_mp4_detection_ignores_query_string() {
        assert_eq!(
            classify("https://files.example.com/clip.mp4?token=abc123"),
            Classified::DirectFile
        );
        assert_eq!(
            classify("https://files.example.com/page?video=clip.mp4"),
            Classified::Unsupported
        );
    }
}
