//! Every user-visible string in one place.

pub const STATUS_DOWNLOADING: &str = ">.< | Downloading...";

pub const STATUS_UPLOADING: &str = "=w= | Uploading...";

pub const ERROR_DOWNLOADING_MESSAGE: &str = "*╥﹏╥ | Error downloading!*";

pub const AGE_RESTRICTED_MESSAGE: &str = "*ᇂ_ᇂ | This video is age restricted!*";

pub const ERROR_UPLOADING_MESSAGE: &str = "*(⋟﹏⋞) | Error uploading!*";

pub const TOO_BIG_MESSAGE: &str = "*O.O | Too big!*";

pub const MEDIA_CAPTION: &dyn Fn(&str) -> String =
    &|url| format!("Here's your [media]({url}) >w<");

pub const VIDEO_CAPTION: &dyn Fn(&str) -> String =
    &|url| format!("Here's your [video]({url}) >w<");
