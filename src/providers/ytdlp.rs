use super::{classify_tool_stderr, run_tool, FetchError, FetchErrorKind};
use std::{path::Path, time::Duration};
use tokio::process::Command;

const YTDLP_BIN: &str = "yt-dlp";

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Asks yt-dlp for the source duration without downloading.
/// `None` when the metadata has no duration (livestreams).
pub async fn probe_duration(url: &str) -> Result<Option<u64>, FetchError> {
    let output = run_tool(
        Command::new(YTDLP_BIN)
            .arg("-j")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg(url),
        PROBE_TIMEOUT,
    )
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::new(classify_tool_stderr(&stderr), stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let info: serde_json::Value = serde_json::from_str(stdout.trim())
        .map_err(|err| FetchError::new(FetchErrorKind::Extraction, err.to_string()))?;

    Ok(info["duration"].as_f64().map(|secs| secs as u64))
}

/// Downloads one video into `target`. `max_height` caps the
/// resolution to bound the file size for longer clips.
pub async fn fetch_video(
    url: &str,
    target: &Path,
    max_height: Option<u32>,
) -> Result<(), FetchError> {
    let format = match max_height {
        Some(h) => format!("bv[height<={h}][ext=mp4]+ba[ext=m4a]/b[ext=mp4][height<={h}]"),
        None => "bv[ext=mp4]+ba[ext=m4a]/b[ext=mp4]".to_owned(),
    };

    let output = run_tool(
        Command::new(YTDLP_BIN)
            .arg("-f")
            .arg(format)
            .arg("-o")
            .arg(target)
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg(url),
        FETCH_TIMEOUT,
    )
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::new(classify_tool_stderr(&stderr), stderr));
    }

    // yt-dlp can exit zero without producing the requested file.
    if !target.exists() {
        return Err(FetchError::new(
            FetchErrorKind::Extraction,
            format!("no file produced for '{url}'"),
        ));
    }

    Ok(())
}
