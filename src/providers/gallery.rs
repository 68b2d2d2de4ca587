use super::{classify_tool_stderr, run_tool, FetchError};
use std::{path::Path, time::Duration};
use tokio::process::Command;

const GALLERY_BIN: &str = "gallery-dl";

const FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Downloads every media item of a gallery post (photos, videos and
/// at most one audio track) flat into `dir`. Enumeration and
/// ordering of the artifacts is the caller's concern.
pub async fn fetch_gallery(url: &str, dir: &Path) -> Result<(), FetchError> {
    tokio::fs::create_dir_all(dir).await?;

    let output = run_tool(
        Command::new(GALLERY_BIN).arg("-D").arg(dir).arg(url),
        FETCH_TIMEOUT,
    )
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::new(classify_tool_stderr(&stderr), stderr));
    }

    Ok(())
}
