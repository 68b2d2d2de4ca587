use super::{FetchError, FetchErrorKind};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Size of a direct link from a HEAD request, for the pre-fetch
/// guard. `None` when the server doesn't report a length.
pub async fn head_size(client: &reqwest::Client, url: &str) -> Result<Option<u64>, FetchError> {
    let response = client
        .head(url)
        .send()
        .await
        .map_err(|err| FetchError::new(FetchErrorKind::Network, err.to_string()))?;

    if !response.status().is_success() {
        return Err(FetchError::new(
            FetchErrorKind::Network,
            format!("HEAD '{url}' returned {}", response.status()),
        ));
    }

    Ok(response.content_length())
}

/// Streams a direct link into `target`.
pub async fn fetch_direct(
    client: &reqwest::Client,
    url: &str,
    target: &Path,
) -> Result<(), FetchError> {
    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| FetchError::new(FetchErrorKind::Network, err.to_string()))?;

    let mut file = tokio::fs::File::create(target).await?;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| FetchError::new(FetchErrorKind::Network, err.to_string()))?
    {
        file.write_all(&chunk).await?;
    }

    file.flush().await?;

    Ok(())
}
