//! Single-file fetcher with atomic publish
//!
//! The response body streams into a `.part` sibling of the destination; only a
//! 2xx response that streamed to the end gets renamed into place (copy+delete
//! when the rename cannot cross storage boundaries). Failed attempts discard
//! the temporary file and retry after a constant pause. A cancelled run never
//! leaves a partial destination.

use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::retry::{RETRY_DELAY, with_attempts};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Download `url` to `dest`, retrying up to `retries` attempts.
///
/// Exhausted retries are reported to the journal's failure stream and
/// returned as an error; cancellation returns [`Error::Cancelled`] without a
/// failure line. Neither outcome should abort the surrounding phase.
pub(crate) async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
    retries: u32,
    cancel: &CancellationToken,
    journal: &Journal,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = part_path(dest);
    let display_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| url.to_string());

    let result = with_attempts(
        retries,
        RETRY_DELAY,
        cancel,
        || attempt_download(client, url, &tmp, dest, timeout, cancel),
        |attempt, _| {
            journal.log(format!("[Retry {attempt}/{retries}] {display_name}"));
        },
    )
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            journal.fail(format!("[DL] Failed: {display_name} ({url})"));
            Err(e)
        }
    }
}

/// Temporary sibling the body streams into before publish
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_owned();
    os.push(".part");
    PathBuf::from(os)
}

async fn attempt_download(
    client: &reqwest::Client,
    url: &str,
    tmp: &Path,
    dest: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut response = client.get(url).timeout(timeout).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if tmp.exists() {
        let _ = tokio::fs::remove_file(tmp).await;
    }

    let streamed = stream_body(&mut response, tmp, cancel).await;
    if let Err(e) = streamed {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(e);
    }

    if let Err(e) = publish(tmp, dest).await {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(e);
    }
    Ok(())
}

async fn stream_body(
    response: &mut reqwest::Response,
    tmp: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    loop {
        let chunk = tokio::select! {
            chunk = response.chunk() => chunk?,
            () = cancel.cancelled() => return Err(Error::Cancelled),
        };
        match chunk {
            Some(bytes) => file.write_all(&bytes).await?,
            None => break,
        }
    }
    file.flush().await?;
    Ok(())
}

/// Rename the finished temporary into place; copy+delete when the rename
/// cannot cross a storage boundary.
async fn publish(tmp: &Path, dest: &Path) -> Result<()> {
    if tokio::fs::rename(tmp, dest).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(tmp, dest).await?;
    tokio::fs::remove_file(tmp).await?;
    Ok(())
}
