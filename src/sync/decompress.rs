//! Streaming bz2 decompression
//!
//! Each attempt streams the archive through a [`BzDecoder`] in fixed 64 KiB
//! chunks on a blocking worker, polling the cancellation token between
//! chunks. A clean logical end-of-stream keeps the destination; any other
//! terminal state deletes it and the attempt is retried up to the budget. A
//! cancelled attempt's output is undefined and callers must discard it.

use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::retry::{RETRY_DELAY, with_attempts};
use bzip2::read::BzDecoder;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

const DECOMPRESS_CHUNK: usize = 64 * 1024;

/// Decompress `archive` into `dest`, retrying up to `retries` attempts.
///
/// Exhausted retries are reported to the journal's failure stream;
/// cancellation propagates silently as [`Error::Cancelled`].
pub(crate) async fn decompress_archive(
    archive: &Path,
    dest: &Path,
    retries: u32,
    cancel: &CancellationToken,
    journal: &Journal,
) -> Result<()> {
    let display_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());

    let result = with_attempts(
        retries,
        RETRY_DELAY,
        cancel,
        || attempt_decompress(archive.to_path_buf(), dest.to_path_buf(), cancel.clone()),
        |_, _| {},
    )
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            journal.fail(format!("[BZ2] Failed: {display_name}"));
            Err(e)
        }
    }
}

async fn attempt_decompress(
    archive: PathBuf,
    dest: PathBuf,
    cancel: CancellationToken,
) -> Result<()> {
    let archive_for_err = archive.clone();
    let cleanup_dest = dest.clone();
    let result = tokio::task::spawn_blocking(move || stream_decompress(&archive, &dest, &cancel))
        .await
        .map_err(|e| Error::Decompress {
            archive: archive_for_err,
            reason: format!("decompression task panicked: {e}"),
        })?;

    // Only a terminal stream error removes the output; a cancelled attempt's
    // partial output is left as undefined, never consumed.
    if let Err(e) = result {
        if !matches!(e, Error::Cancelled) {
            let _ = std::fs::remove_file(&cleanup_dest);
        }
        return Err(e);
    }
    Ok(())
}

fn stream_decompress(archive: &Path, dest: &Path, cancel: &CancellationToken) -> Result<()> {
    let input = std::fs::File::open(archive)?;
    let mut decoder = BzDecoder::new(input);
    let mut output = std::fs::File::create(dest)?;
    let mut buf = vec![0u8; DECOMPRESS_CHUNK];

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match decoder.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => output.write_all(&buf[..n])?,
            Err(e) => {
                return Err(Error::Decompress {
                    archive: archive.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
    output.flush()?;
    Ok(())
}

/// Destination for a decompressed archive: the path with the trailing
/// compression extension removed (`dm_lockdown.bsp.bz2` → `dm_lockdown.bsp`).
pub(crate) fn decompressed_path(archive: &Path) -> PathBuf {
    archive.with_extension("")
}
