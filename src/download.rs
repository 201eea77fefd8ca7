//! Streams remote files into the download cache.

use std::{io::Write, path::Path};

use anyhow::{Error, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;

/// Downloads `url` to `file_path`, reporting progress on `progress_bar`.
///
/// The body is written to a temporary file next to the target and renamed
/// into place once complete, so an interrupted download never leaves a
/// truncated file behind. Returns the number of bytes written.
pub async fn download_with_progress(
    client: &reqwest::Client,
    url: &str,
    file_path: &Path,
    progress_bar: ProgressBar,
) -> Result<u64, Error> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::msg(format!("Failed to download file: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::msg(format!(
            "Failed to download file: {}",
            response.status()
        )));
    }

    // Switch from spinner to a byte counter when the size is known
    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        ) {
            progress_bar.set_style(style.progress_chars("=> "));
        }
    }

    let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::msg(format!("Error reading chunk: {}", e)))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }

    file.flush()?;
    file.persist(file_path)?;

    Ok(downloaded)
}

// -- Tests -------------------------------------------------------------------
