use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Downloads `url` into `path`, truncating whatever was there before.
///
/// The parent directory of `path` has to exist already. On error the
/// destination may be left partially written.
pub async fn fetch_file<P>(client: &Client, url: &Url, path: P) -> Result<(), DownloadError>
where
    P: AsRef<Path>,
{
    let path: &Path = path.as_ref();
    let write_error = |source| DownloadError::StorageWrite {
        path: path.to_owned(),
        source,
    };

    let resp = client.get(url.clone()).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.clone(),
            status,
        });
    }

    log::debug!("Downloading {} to {}", url, path.display());

    let mut output = fs::File::create(path).await.map_err(write_error)?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;

    while let Some(item) = stream.next().await {
        let item = item?;
        output.write_all(&item).await.map_err(write_error)?;
        written += item.len() as u64;
    }

    output.flush().await.map_err(write_error)?;

    log::debug!("Wrote {} bytes to {}", written, path.display());

    Ok(())
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: Url, status: StatusCode },

    #[error("Could not write {}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
