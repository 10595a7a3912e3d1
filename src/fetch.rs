use crate::config::Config;
use crate::download::{fetch_file, DownloadError};
use crate::listing::{list_contents, EntryKind, FileDescriptor, ListingError};
use futures_util::future::try_join_all;
use futures_util::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

struct DownloadTask<'a> {
    descriptor: &'a FileDescriptor,
    url: &'a Url,
    destination: PathBuf,
}

impl DownloadTask<'_> {
    async fn run(self, client: &Client) -> Result<PathBuf, DownloadError> {
        log::debug!("Fetching {} from {}", self.descriptor.name, self.url);
        fetch_file(client, self.url, &self.destination).await?;
        Ok(self.destination)
    }
}

fn download_tasks<'a>(descriptors: &'a [FileDescriptor], dest_dir: &Path) -> Vec<DownloadTask<'a>> {
    descriptors
        .iter()
        .filter_map(|descriptor| match &descriptor.kind {
            EntryKind::File { download_url } => Some(DownloadTask {
                descriptor,
                url: download_url,
                destination: dest_dir.join(&descriptor.name),
            }),
            EntryKind::Directory | EntryKind::Other => None,
        })
        .collect()
}

/// Downloads every plain file of the configured repository into `dest_dir`.
///
/// All downloads run concurrently on `client` and the result lists the local
/// paths in listing order. If any download fails the whole fetch fails and
/// the remaining downloads are dropped; files written so far stay in
/// `dest_dir`.
pub async fn fetch_repo_contents<P>(
    client: &Client,
    config: &Config,
    dest_dir: P,
) -> Result<Vec<PathBuf>, FetchError>
where
    P: AsRef<Path>,
{
    let dest_dir = dest_dir.as_ref();
    let descriptors = list_contents(client, &config.api_base, &config.owner, &config.repo).await?;

    let tasks = download_tasks(&descriptors, dest_dir);

    log::info!(
        "Downloading {} files of {}/{}",
        tasks.len(),
        config.owner,
        config.repo
    );

    let downloads = tasks.into_iter().map(|task| task.run(client));
    let paths = match config.max_concurrent {
        Some(limit) => {
            stream::iter(downloads)
                .buffered(limit.get())
                .try_collect::<Vec<_>>()
                .await?
        }
        None => try_join_all(downloads).await?,
    };

    Ok(paths)
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Could not list repository contents")]
    Listing(#[from] ListingError),

    #[error("Download failed")]
    Download(#[from] DownloadError),
}
