use crate::config::Config;
use crate::digest::{DigestError, DigestRecord};
use crate::fetch::{fetch_repo_contents, FetchError};
use std::io;
use tempfile::TempDir;
use thiserror::Error;

fn scratch_dir(config: &Config) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("repodigest-");

    match &config.scratch_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
}

/// Fetches the configured repository into a scratch directory and digests
/// every downloaded file.
///
/// The scratch directory is gone once this returns or the future is dropped,
/// so the paths in the records are informational only.
pub async fn run(config: &Config) -> Result<Vec<DigestRecord>, PipelineError> {
    let client = config.http_client().map_err(PipelineError::Client)?;
    let scratch = scratch_dir(config).map_err(PipelineError::ScratchDir)?;

    log::debug!("Using scratch directory {}", scratch.path().display());

    let paths = fetch_repo_contents(&client, config, scratch.path()).await?;

    let records = paths
        .iter()
        .map(DigestRecord::for_path)
        .collect::<Result<Vec<_>, _>>()?;

    for record in &records {
        log::debug!("{}: {}", record.path.display(), record.hex_digest);
    }

    let scratch_path = scratch.path().to_owned();
    if let Err(err) = scratch.close() {
        log::warn!(
            "Could not remove scratch directory {}: {}",
            scratch_path.display(),
            err
        );
    }

    Ok(records)
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Could not set up HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Could not create scratch directory")]
    ScratchDir(#[source] io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Digest(#[from] DigestError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadError;
    use httpmock::prelude::*;
    use serde_json::json;
    use sha2::{Digest as _, Sha256};
    use std::time::Duration;

    const LISTING_PATH: &str = "/api/v1/repos/radium/project-configuration/contents";

    fn config_for(server: &MockServer, scratch_root: &std::path::Path) -> Config {
        Config {
            api_base: server.url("/api/v1"),
            scratch_root: Some(scratch_root.to_owned()),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn digests_every_file_in_order() {
        let server = MockServer::start_async().await;
        let listing = json!([
            {"type": "file", "name": "a.txt", "download_url": server.url("/raw/a.txt")},
            {"type": "file", "name": "b.txt", "download_url": server.url("/raw/b.txt")},
        ]);
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTING_PATH);
                then.status(200).json_body(listing);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/a.txt");
                then.status(200).body("hello");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/b.txt");
                then.status(200).body("world");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let records = run(&config_for(&server, root.path())).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].path.ends_with("a.txt"));
        assert_eq!(
            records[0].hex_digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(records[1].path.ends_with("b.txt"));
        assert_eq!(records[1].hex_digest, hex::encode(Sha256::digest(b"world")));

        assert!(!records[0].path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_download_leaves_no_scratch_dir() {
        let server = MockServer::start_async().await;
        let listing = json!([
            {"type": "file", "name": "a.txt", "download_url": server.url("/raw/a.txt")},
            {"type": "file", "name": "b.txt", "download_url": server.url("/raw/b.txt")},
        ]);
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTING_PATH);
                then.status(200).json_body(listing);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/a.txt");
                then.status(200).body("hello");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/b.txt");
                then.status(404);
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let result = run(&config_for(&server, root.path())).await;

        assert!(matches!(
            result,
            Err(PipelineError::Fetch(FetchError::Download(
                DownloadError::HttpStatus { .. }
            )))
        ));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dropped_run_leaves_no_scratch_dir() {
        let server = MockServer::start_async().await;
        let listing = json!([
            {"type": "file", "name": "fast.txt", "download_url": server.url("/raw/fast.txt")},
            {"type": "file", "name": "slow.txt", "download_url": server.url("/raw/slow.txt")},
        ]);
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTING_PATH);
                then.status(200).json_body(listing);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/fast.txt");
                then.status(200).body("fast");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/slow.txt");
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .body("slow");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let config = config_for(&server, root.path());
        let result = tokio::time::timeout(Duration::from_millis(800), run(&config)).await;

        assert!(result.is_err(), "run finished before it was cancelled");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_listing_gives_no_records() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTING_PATH);
                then.status(200).json_body(json!([]));
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let records = run(&config_for(&server, root.path())).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
