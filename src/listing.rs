use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::{Component, Path};
use thiserror::Error;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File { download_url: Url },
    Directory,
    Other,
}

/// One entry of a repository content listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub kind: EntryKind,
}

impl FileDescriptor {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File { .. })
    }
}

#[derive(Deserialize, Debug)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    download_url: Option<String>,
}

pub fn contents_url(api_base: &str, owner: &str, repo: &str) -> Result<Url, ListingError> {
    if owner.is_empty() {
        return Err(ListingError::InvalidArgument("owner"));
    }
    if repo.is_empty() {
        return Err(ListingError::InvalidArgument("repository name"));
    }

    let url = format!(
        "{}/repos/{}/{}/contents",
        api_base.trim_end_matches('/'),
        owner,
        repo
    );
    Url::parse(&url).map_err(|source| ListingError::InvalidUrl { url, source })
}

/// Fetches the top-level content listing of `owner/repo`.
///
/// Only the first page the endpoint returns is considered.
pub async fn list_contents(
    client: &Client,
    api_base: &str,
    owner: &str,
    repo: &str,
) -> Result<Vec<FileDescriptor>, ListingError> {
    let url = contents_url(api_base, owner, repo)?;

    log::info!("Listing {}", url);

    let resp = client.get(url.clone()).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ListingError::HttpStatus { url, status });
    }

    let body = resp.bytes().await?;
    let descriptors = parse_listing(&url, &body)?;

    log::debug!(
        "{} entries in listing, {} of them files",
        descriptors.len(),
        descriptors.iter().filter(|d| d.is_file()).count()
    );

    Ok(descriptors)
}

fn parse_listing(base: &Url, body: &[u8]) -> Result<Vec<FileDescriptor>, ListingError> {
    let entries: Vec<RawEntry> = serde_json::from_slice(body)?;

    entries
        .into_iter()
        .map(|entry| {
            if !is_plain_name(&entry.name) {
                return Err(ListingError::MalformedEntry(format!(
                    "invalid entry name {:?}",
                    entry.name
                )));
            }

            let kind = match entry.kind.as_str() {
                "file" => {
                    let raw = entry.download_url.ok_or_else(|| {
                        ListingError::MalformedEntry(format!(
                            "file {:?} has no download_url",
                            entry.name
                        ))
                    })?;
                    let download_url =
                        base.join(&raw).map_err(|source| ListingError::InvalidUrl {
                            url: raw,
                            source,
                        })?;
                    EntryKind::File { download_url }
                }
                "dir" => EntryKind::Directory,
                _ => EntryKind::Other,
            };

            Ok(FileDescriptor {
                name: entry.name,
                kind,
            })
        })
        .collect()
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Empty {0}")]
    InvalidArgument(&'static str),

    #[error("Invalid URL {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: Url, status: StatusCode },

    #[error("Listing is not an array of entries")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Malformed listing entry: {0}")]
    MalformedEntry(String),
}
