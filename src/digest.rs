use serde::Serialize;
use sha2::{Digest as _, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

const CHUNK_SIZE: usize = 4096;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DigestRecord {
    pub path: PathBuf,
    #[serde(rename = "digest")]
    pub hex_digest: String,
}

impl DigestRecord {
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<DigestRecord, DigestError> {
        let path = path.as_ref();
        let hex_digest = digest_file(path)?;

        Ok(DigestRecord {
            path: path.to_owned(),
            hex_digest,
        })
    }
}

/// SHA-256 of the file at `path`, rendered as lowercase hex.
pub fn digest_file<P: AsRef<Path>>(path: P) -> Result<String, DigestError> {
    let path = path.as_ref();
    let read_error = |source| DigestError::StorageRead {
        path: path.to_owned(),
        source,
    };

    let mut file = fs::File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        let n = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        hasher.update(&chunk[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Could not read {}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
