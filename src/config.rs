use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::io;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "repodigest.toml";

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: NonZeroU64,
    #[serde(default)]
    pub max_concurrent: Option<NonZeroUsize>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Parent of the per-run scratch directory, the system temp dir if unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: default_api_base(),
            owner: default_owner(),
            repo: default_repo(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: None,
            user_agent: default_user_agent(),
            scratch_root: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads `path` if given. Without one, `repodigest.toml` in the working
    /// directory is used when present, the built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.get())
    }

    /// The client shared by the listing request and all downloads of a run.
    pub fn http_client(&self) -> reqwest::Result<Client> {
        Client::builder()
            .timeout(self.timeout())
            .user_agent(self.user_agent.as_str())
            .build()
    }
}

fn default_api_base() -> String {
    "https://gitea.radium.group/api/v1".to_owned()
}

fn default_owner() -> String {
    "radium".to_owned()
}

fn default_repo() -> String {
    "project-configuration".to_owned()
}

const DEFAULT_TIMEOUT_SECS: NonZeroU64 = match NonZeroU64::new(30) {
    Some(secs) => secs,
    None => panic!("default timeout must be non-zero"),
};

fn default_timeout_secs() -> NonZeroU64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("repodigest/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
