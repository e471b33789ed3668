//! Errors surfaced by the repository client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("repository access is disabled (enable it with `reccall repo-config --enabled true`)")]
    Disabled,

    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("recipe '{shortcut}' not found in {repo}")]
    RecipeNotFound { shortcut: String, repo: String },

    #[error("recipe '{shortcut}' is invalid: {}", .errors.join("; "))]
    InvalidRecipe { shortcut: String, errors: Vec<String> },

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type RepoResult<T> = std::result::Result<T, RepoError>;
