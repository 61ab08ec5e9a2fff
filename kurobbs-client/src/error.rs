use thiserror::Error;

/// Errors raised while running the check-in workflow.
///
/// `InvalidToken`, `Client`, `Transport` and `Decode` abort the whole run.
/// `Rejected` is produced by a sequence whose response was well formed but
/// unusable; it is recorded in the ledger and the run moves on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("token cannot be sent as a request header")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Workflow(String),
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Rejected(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
