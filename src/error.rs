use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from {0}")]
    Empty(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("source error: {0}")]
    Source(String),
}

/// Bootstrap data that breaks the gameweek invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("gameweek id {0} outside 1..=38")]
    GameweekOutOfRange(u8),

    #[error("more than one current gameweek: {0:?}")]
    MultipleCurrent(Vec<u8>),

    #[error("more than one next gameweek: {0:?}")]
    MultipleNext(Vec<u8>),

    #[error("next gameweek {next} does not follow current gameweek {current}")]
    NextNotAfterCurrent { current: u8, next: u8 },
}
