use thiserror::Error;

/// Why a single catalog call produced nothing usable. The resolver treats
/// every variant the same way: move on to the next source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid URL {0}")]
    InvalidUrl(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Http(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
