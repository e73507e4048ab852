use thiserror::Error;

/// All errors that can occur in bookstacks-core.
#[derive(Debug, Error)]
pub enum BookstacksError {
    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: admin password required")]
    Unauthorized,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes returned by the `bookstacks` binary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    Unauthorized = 9,
}

impl From<&BookstacksError> for ExitCode {
    fn from(err: &BookstacksError) -> Self {
        match err {
            BookstacksError::BookNotFound(_) => ExitCode::NotFound,
            BookstacksError::ValidationError(_) => ExitCode::InvalidArgs,
            BookstacksError::Unauthorized => ExitCode::Unauthorized,
            _ => ExitCode::GeneralError,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookstacksError>;
