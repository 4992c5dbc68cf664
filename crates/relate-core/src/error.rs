use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelateError>;

#[derive(Error, Debug)]
pub enum RelateError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

/// Coarse classification callers can branch on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotSupported,
    NotFound,
    Io,
    Transport,
    Integrity,
    Serialization,
    Process,
    Auth,
}

impl RelateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelateError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RelateError::NotSupported(_) => ErrorKind::NotSupported,
            RelateError::NotFound(_) => ErrorKind::NotFound,
            RelateError::Io(_) => ErrorKind::Io,
            RelateError::Transport(_) => ErrorKind::Transport,
            RelateError::Integrity(_) => ErrorKind::Integrity,
            RelateError::Serialization(_) => ErrorKind::Serialization,
            RelateError::Process(_) => ErrorKind::Process,
            RelateError::Auth(_) => ErrorKind::Auth,
        }
    }

    /// The bare message, without the kind prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            RelateError::InvalidArgument(msg)
            | RelateError::NotSupported(msg)
            | RelateError::NotFound(msg)
            | RelateError::Transport(msg)
            | RelateError::Integrity(msg)
            | RelateError::Process(msg)
            | RelateError::Auth(msg) => msg.clone(),
            RelateError::Io(e) => e.to_string(),
            RelateError::Serialization(e) => e.to_string(),
        }
    }

    pub(crate) fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        RelateError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}

impl From<reqwest::Error> for RelateError {
    fn from(err: reqwest::Error) -> Self {
        RelateError::Transport(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for RelateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        RelateError::Auth(err.to_string())
    }
}

impl From<walkdir::Error> for RelateError {
    fn from(err: walkdir::Error) -> Self {
        match err.into_io_error() {
            Some(io) => RelateError::Io(io),
            None => RelateError::Io(std::io::Error::other("filesystem loop detected")),
        }
    }
}

impl From<zip::result::ZipError> for RelateError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => RelateError::Io(io),
            other => RelateError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        }
    }
}

impl From<tokio::task::JoinError> for RelateError {
    fn from(err: tokio::task::JoinError) -> Self {
        RelateError::Io(std::io::Error::other(format!("background task failed: {}", err)))
    }
}
