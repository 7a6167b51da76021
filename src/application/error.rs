use thiserror::Error;

/// Coarse classification of [`AppError`], for callers that branch on the
/// failure without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Unavailable,
    BorrowerNotFound,
    StoreError,
    DecodeError,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("the book {0} does not exist")]
    BookNotFound(String),

    #[error("the book {0} already exists")]
    BookAlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("the book {0} is not available")]
    Unavailable(String),

    #[error("the book {id} does not have borrower {borrower}")]
    BorrowerNotFound { id: String, borrower: String },

    #[error("world state error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("malformed book record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BookNotFound(_) => ErrorKind::NotFound,
            AppError::BookAlreadyExists(_) => ErrorKind::AlreadyExists,
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::Unavailable(_) => ErrorKind::Unavailable,
            AppError::BorrowerNotFound { .. } => ErrorKind::BorrowerNotFound,
            AppError::Store(_) => ErrorKind::StoreError,
            AppError::Decode(_) => ErrorKind::DecodeError,
        }
    }
}
