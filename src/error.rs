use thiserror::Error;

/// A submission that cannot be scored. Raised before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected {expected} answers, got {actual}")]
    AnswerCount { expected: usize, actual: usize },

    #[error("answer to question {question} is empty")]
    EmptyAnswer { question: usize },

    #[error("company name is required")]
    MissingCompanyName,
}

/// Failure of the pattern/insight store. The scored audit stays valid.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("pattern payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("unknown pattern type stored: {0}")]
    UnknownPatternType(String),

    #[error("pattern store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog has no zones")]
    Empty,

    #[error("zone '{zone}' is invalid: {reason}")]
    InvalidZone { zone: String, reason: String },

    #[error("zone '{0}' is declared more than once")]
    DuplicateZone(String),
}
