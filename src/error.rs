use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Already checked in: {0}")]
    AlreadyCheckedIn(String),

    #[error("Already closed: {0}")]
    AlreadyClosed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Upload error: {0}")]
    UploadError(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Service error: {0}")]
    Service(String),
}
