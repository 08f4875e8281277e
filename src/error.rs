//! Error types for medivoice
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the medivoice application
#[derive(Error, Debug)]
pub enum MedivoiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::store::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the remote AI service clients and the report pipeline.
///
/// Transcription and enhancement failures are all terminal and reported
/// verbatim to the caller. During report generation only a subset is
/// terminal: service outages (404/5xx/network/timeout) route to the local
/// fallback builder instead of erroring.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No transcription text provided. Please record some audio first.")]
    EmptyInput,

    #[error("No audio data to transcribe. Check your recording.")]
    EmptyAudio,

    #[error("Transcription too short to process.")]
    TooShort,

    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimited,

    #[error("Authentication failed. Please check your API credentials.")]
    AuthenticationFailed,

    #[error("Usage limit reached. Please add credits to continue.")]
    QuotaExceeded,

    #[error("AI service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No transcription received from the service.")]
    EmptyTranscription,

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Failed to generate report ({0}).")]
    Generation(u16),

    #[error("A report generation is already in progress.")]
    InProgress,

    #[error("Service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Map a non-success HTTP status from the transcription or enhancement
    /// endpoints to the error the caller sees. Report generation partitions
    /// statuses differently (404/5xx trigger fallback) and does not use this.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => ServiceError::RateLimited,
            401 => ServiceError::AuthenticationFailed,
            402 => ServiceError::QuotaExceeded,
            500..=599 => ServiceError::ServiceUnavailable(message),
            _ => ServiceError::Api { status, message },
        }
    }
}

/// Result type alias using MedivoiceError
pub type Result<T> = std::result::Result<T, MedivoiceError>;
