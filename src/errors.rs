use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Gateway returned 2xx but the body did not match the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Gateway returned a well-formed error response.
    #[error("Gateway error ({status}): {code}: {message}")]
    Vendor {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PgError {
    /// The HTTP status of a gateway-reported failure, if this is one.
    pub fn vendor_status(&self) -> Option<u16> {
        match self {
            PgError::Vendor { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Crate-wide result type for gateway operations.
pub type PgResult<T> = Result<T, PgError>;
