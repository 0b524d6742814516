use formflow_core::FormError;
use thiserror::Error;

/// Errors raised while setting up the HTTP adapters
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid default header: {0}")]
    InvalidHeader(String),
}

impl From<HttpError> for FormError {
    fn from(err: HttpError) -> Self {
        FormError::Configuration(err.to_string())
    }
}
