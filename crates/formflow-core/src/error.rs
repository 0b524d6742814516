use crate::domain::validation::ErrorMap;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a [`Transport`](crate::domain::ports::Transport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The call did not complete within the configured bound
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The remote could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote answered with a non-success HTTP status
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body, possibly truncated
        body: String,
    },

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Core error type for the Formflow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// One or more fields failed their rules
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(ErrorMap),

    /// OTP resend attempted before the cooldown elapsed
    #[error("Cooldown active: {remaining} tick(s) remaining")]
    CooldownActive {
        /// Ticks left before a resend is permitted
        remaining: u32,
    },

    /// A network operation of the same kind is already pending
    #[error("Already in flight: {0}")]
    AlreadyInFlight(String),

    /// Network or timeout failure
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// The backend answered with a structured failure message
    #[error("{0}")]
    BackendRejection(String),

    /// The requested transition is not legal in the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The form requires an OTP to be sent before submission
    #[error("An OTP must be requested before submitting this form")]
    OtpRequired,

    /// The session was abandoned
    #[error("Form session has ended")]
    SessionEnded,

    /// An in-flight completion arrived after the session state moved on
    #[error("Completion discarded: {0}")]
    StaleCompletion(String),

    /// Step index outside the form definition
    #[error("Step index out of range: {0}")]
    StepOutOfRange(usize),

    /// The form definition is malformed
    #[error("Invalid form definition: {0}")]
    InvalidDefinition(String),

    /// An event could not be handed to its subscriber
    #[error("Event delivery failed: {0}")]
    EventDelivery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FormError {
    /// The single message shown to the user for this failure.
    ///
    /// Backend rejections are passed through verbatim; transport failures are
    /// rendered as a retryable notice.
    pub fn user_message(&self) -> String {
        match self {
            FormError::BackendRejection(message) => message.clone(),
            FormError::Transport(TransportError::Timeout(_)) => {
                "The request timed out. Please try again.".to_string()
            }
            FormError::Transport(_) => {
                "We could not reach the bank service. Please try again.".to_string()
            }
            FormError::Validation(_) => "Please correct the highlighted fields.".to_string(),
            FormError::AlreadyInFlight(_) => {
                "A request is already being processed. Please wait.".to_string()
            }
            FormError::OtpRequired => "Please request a verification code first.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the user may retry the same action manually
    pub fn is_retryable(&self) -> bool {
        matches!(self, FormError::Transport(_))
    }
}

impl From<TransportError> for FormError {
    fn from(err: TransportError) -> Self {
        FormError::Transport(err)
    }
}

impl From<serde_json::Error> for FormError {
    fn from(err: serde_json::Error) -> Self {
        FormError::Serialization(err.to_string())
    }
}
