//! Collaborator ports
//!
//! The engine talks to the outside world only through these traits. HTTP
//! implementations live in `formflow-http`; the in-memory selection store
//! lives in `formflow-state-inmemory`.

use crate::domain::form_state::FormData;
use crate::error::TransportError;
use crate::FormError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A decoded response from a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,

    /// JSON body; `Null` when the body was empty
    pub body: serde_json::Value,
}

impl TransportResponse {
    /// Create a response
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// True for 2xx statuses
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response channel to the banking backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body to a path relative to the backend base URL
    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<TransportResponse, TransportError>;

    /// GET a path relative to the backend base URL
    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError>;
}

/// Confirmation that an OTP was dispatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpDispatch {
    /// Phone number the code was sent to
    pub target: String,

    /// Message from the provider, shown to the user
    pub message: String,
}

/// Sends one-time passwords.
///
/// The entered code is verified server-side as part of submission.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Send a code to `phone_number`
    async fn request_otp(&self, phone_number: &str) -> Result<OtpDispatch, FormError>;
}

/// Accepts a completed form
#[async_trait]
pub trait SubmissionEndpoint<D: FormData>: Send + Sync {
    /// What the backend returns on success
    type Receipt: Clone + Debug + Send + Sync + 'static;

    /// Submit the form data
    async fn submit(&self, data: &D) -> Result<Self::Receipt, FormError>;
}

/// Key/value store for session-level selections (account, branch)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// Read a stored selection
    async fn get(&self, key: &str) -> Result<Option<String>, FormError>;

    /// Persist a selection
    async fn set(&self, key: &str, value: &str) -> Result<(), FormError>;
}
