//! REST adapters for the OTP and submission ports.
//!
//! The backend wraps every answer in `{success, message, data}`. A refusal
//! (`success: false`) becomes [`FormError::BackendRejection`] carrying the
//! backend message untouched; a non-2xx status becomes
//! [`TransportError::Status`].

use async_trait::async_trait;
use formflow_core::{
    FormData, FormError, OtpDispatch, OtpProvider, SubmissionEndpoint, Transport, TransportError,
    TransportResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_ERROR_BODY: usize = 512;

/// Response envelope used by the banking backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    /// Decode an envelope from a transport response
    pub fn from_response(response: TransportResponse) -> Result<Self, FormError> {
        if !response.is_success() {
            let mut body = match response.body {
                Value::String(text) => text,
                other => other.to_string(),
            };
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(TransportError::Status {
                status: response.status,
                body,
            }
            .into());
        }

        let envelope: Envelope = serde_json::from_value(response.body)
            .map_err(|e| TransportError::Decode(format!("Invalid response envelope: {}", e)))?;

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "The request was rejected".to_string());
            warn!("Backend rejected request: {}", message);
            return Err(FormError::BackendRejection(message));
        }

        Ok(envelope)
    }
}

/// [`OtpProvider`] that POSTs `{"phoneNumber": ...}` to the backend
pub struct RestOtpProvider<T: Transport + ?Sized> {
    transport: Arc<T>,
    path: String,
}

impl<T: Transport + ?Sized> RestOtpProvider<T> {
    pub fn new(transport: Arc<T>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }
}

#[async_trait]
impl<T: Transport + ?Sized> OtpProvider for RestOtpProvider<T> {
    async fn request_otp(&self, phone_number: &str) -> Result<OtpDispatch, FormError> {
        let response = self
            .transport
            .post(&self.path, json!({ "phoneNumber": phone_number }))
            .await?;
        let envelope = Envelope::from_response(response)?;

        info!(phone = %phone_number, "OTP dispatched");
        Ok(OtpDispatch {
            target: phone_number.to_string(),
            message: envelope
                .message
                .unwrap_or_else(|| format!("A verification code was sent to {}", phone_number)),
        })
    }
}

/// [`SubmissionEndpoint`] that POSTs the serialised form to one path and
/// decodes `data` into the receipt type `R`
pub struct RestSubmissionEndpoint<T: Transport + ?Sized, R> {
    transport: Arc<T>,
    path: String,
    _receipt: PhantomData<fn() -> R>,
}

impl<T: Transport + ?Sized, R> RestSubmissionEndpoint<T, R> {
    pub fn new(transport: Arc<T>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
            _receipt: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl<T, D, R> SubmissionEndpoint<D> for RestSubmissionEndpoint<T, R>
where
    T: Transport + ?Sized,
    D: FormData + Serialize,
    R: DeserializeOwned + Clone + Debug + Send + Sync + 'static,
{
    type Receipt = R;

    async fn submit(&self, data: &D) -> Result<R, FormError> {
        let body = serde_json::to_value(data)?;
        let response = self.transport.post(&self.path, body).await?;
        let envelope = Envelope::from_response(response)?;

        let data = envelope
            .data
            .ok_or_else(|| TransportError::Decode("Response is missing data".to_string()))?;
        let receipt = serde_json::from_value(data)
            .map_err(|e| TransportError::Decode(format!("Invalid receipt: {}", e)))?;

        info!(path = %self.path, "Form submitted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_envelope_rejection_is_verbatim() {
        let response = TransportResponse::new(
            200,
            json!({"success": false, "message": "Cheque already stopped"}),
        );
        assert_eq!(
            Envelope::from_response(response).unwrap_err(),
            FormError::BackendRejection("Cheque already stopped".to_string())
        );
    }

    #[test]
    fn test_envelope_rejection_without_message() {
        let response = TransportResponse::new(200, json!({"success": false}));
        assert_eq!(
            Envelope::from_response(response).unwrap_err(),
            FormError::BackendRejection("The request was rejected".to_string())
        );
    }

    #[test]
    fn test_error_status_body_is_truncated() {
        let response = TransportResponse::new(500, Value::String("x".repeat(2_000)));
        match Envelope::from_response(response).unwrap_err() {
            FormError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_envelope() {
        let response = TransportResponse::new(200, json!({"ok": true}));
        assert!(matches!(
            Envelope::from_response(response),
            Err(FormError::Transport(TransportError::Decode(_)))
        ));
    }
}
