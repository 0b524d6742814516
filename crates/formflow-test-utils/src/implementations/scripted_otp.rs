//! Scripted OTP provider for testing.

use async_trait::async_trait;
use formflow_core::{FormError, OtpDispatch, OtpProvider};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// An OTP provider that replays scripted responses, then succeeds.
#[derive(Debug, Default)]
pub struct ScriptedOtpProvider {
    responses: Mutex<VecDeque<Result<OtpDispatch, FormError>>>,
    targets: Mutex<Vec<String>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    hang_first: AtomicBool,
}

impl ScriptedOtpProvider {
    /// Send every request successfully
    pub fn sending() -> Self {
        Self::default()
    }

    /// Replay `responses` in order
    pub fn with_responses(responses: Vec<Result<OtpDispatch, FormError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Fail the first request with a backend message
    pub fn rejecting(message: &str) -> Self {
        Self::with_responses(vec![Err(FormError::BackendRejection(message.to_string()))])
    }

    /// Never answer the first request; later requests send normally.
    /// For timeout tests.
    pub fn hanging() -> Self {
        Self {
            hang_first: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Hold every call until the returned gate is notified
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Phone numbers requested, in call order
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().clone()
    }
}

#[async_trait]
impl OtpProvider for ScriptedOtpProvider {
    async fn request_otp(&self, phone_number: &str) -> Result<OtpDispatch, FormError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().push(phone_number.to_string());

        if self.hang_first.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let scripted = self.responses.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(OtpDispatch {
                target: phone_number.to_string(),
                message: format!("OTP sent to {}", phone_number),
            })
        })
    }
}
