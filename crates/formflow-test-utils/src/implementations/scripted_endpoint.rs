//! Scripted submission endpoint for testing.

use crate::fixtures::receipt;
use async_trait::async_trait;
use formflow_core::{FormError, FormState, SubmissionEndpoint, SubmissionReceipt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A submission endpoint that replays scripted responses.
///
/// Once the script is exhausted every call succeeds with a fresh receipt.
/// A gated endpoint holds each call until [`Notify::notify_one`] is called on
/// the gate, which lets tests overlap operations with an in-flight submit.
#[derive(Debug, Default)]
pub struct ScriptedEndpoint {
    responses: Mutex<VecDeque<Result<SubmissionReceipt, FormError>>>,
    submitted: Mutex<Vec<FormState>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    hang: bool,
}

impl ScriptedEndpoint {
    /// Accept every submission
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Replay `responses` in order
    pub fn with_responses(responses: Vec<Result<SubmissionReceipt, FormError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Reject the first submission with a backend message
    pub fn rejecting(message: &str) -> Self {
        Self::with_responses(vec![Err(FormError::BackendRejection(message.to_string()))])
    }

    /// Never answer; for timeout tests
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Hold every call until the returned gate is notified
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Form data received, in call order
    pub fn submitted(&self) -> Vec<FormState> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl SubmissionEndpoint<FormState> for ScriptedEndpoint {
    type Receipt = SubmissionReceipt;

    async fn submit(&self, data: &FormState) -> Result<SubmissionReceipt, FormError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted.lock().push(data.clone());

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let scripted = self.responses.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(receipt(&format!("REF-{:04}", call))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_then_accepts() {
        let endpoint = ScriptedEndpoint::rejecting("Insufficient funds");
        let data = FormState::new();

        assert_eq!(
            endpoint.submit(&data).await,
            Err(FormError::BackendRejection("Insufficient funds".to_string()))
        );
        let receipt = endpoint.submit(&data).await.unwrap();
        assert_eq!(receipt.form_reference_id, "REF-0002");
        assert_eq!(endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_gate_holds_until_notified() {
        let (endpoint, gate) = ScriptedEndpoint::accepting().gated();
        let endpoint = Arc::new(endpoint);

        let task = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.submit(&FormState::new()).await })
        };

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.notify_one();
        assert!(task.await.unwrap().is_ok());
    }
}
