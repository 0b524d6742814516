use crate::domain::form_definition::FormId;
use crate::domain::validation::ErrorMap;
use crate::types::SessionId;
use crate::FormError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

/// State change notification emitted by a form session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormEvent {
    /// Session the event belongs to
    pub session_id: SessionId,

    /// What happened
    pub kind: FormEventKind,

    /// When it happened
    pub timestamp: DateTime<Utc>,
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormEventKind {
    /// Session created for a form definition
    SessionStarted { form_id: FormId },

    /// Form data was patched
    DataUpdated,

    /// The active step changed
    StepChanged { from: usize, to: usize },

    /// `next` was refused because the step has errors
    StepBlocked { step: usize, errors: ErrorMap },

    /// `next` on the last step passed validation
    ReadyToSubmit { step: usize },

    /// The OTP provider accepted a send
    OtpSent { target: String, cooldown: u32 },

    /// The OTP request failed
    OtpFailed { message: String },

    /// Cooldown reached zero; resend is available
    OtpCooldownElapsed,

    /// OTP state was discarded
    OtpReset,

    /// Final submission started
    SubmissionStarted,

    /// The backend accepted the form
    SubmissionSucceeded,

    /// The submission failed
    SubmissionFailed { message: String },

    /// An account or branch was selected
    SelectionChanged { key: String, value: String },

    /// The session was torn down
    SessionAbandoned,
}

impl FormEvent {
    /// Create an event stamped with the current time
    pub fn new(session_id: SessionId, kind: FormEventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Returns the type of the event as a string
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            FormEventKind::SessionStarted { .. } => "form.session_started",
            FormEventKind::DataUpdated => "form.data_updated",
            FormEventKind::StepChanged { .. } => "form.step_changed",
            FormEventKind::StepBlocked { .. } => "form.step_blocked",
            FormEventKind::ReadyToSubmit { .. } => "form.ready_to_submit",
            FormEventKind::OtpSent { .. } => "form.otp_sent",
            FormEventKind::OtpFailed { .. } => "form.otp_failed",
            FormEventKind::OtpCooldownElapsed => "form.otp_cooldown_elapsed",
            FormEventKind::OtpReset => "form.otp_reset",
            FormEventKind::SubmissionStarted => "form.submission_started",
            FormEventKind::SubmissionSucceeded => "form.submission_succeeded",
            FormEventKind::SubmissionFailed { .. } => "form.submission_failed",
            FormEventKind::SelectionChanged { .. } => "form.selection_changed",
            FormEventKind::SessionAbandoned => "form.session_abandoned",
        }
    }
}

/// Handler for form events
#[async_trait]
pub trait FormEventHandler: Send + Sync {
    /// Handle a form event
    async fn handle_event(&self, event: FormEvent) -> Result<(), FormError>;
}

/// Writes every event to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

#[async_trait]
impl FormEventHandler for TracingEventHandler {
    async fn handle_event(&self, event: FormEvent) -> Result<(), FormError> {
        info!(
            session_id = %event.session_id,
            event_type = event.event_type(),
            "Form event"
        );
        Ok(())
    }
}

/// Forwards events to a tokio channel so a UI layer can subscribe
#[derive(Debug, Clone)]
pub struct ChannelEventHandler {
    sender: mpsc::UnboundedSender<FormEvent>,
}

impl ChannelEventHandler {
    /// Create a handler and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FormEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl FormEventHandler for ChannelEventHandler {
    async fn handle_event(&self, event: FormEvent) -> Result<(), FormError> {
        self.sender
            .send(event)
            .map_err(|e| FormError::EventDelivery(format!("receiver dropped: {}", e)))
    }
}
