//!
//! Formflow Core - multi-step form orchestration for banking forms
//!
//! This crate owns step sequencing, per-step validation and the submission
//! lifecycle (OTP request, resend cooldown, final submission). Transport,
//! persistence and rendering are reached through the traits in
//! [`domain::ports`].

#![forbid(unsafe_code)]

/// Domain layer - form models, validation and lifecycle rules
pub mod domain;

/// Application services - the form session controller
pub mod application;

/// Engine configuration
pub mod config;

/// Core value types
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use config::EngineConfig;
pub use error::{FormError, TransportError};
pub use types::{is_missing, FieldValue, SessionId, SubmissionReceipt};

pub use application::form_session::{
    FormSession, FormSessionBuilder, ResendOutcome, SessionSnapshot, StepOutcome,
};
pub use domain::context::{Selection, SessionContext, SELECTED_ACCOUNT_KEY, SELECTED_BRANCH_KEY};
pub use domain::events::{
    ChannelEventHandler, FormEvent, FormEventHandler, FormEventKind, TracingEventHandler,
};
pub use domain::form_definition::{FormDefinition, FormId, StepDefinition};
pub use domain::form_state::{FormData, FormState};
pub use domain::otp::OtpSession;
pub use domain::ports::{
    OtpDispatch, OtpProvider, SelectionStore, SubmissionEndpoint, Transport, TransportResponse,
};
pub use domain::rules;
pub use domain::sequencer::{Advance, StepSequencer};
pub use domain::submission::{SubmissionLifecycle, SubmissionStatus};
pub use domain::validation::{ErrorMap, Rule, ValidationRuleSet, ValidatorDispatch};
