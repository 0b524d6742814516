/// Form data trait and the default map-backed form state
pub mod form_state;

/// Form and step definitions
pub mod form_definition;

/// Step sequencing
pub mod sequencer;

/// Validation rule sets and per-step dispatch
pub mod validation;

/// Reusable validation rules
pub mod rules;

/// OTP session state
pub mod otp;

/// Submission lifecycle
pub mod submission;

/// Form events
pub mod events;

/// Collaborator interfaces
pub mod ports;

/// Session-level selections
pub mod context;
