//! Testing utilities for the Formflow engine.
//!
//! This crate provides mocks of the collaborator ports, scripted fakes with
//! call counters and release gates, a recording event handler, and fixture
//! forms used across the workspace's integration tests.

pub mod fixtures;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use implementations::recording_handler::RecordingEventHandler;
pub use implementations::scripted_endpoint::ScriptedEndpoint;
pub use implementations::scripted_otp::ScriptedOtpProvider;
