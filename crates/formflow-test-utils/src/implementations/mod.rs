//! Test implementations (fakes) of the engine ports

pub mod recording_handler;
pub mod scripted_endpoint;
pub mod scripted_otp;
