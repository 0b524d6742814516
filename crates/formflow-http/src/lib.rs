//! HTTP adapters for the Formflow engine
//!
//! [`HttpTransport`] talks to the banking backend over reqwest. The REST
//! gateways implement the engine's OTP and submission ports on top of any
//! [`formflow_core::Transport`], so they can be exercised with a mock
//! transport as well.

pub mod config;
pub mod error;
pub mod gateway;
pub mod transport;

pub use config::HttpConfig;
pub use error::HttpError;
pub use gateway::{Envelope, RestOtpProvider, RestSubmissionEndpoint};
pub use transport::HttpTransport;
