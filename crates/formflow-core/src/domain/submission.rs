use crate::FormError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Submission lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Nothing pending
    Idle,

    /// OTP request is in flight
    OtpRequested,

    /// OTP was sent; the user is entering the code
    OtpVerifying,

    /// Final submission is in flight
    Submitting,

    /// The backend accepted the form; terminal
    Succeeded,

    /// The last OTP request or submission failed; retry is allowed
    Failed,
}

/// Aggregate: submission lifecycle of one form session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionLifecycle {
    status: SubmissionStatus,
    message: Option<String>,
    updated_at: DateTime<Utc>,
}

impl Default for SubmissionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionLifecycle {
    /// Create a lifecycle in `Idle`
    pub fn new() -> Self {
        Self {
            status: SubmissionStatus::Idle,
            message: None,
            updated_at: Utc::now(),
        }
    }

    #[inline]
    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    /// The authoritative status message, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// A network call owned by this lifecycle is pending
    #[inline]
    pub fn is_busy(&self) -> bool {
        matches!(
            self.status,
            SubmissionStatus::OtpRequested | SubmissionStatus::Submitting
        )
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status == SubmissionStatus::Succeeded
    }

    /// Move to `OtpRequested`.
    ///
    /// Refused while `cooldown_remaining` is non-zero, whatever the status;
    /// a failed submission does not shorten the cooldown.
    pub fn begin_otp_request(&mut self, cooldown_remaining: u32) -> Result<(), FormError> {
        match self.status {
            SubmissionStatus::Idle | SubmissionStatus::OtpVerifying | SubmissionStatus::Failed
                if cooldown_remaining > 0 =>
            {
                return Err(FormError::CooldownActive {
                    remaining: cooldown_remaining,
                })
            }
            SubmissionStatus::Idle | SubmissionStatus::OtpVerifying | SubmissionStatus::Failed => {}
            SubmissionStatus::OtpRequested | SubmissionStatus::Submitting => {
                return Err(FormError::AlreadyInFlight(format!(
                    "Cannot request OTP in state: {:?}",
                    self.status
                )))
            }
            SubmissionStatus::Succeeded => {
                return Err(FormError::InvalidTransition(format!(
                    "Cannot request OTP in state: {:?}",
                    self.status
                )))
            }
        }

        self.transition(SubmissionStatus::OtpRequested, None);
        Ok(())
    }

    /// The OTP provider confirmed the send
    pub fn otp_sent(&mut self, message: impl Into<String>) -> Result<(), FormError> {
        self.require(SubmissionStatus::OtpRequested, "complete OTP request")?;
        self.transition(SubmissionStatus::OtpVerifying, Some(message.into()));
        Ok(())
    }

    /// The OTP request failed
    pub fn otp_failed(&mut self, message: impl Into<String>) -> Result<(), FormError> {
        self.require(SubmissionStatus::OtpRequested, "fail OTP request")?;
        self.transition(SubmissionStatus::Failed, Some(message.into()));
        Ok(())
    }

    /// Move to `Submitting`.
    ///
    /// `otp_satisfied` is false when the form requires an OTP and none has
    /// been sent yet.
    pub fn begin_submit(&mut self, otp_satisfied: bool) -> Result<(), FormError> {
        self.check_submit()?;

        if !otp_satisfied {
            return Err(FormError::OtpRequired);
        }

        self.transition(SubmissionStatus::Submitting, None);
        Ok(())
    }

    /// Whether a submission may start from the current status
    pub fn check_submit(&self) -> Result<(), FormError> {
        match self.status {
            SubmissionStatus::Idle | SubmissionStatus::OtpVerifying | SubmissionStatus::Failed => {}
            SubmissionStatus::OtpRequested | SubmissionStatus::Submitting => {
                return Err(FormError::AlreadyInFlight(format!(
                    "Cannot submit in state: {:?}",
                    self.status
                )))
            }
            SubmissionStatus::Succeeded => {
                return Err(FormError::InvalidTransition(format!(
                    "Cannot submit in state: {:?}",
                    self.status
                )))
            }
        }
        Ok(())
    }

    /// The backend accepted the submission
    pub fn succeed(&mut self, message: impl Into<String>) -> Result<(), FormError> {
        self.require(SubmissionStatus::Submitting, "complete submission")?;
        self.transition(SubmissionStatus::Succeeded, Some(message.into()));
        Ok(())
    }

    /// The submission failed; the user may retry
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), FormError> {
        self.require(SubmissionStatus::Submitting, "fail submission")?;
        self.transition(SubmissionStatus::Failed, Some(message.into()));
        Ok(())
    }

    /// Drop any OTP progress and return to `Idle`.
    ///
    /// Submissions in flight and terminal states are left alone.
    pub fn cancel_otp(&mut self) {
        if matches!(
            self.status,
            SubmissionStatus::OtpRequested | SubmissionStatus::OtpVerifying
        ) {
            self.transition(SubmissionStatus::Idle, None);
        }
    }

    /// Replace the status message without changing status
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.updated_at = Utc::now();
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    fn require(&self, expected: SubmissionStatus, action: &str) -> Result<(), FormError> {
        if self.status != expected {
            return Err(FormError::InvalidTransition(format!(
                "Cannot {} in state: {:?}",
                action, self.status
            )));
        }
        Ok(())
    }

    fn transition(&mut self, status: SubmissionStatus, message: Option<String>) {
        self.status = status;
        self.message = message;
        self.updated_at = Utc::now();
    }
}
