use serde::{Deserialize, Serialize};

/// One-time-password state for a form session.
///
/// The cooldown is counted in ticks. It is set on a successful send and
/// decremented by [`OtpSession::tick`]; reaching zero re-enables resend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSession {
    target: Option<String>,
    cooldown: u32,
    message: Option<String>,
    sent: bool,
}

impl OtpSession {
    /// Fresh session: nothing sent, no cooldown
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful send and start the cooldown
    pub fn start(&mut self, target: impl Into<String>, cooldown_ticks: u32, message: impl Into<String>) {
        self.target = Some(target.into());
        self.cooldown = cooldown_ticks;
        self.message = Some(message.into());
        self.sent = true;
    }

    /// Decrement the cooldown by one tick; saturates at zero.
    /// Returns the remaining ticks.
    pub fn tick(&mut self) -> u32 {
        self.cooldown = self.cooldown.saturating_sub(1);
        self.cooldown
    }

    /// Back to the initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    #[inline]
    pub fn can_resend(&self) -> bool {
        self.cooldown == 0
    }

    #[inline]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    #[inline]
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
