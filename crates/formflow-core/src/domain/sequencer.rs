use crate::FormError;
use serde::{Deserialize, Serialize};

/// Result of asking the sequencer to move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next step
    Moved {
        /// Step left
        from: usize,
        /// Step entered
        to: usize,
    },
    /// Already on the last step; the host should submit
    SubmitRequested,
}

/// Tracks the active step of a form session.
///
/// Every transition is caller-initiated. `advance` does not check validation;
/// the session controller only calls it after the step's rules passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSequencer {
    current: usize,
    total: usize,
}

impl StepSequencer {
    /// Create a sequencer positioned on step 0
    pub fn new(total: usize) -> Result<Self, FormError> {
        if total == 0 {
            return Err(FormError::InvalidDefinition(
                "A form needs at least one step".to_string(),
            ));
        }
        Ok(Self { current: 0, total })
    }

    /// Active step index
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Total number of steps
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn is_first_step(&self) -> bool {
        self.current == 0
    }

    #[inline]
    pub fn is_last_step(&self) -> bool {
        self.current == self.total - 1
    }

    /// Move forward one step, or signal submission from the last step
    pub fn advance(&mut self) -> Advance {
        if self.is_last_step() {
            return Advance::SubmitRequested;
        }
        let from = self.current;
        self.current += 1;
        Advance::Moved {
            from,
            to: self.current,
        }
    }

    /// Move back one step; a no-op on step 0. Returns the new index.
    pub fn retreat(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Jump directly to a step, clamping out-of-range indices. Returns the
    /// new index.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.current = index.min(self.total - 1);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_steps_rejected() {
        assert!(matches!(
            StepSequencer::new(0),
            Err(FormError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_advance_through_steps() {
        let mut seq = StepSequencer::new(3).unwrap();
        assert!(seq.is_first_step());

        assert_eq!(seq.advance(), Advance::Moved { from: 0, to: 1 });
        assert_eq!(seq.advance(), Advance::Moved { from: 1, to: 2 });
        assert!(seq.is_last_step());

        // Last step signals submit every call and never moves
        assert_eq!(seq.advance(), Advance::SubmitRequested);
        assert_eq!(seq.advance(), Advance::SubmitRequested);
        assert_eq!(seq.current(), 2);
    }

    #[test]
    fn test_retreat_is_idempotent_at_floor() {
        let mut seq = StepSequencer::new(2).unwrap();
        assert_eq!(seq.retreat(), 0);
        assert_eq!(seq.retreat(), 0);

        seq.advance();
        assert_eq!(seq.retreat(), 0);
    }

    #[test]
    fn test_go_to_clamps() {
        let mut seq = StepSequencer::new(4).unwrap();
        assert_eq!(seq.go_to(2), 2);
        assert_eq!(seq.go_to(99), 3);
        assert!(seq.is_last_step());
        assert_eq!(seq.go_to(0), 0);
    }

    #[test]
    fn test_single_step_form_is_first_and_last() {
        let mut seq = StepSequencer::new(1).unwrap();
        assert!(seq.is_first_step());
        assert!(seq.is_last_step());
        assert_eq!(seq.advance(), Advance::SubmitRequested);
        assert_eq!(seq.retreat(), 0);
    }

    #[test]
    fn test_bounds_hold_under_mixed_sequences() {
        for total in 1..6usize {
            let mut seq = StepSequencer::new(total).unwrap();
            // Deterministic pseudo-random walk over the three operations
            let mut x: u64 = 0x9E37_79B9 ^ total as u64;
            for _ in 0..200 {
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                match x % 3 {
                    0 => {
                        seq.advance();
                    }
                    1 => {
                        seq.retreat();
                    }
                    _ => {
                        seq.go_to((x % 10) as usize);
                    }
                }
                assert!(seq.current() < total);
            }
        }
    }
}
