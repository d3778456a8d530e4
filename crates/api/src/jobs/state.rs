//! Write job lifecycle.
//!
//! ```text
//! Buffering(received, expected) --received >= expected--> Writing --> Done
//!                                                               \--> Failed
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Collecting submissions. `expected` is the count that completes the
    /// write; zero until the first submission fixes it (unless seeded).
    Buffering { received: usize, expected: usize },
    Writing,
    Done,
    Failed,
}

impl JobState {
    /// Done or failed; accepts nothing further.
    pub fn is_completed(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Buffering { .. } => "buffering",
            JobState::Writing => "writing",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }
}

/// Whether a buffer holding `received` submissions is ready to write.
pub fn ready_to_write(received: usize, expected: usize) -> bool {
    expected > 0 && received >= expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_waits_for_expected_count() {
        assert!(!ready_to_write(0, 0));
        assert!(!ready_to_write(1, 2));
        assert!(ready_to_write(2, 2));
        assert!(ready_to_write(1, 1));
    }

    #[test]
    fn only_terminal_states_are_completed() {
        assert!(!JobState::Buffering { received: 0, expected: 2 }.is_completed());
        assert!(!JobState::Writing.is_completed());
        assert!(JobState::Done.is_completed());
        assert!(JobState::Failed.is_completed());
    }
}
