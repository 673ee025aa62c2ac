//! Load lifecycle: Idle → Streaming → Draining → Verifying → Done

use std::fmt;

/// Where a load is in its lifecycle.
///
/// `Failed` is reachable only from `Streaming` (fatal source error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    /// Pulling batches and dispatching them to workers
    Streaming,
    /// Source exhausted; waiting for in-flight batches
    Draining,
    /// Writer closed; read-only check running
    Verifying,
    Done,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Streaming, Draining)
                | (Streaming, Failed)
                | (Draining, Verifying)
                | (Verifying, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Move to `next`, logging the change.
    pub fn advance(&mut self, next: RunState) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        log::debug!("state: {self} -> {next}");
        *self = next;
        Ok(())
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Verifying => "verifying",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid state transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut s = RunState::default();
        for next in [
            RunState::Streaming,
            RunState::Draining,
            RunState::Verifying,
            RunState::Done,
        ] {
            s.advance(next).unwrap();
        }
        assert!(s.is_terminal());
    }

    #[test]
    fn failure_only_from_streaming() {
        assert!(RunState::Streaming.can_transition_to(RunState::Failed));
        assert!(!RunState::Idle.can_transition_to(RunState::Failed));
        assert!(!RunState::Verifying.can_transition_to(RunState::Failed));
    }

    #[test]
    fn skipping_states_rejected() {
        let mut s = RunState::Streaming;
        let err = s.advance(RunState::Done).unwrap_err();
        assert_eq!(s, RunState::Streaming);
        assert_eq!(err.to_string(), "invalid state transition streaming -> done");
    }

    #[test]
    fn terminal_states_are_final() {
        for from in [RunState::Done, RunState::Failed] {
            for to in [RunState::Idle, RunState::Streaming, RunState::Done] {
                assert!(!from.can_transition_to(to));
            }
        }
    }
}
