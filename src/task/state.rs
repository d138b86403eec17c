/// Lifecycle of a fork/join task.
///
/// `Pending -> Computing -> Completed | Failed`. The first transition
/// happens exactly once; the last two states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    Pending = 0,
    Computing = 1,
    Completed = 2,
    Failed = 3,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Pending,
            1 => TaskState::Computing,
            2 => TaskState::Completed,
            _ => TaskState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Computing.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn test_u8_mapping() {
        for state in [
            TaskState::Pending,
            TaskState::Computing,
            TaskState::Completed,
            TaskState::Failed,
        ] {
            assert_eq!(TaskState::from_u8(state as u8), state);
        }
    }
}
