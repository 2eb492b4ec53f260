//! Checkpoint actions of the identifier-addressed API generation

use std::fmt;
use std::str::FromStr;

/// Action a solver may be asked to perform around a coupling step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointAction {
    /// Initial data has to be written before `initialize`
    WriteInitialData,
    /// Solver state must be saved before the first iteration of a window
    WriteIterationCheckpoint,
    /// Solver state must be restored because the window is repeated
    ReadIterationCheckpoint,
}

impl CheckpointAction {
    pub const ALL: [CheckpointAction; 3] = [
        CheckpointAction::WriteInitialData,
        CheckpointAction::WriteIterationCheckpoint,
        CheckpointAction::ReadIterationCheckpoint,
    ];

    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointAction::WriteInitialData => "write-initial-data",
            CheckpointAction::WriteIterationCheckpoint => "write-iteration-checkpoint",
            CheckpointAction::ReadIterationCheckpoint => "read-iteration-checkpoint",
        }
    }
}

impl fmt::Display for CheckpointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckpointAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown action: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_parse_back() {
        for action in CheckpointAction::ALL {
            assert_eq!(action.as_str().parse::<CheckpointAction>(), Ok(action));
        }
    }

    #[test]
    fn test_unknown_action() {
        assert!("write-checkpoint".parse::<CheckpointAction>().is_err());
        // Names are case-sensitive on the wire
        assert!("Write-Initial-Data".parse::<CheckpointAction>().is_err());
    }
}
