use crate::JointId;
use thiserror::Error;

pub type Result<T, E = MonopodError> = core::result::Result<T, E>;

/// Failures reported by the external control board.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BoardError {
    #[error("board is offline")]
    Offline,
    #[error("board has no slot for joint {0}")]
    MissingSlot(JointId),
    #[error("bus I/O error: {0}")]
    Io(String),
    #[error("encoder index not found for joint {0}")]
    IndexNotFound(JointId),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonopodError {
    #[error("monopod is not initialized")]
    NotInitialized,
    #[error("joint {0} is not readable in the active mode")]
    UnreadableJoint(JointId),
    #[error("joint {0} is not writable in the active mode")]
    UnwritableJoint(JointId),
    #[error("no samples recorded yet for joint {0}")]
    NoData(JointId),
    #[error("expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("invalid mode: {0}")]
    InvalidMode(String),
    #[error("invalid rig config: {0}")]
    InvalidConfig(String),
    #[error("board unavailable: {0}")]
    BoardUnavailable(String),
    #[error("board error: {0}")]
    Board(#[from] BoardError),
}
