//! Error types for the scene and sequencer

use super::entity::EntityId;

/// Sequence program errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// Operands of a control code run past the end of the program
    #[error("Control code {code} at index {index} is truncated")]
    Truncated { index: usize, code: u8 },

    /// Frame index outside the program
    #[error("Frame index {index} is outside the program")]
    OutOfBounds { index: usize },

    /// Program never terminates within the scan limit
    #[error("Sequence for '{name}' exceeds {limit} steps")]
    Overflow { name: String, limit: usize },

    /// Entity id not present in the arena
    #[error("No entity with id {0:?}")]
    MissingEntity(EntityId),

    /// Cut-scene animation index not defined for the scene
    #[error("No cut-scene animation {0}")]
    MissingAnimation(usize),

    /// No free entity slot left
    #[error("Scene holds at most {limit} entities")]
    ArenaFull { limit: usize },

    /// Too many nested speaking overrides
    #[error("Sequence stack overflow (limit {limit})")]
    StackOverflow { limit: usize },
}

/// Result type for sequencer operations
pub type SequenceResult<T> = Result<T, SequenceError>;
