//! Core types for the conversation interpreter

use crate::scene::{Dialect, EntityId, SequenceError};

use super::talkfile::TalkFileError;

/// Conversation errors. All of them are fatal for the running conversation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TalkError {
    #[error("Talk file '{0}' not found")]
    MissingFile(String),

    #[error("Malformed talk file '{name}': {source}")]
    File {
        name: String,
        #[source]
        source: TalkFileError,
    },

    #[error("Talk file call stack overflow (limit {limit})")]
    CallStackOverflow { limit: usize },

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("No conversation is loaded")]
    NotLoaded,

    #[error("No statement with talk index {0}")]
    InvalidChoice(usize),

    #[error("Choices can only be made while choosing")]
    NotChoosing,
}

/// Result type for conversation operations
pub type TalkResult<T> = Result<T, TalkError>;

/// What a suspended conversation is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Full page or end of text: input or timeout, then a fresh page
    More { ticks: u32 },
    /// Interruptible pause
    Pause { ticks: u32 },
    /// Pause the player cannot skip
    Hold { ticks: u32 },
    /// Cut-scene animation entity still playing
    Animation(EntityId),
    /// Player still walking
    Walk,
    /// Host cut-scene still playing
    CutScene,
    /// Scene change requested; resumes through `resume_after_scene`
    Scene(u8),
}

impl Wait {
    /// Waits on work done outside the interpreter, which an abort cancels
    pub fn is_external(&self) -> bool {
        matches!(self, Wait::Animation(_) | Wait::Walk | Wait::CutScene)
    }

    pub(crate) fn ticks(&self) -> u32 {
        match self {
            Wait::More { ticks } | Wait::Pause { ticks } | Wait::Hold { ticks } => *ticks,
            _ => 0,
        }
    }
}

/// Player input seen during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Input {
    #[default]
    None,
    Key(char),
    Click,
}

impl Input {
    pub fn is_some(&self) -> bool {
        !matches!(self, Input::None)
    }
}

/// Result of one `Talk::update` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkStatus {
    /// Waiting for the player to pick a statement
    Choosing,
    /// One unit of work done; call again
    Running,
    /// Suspended until the wait is satisfied
    Waiting(Wait),
    /// Conversation ended normally
    Completed,
    /// Cancelled mid-script; stacks are preserved
    Aborted,
}

/// Tunables for the interpreter and its text window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkConfig {
    pub dialect: Dialect,
    /// Text width of the dialogue window in pixels
    pub window_width: u32,
    /// Lines per page, including the speaker header
    pub page_lines: usize,
    /// Statements shown at once while choosing
    pub choice_rows: usize,
    /// Minimum ticks before a full page advances by itself
    pub page_ticks: u32,
    pub player_name: String,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Scalpel,
            window_width: 300,
            page_lines: 5,
            choice_rows: 6,
            page_ticks: 160,
            player_name: "Sherlock Holmes".to_string(),
        }
    }
}
