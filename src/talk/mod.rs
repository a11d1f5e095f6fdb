//! Conversation scripts
//!
//! Talk files hold statements the player can choose; each statement carries
//! a reply program of text and opcodes run by [`Talk`].

pub mod interpreter;
pub mod opcode;
pub mod script;
pub mod statement;
pub mod talkfile;
pub mod types;
pub mod window;

pub use interpreter::{Choice, Phase, Talk};
pub use opcode::Opcode;
pub use statement::{Statement, StatementStore};
pub use talkfile::{TalkFile, TalkFileError};
pub use types::{Input, TalkConfig, TalkError, TalkResult, TalkStatus, Wait};
pub use window::TalkWindow;
