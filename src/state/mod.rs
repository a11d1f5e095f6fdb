//! State Management Module
//!
//! Game flags, conversation history, journal and their save-state layout

pub mod flags;
pub mod history;
pub mod save;

pub use flags::*;
pub use history::*;
pub use save::{load_state, save_state, SaveBuffer, SaveError, SeekWhence};
