//! Reply script cursor and call frames
//!
//! A script is the reply program of the selected statement plus a byte
//! offset. Calling another talk file saves the caller's position in a
//! bounded stack of call frames.

use super::opcode::{ELSE_STATEMENT, END_IF_STATEMENT};
use super::window::COMMENT_CLOSE;

/// Maximum nesting of talk file calls
pub const MAX_CALL_DEPTH: usize = 9;

/// Saved resume point of a talk file that called another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub file: String,
    /// Offset of the byte after the call opcode
    pub resume: usize,
    /// File index of the statement that was running
    pub statement: usize,
    /// Stealth mode of the caller at the call
    pub stealth: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    /// Push a frame; `false` if the stack is full
    pub fn push(&mut self, frame: CallFrame) -> bool {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return false;
        }
        self.frames.push(frame);
        true
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Reply program being executed
#[derive(Debug, Clone, Default)]
pub struct Script {
    bytes: Vec<u8>,
    pub pos: usize,
}

impl Script {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            pos: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied().filter(|&b| b != 0)
    }

    pub fn at_end(&self) -> bool {
        self.peek().is_none()
    }

    /// Move past the next `target` byte, scanning linearly. Returns false
    /// and moves to the end when there is none.
    fn skip_past(&mut self, targets: &[u8]) -> bool {
        match self.bytes[self.pos.min(self.bytes.len())..]
            .iter()
            .position(|b| targets.contains(b))
        {
            Some(i) => {
                self.pos += i + 1;
                true
            }
            None => {
                self.pos = self.bytes.len();
                false
            }
        }
    }

    /// Failed `if`: continue after the next else or end-if
    pub fn skip_to_else(&mut self) -> bool {
        self.skip_past(&[ELSE_STATEMENT, END_IF_STATEMENT])
    }

    /// `else` reached from a taken branch: continue after the next end-if
    pub fn skip_to_end_if(&mut self) -> bool {
        self.skip_past(&[END_IF_STATEMENT])
    }

    /// Skip a `{...}` comment starting at the current byte
    pub fn skip_comment(&mut self) {
        self.skip_past(&[COMMENT_CLOSE]);
    }
}
