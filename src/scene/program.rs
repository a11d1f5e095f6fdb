//! Sequence program decoding
//!
//! A sequence program is a per-entity byte stream. Bytes below 128 are frame
//! numbers (1-based image index); 0 terminates a segment and is followed by
//! a segment selector. Bytes of 128 and above are control codes whose
//! operand width is fixed by the code value and the [`Dialect`].

use std::fmt;

use super::entity::Point;
use super::types::SequenceError;

/// End-of-segment marker
pub const END_OF_SEQUENCE: u8 = 0;
/// Set positional delta
pub const DELTA_CODE: u8 = 128;
/// Teleport to absolute position
pub const TELEPORT_CODE: u8 = 129;
/// First loop code; the loop count is `code - LOOP_CODE`
pub const LOOP_CODE: u8 = 130;
/// First sound code
pub const SOUND_CODE: u8 = 162;
/// Flip codes: clear, set, toggle
pub const FLIP_CODE: u8 = 192;
/// Call a conversation file
pub const CALL_TALK_CODE: u8 = 195;
/// Hide / show / toggle another scene object
pub const HIDE_CODE: u8 = 196;
/// First "use" slot code
pub const USE_CODE: u8 = 197;
/// First loop-target code; targets frame `code - SEQ_TO_CODE + 1`
pub const SEQ_TO_CODE: u8 = 200;
/// First goto code; the sub-sequence is `code - GOTO_CODE`
pub const GOTO_CODE: u8 = 228;

/// Number of "use" slots per entity
pub const USE_COUNT: usize = 3;
/// Segment selector meaning "turn the object off"
pub const HIDE_SEQUENCE: u8 = 99;
/// Length of an embedded file name
pub const NAME_LEN: usize = 8;

/// Encoding variant of the two supported games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Segment selectors of 128 and above are loops (count = selector - 128),
    /// sound codes are 1-based and deltas are two sign-magnitude bytes.
    #[default]
    Scalpel,
    /// Segment selectors are plain sequence numbers, sound codes are
    /// 0-based and deltas are two little-endian i16 values.
    Tattoo,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Scalpel => "scalpel",
            Dialect::Tattoo => "tattoo",
        }
    }

    /// Operand width of the delta code
    pub fn delta_width(&self) -> usize {
        match self {
            Dialect::Scalpel => 2,
            Dialect::Tattoo => 4,
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalpel" | "serrated" => Ok(Dialect::Scalpel),
            "tattoo" | "rose" => Ok(Dialect::Tattoo),
            other => Err(format!("Unknown dialect '{}'", other)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mirror flag operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOp {
    Clear,
    Set,
    Toggle,
}

/// Visibility operation applied to another object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOp {
    Hide,
    Show,
    Toggle,
}

/// Decoded segment selector following an end-of-segment marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Last byte of the program; restart at the beginning
    Restart,
    /// Freeze on the previous frame
    Freeze,
    /// Jump to a segment
    Segment(u8),
    /// Loop the current segment this many times
    Loop(u8),
}

/// One decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqInstr {
    Frame(u8),
    End(Selector),
    Delta(Point),
    Teleport(Point),
    Loop(u8),
    Sound(Option<usize>),
    Flip(FlipOp),
    CallTalk(String),
    Visibility { object: u16, op: VisibilityOp },
    Use(usize),
    SeqTo(u8),
    Goto(u8),
}

impl SeqInstr {
    /// Operand bytes following the code
    pub fn width(&self, dialect: Dialect) -> usize {
        match self {
            SeqInstr::End(Selector::Restart) => 0,
            SeqInstr::End(_) => 1,
            SeqInstr::Delta(_) => dialect.delta_width(),
            SeqInstr::Teleport(_) => 4,
            SeqInstr::CallTalk(_) => NAME_LEN,
            SeqInstr::Visibility { .. } => 3,
            _ => 0,
        }
    }
}

/// Per-entity sequence program bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceProgram {
    bytes: Vec<u8>,
}

impl SequenceProgram {
    pub fn new(bytes: Vec<u8>) -> Self {
        SequenceProgram { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Overwrite one byte in place (loop-target stepping)
    pub(crate) fn put(&mut self, index: usize, value: u8) {
        if let Some(b) = self.bytes.get_mut(index) {
            *b = value;
        }
    }

    fn operands(&self, index: usize, width: usize) -> Result<&[u8], SequenceError> {
        self.bytes
            .get(index + 1..index + 1 + width)
            .ok_or(SequenceError::Truncated {
                index,
                code: self.bytes[index],
            })
    }

    /// Decode the instruction at `index`
    pub fn decode_at(&self, index: usize, dialect: Dialect) -> Result<SeqInstr, SequenceError> {
        let code = *self
            .bytes
            .get(index)
            .ok_or(SequenceError::OutOfBounds { index })?;

        let instr = match code {
            END_OF_SEQUENCE => match self.bytes.get(index + 1) {
                None => SeqInstr::End(Selector::Restart),
                Some(&HIDE_SEQUENCE) => SeqInstr::End(Selector::Freeze),
                Some(&sel) if sel >= 128 && dialect == Dialect::Scalpel => {
                    SeqInstr::End(Selector::Loop(sel - 128))
                }
                Some(&sel) => SeqInstr::End(Selector::Segment(sel)),
            },
            1..=127 => SeqInstr::Frame(code),
            DELTA_CODE => {
                let ops = self.operands(index, dialect.delta_width())?;
                SeqInstr::Delta(match dialect {
                    Dialect::Scalpel => Point::new(sign_magnitude(ops[0]), sign_magnitude(ops[1])),
                    Dialect::Tattoo => Point::new(
                        i16::from_le_bytes([ops[0], ops[1]]) as i32,
                        i16::from_le_bytes([ops[2], ops[3]]) as i32,
                    ),
                })
            }
            TELEPORT_CODE => {
                let ops = self.operands(index, 4)?;
                SeqInstr::Teleport(Point::new(
                    u16::from_le_bytes([ops[0], ops[1]]) as i32,
                    u16::from_le_bytes([ops[2], ops[3]]) as i32,
                ))
            }
            c if c >= LOOP_CODE && c < SOUND_CODE => SeqInstr::Loop(c - LOOP_CODE),
            c if c >= SOUND_CODE && c < FLIP_CODE => {
                let n = (c - SOUND_CODE) as usize;
                SeqInstr::Sound(match dialect {
                    Dialect::Scalpel => n.checked_sub(1),
                    Dialect::Tattoo => Some(n),
                })
            }
            c if c >= FLIP_CODE && c < CALL_TALK_CODE => SeqInstr::Flip(match c - FLIP_CODE {
                0 => FlipOp::Clear,
                1 => FlipOp::Set,
                _ => FlipOp::Toggle,
            }),
            CALL_TALK_CODE => {
                let ops = self.operands(index, NAME_LEN)?;
                SeqInstr::CallTalk(padded_name(ops))
            }
            HIDE_CODE => {
                let ops = self.operands(index, 3)?;
                SeqInstr::Visibility {
                    object: u16::from_le_bytes([ops[0], ops[1]]),
                    op: match ops[2] {
                        0 => VisibilityOp::Hide,
                        1 => VisibilityOp::Show,
                        _ => VisibilityOp::Toggle,
                    },
                }
            }
            c if c >= USE_CODE && c < SEQ_TO_CODE => SeqInstr::Use((c - USE_CODE) as usize),
            c if c >= SEQ_TO_CODE && c < GOTO_CODE => SeqInstr::SeqTo(c - SEQ_TO_CODE + 1),
            c => SeqInstr::Goto(c - GOTO_CODE),
        };
        Ok(instr)
    }

    /// Index of the first byte of the segment containing `index`
    pub fn segment_start_of(&self, index: usize, dialect: Dialect) -> usize {
        let mut start = 0;
        let mut i = 0;
        while i < index && i < self.bytes.len() {
            match self.decode_at(i, dialect) {
                Ok(instr @ SeqInstr::End(_)) => {
                    i += 1 + instr.width(dialect);
                    if i <= index {
                        start = i;
                    }
                }
                Ok(instr) => i += 1 + instr.width(dialect),
                Err(_) => break,
            }
        }
        start
    }

    /// Index of the first byte of segment `seq`, or 0 if there is no such segment
    pub fn segment_index(&self, seq: u8, dialect: Dialect) -> usize {
        if seq == 0 {
            return 0;
        }
        let mut count = 0;
        let mut i = 0;
        while i < self.bytes.len() {
            match self.decode_at(i, dialect) {
                Ok(instr @ SeqInstr::End(_)) => {
                    i += 1 + instr.width(dialect);
                    count += 1;
                    if count == seq {
                        return if i < self.bytes.len() { i } else { 0 };
                    }
                }
                Ok(instr) => i += 1 + instr.width(dialect),
                Err(_) => break,
            }
        }
        0
    }
}

impl From<Vec<u8>> for SequenceProgram {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SequenceProgram {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

/// Byte code for a loop-target on frame `target`
pub fn seq_to_code(target: u8) -> u8 {
    SEQ_TO_CODE + target - 1
}

/// Values above 128 are negative magnitudes, the rest are stored +1
fn sign_magnitude(b: u8) -> i32 {
    if b > 128 {
        -((b - 128) as i32)
    } else {
        b as i32 - 1
    }
}

/// Decode an 8-byte name padded with `~` or NUL
pub fn padded_name(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == b'~' || b == 0)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
