//! Save-state sync
//!
//! In-memory cursor buffer plus the layout of the persisted conversation
//! state: flags, per-file "seen" masks and the journal. Interpreter stacks
//! and suspension points are never persisted.

use super::flags::FlagSet;
use super::history::{Journal, JournalEntry, TalkHistory, MAX_TALK_FILES};

const SAVE_MAGIC: &[u8; 4] = b"PRLR";
const SAVE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    #[error("Read past end of save data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("Not a parlor save (bad magic)")]
    BadMagic,

    #[error("Unsupported save version {0}")]
    UnsupportedVersion(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekWhence {
    Set,
    Current,
    End,
}

/// Growable byte buffer with a read/write cursor
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SaveBuffer {
    data: Vec<u8>,
    used: usize,
    ptr: usize,
}

impl SaveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes for reading
    pub fn from_bytes(bytes: &[u8]) -> Self {
        SaveBuffer {
            data: bytes.to_vec(),
            used: bytes.len(),
            ptr: 0,
        }
    }

    /// Logical length (high-water mark of bytes written)
    pub fn length(&self) -> usize {
        self.used
    }

    pub fn position(&self) -> usize {
        self.ptr
    }

    /// Read exactly `buf.len()` bytes
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), SaveError> {
        let end = self.ptr + buf.len();
        if end > self.used {
            return Err(SaveError::UnexpectedEof { offset: self.ptr });
        }
        buf.copy_from_slice(&self.data[self.ptr..end]);
        self.ptr = end;
        Ok(())
    }

    pub fn write(&mut self, buf: &[u8]) {
        let end = self.ptr + buf.len();
        if end > self.data.len() {
            self.data.resize(end.max(self.data.len() * 3 / 2), 0);
        }
        self.data[self.ptr..end].copy_from_slice(buf);
        self.ptr = end;
        if self.ptr > self.used {
            self.used = self.ptr;
        }
    }

    /// Move the cursor. Negative results clamp to 0.
    pub fn seek(&mut self, offset: i64, whence: SeekWhence) {
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Current => self.ptr as i64,
            SeekWhence::End => self.used as i64,
        };
        self.ptr = (base + offset).max(0) as usize;
    }

    pub fn read_u8(&mut self) -> Result<u8, SaveError> {
        let mut b = [0u8; 1];
        self.read(&mut b)?;
        Ok(b[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, SaveError> {
        let mut b = [0u8; 2];
        self.read(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write(&[value]);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.write(&value.to_le_bytes());
    }

    /// Consume the buffer, returning the written bytes
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.data.truncate(self.used);
        self.data
    }
}

/// Serialize the persisted part of the game state
pub fn save_state(flags: &FlagSet, history: &TalkHistory, journal: &Journal) -> Vec<u8> {
    let mut buf = SaveBuffer::new();
    buf.write(SAVE_MAGIC);
    buf.write_u8(SAVE_VERSION);

    buf.write_u16_le(flags.as_bytes().len() as u16);
    buf.write(flags.as_bytes());

    for &mask in history.masks() {
        buf.write_u16_le(mask);
    }

    buf.write_u16_le(journal.len() as u16);
    for entry in journal.entries() {
        buf.write_u16_le(entry.file);
        buf.write_u8(entry.statement);
        buf.write_u8(entry.reply_only as u8);
    }
    buf.write_u16_le(journal.index);
    buf.write_u16_le(journal.sub);
    buf.write_u16_le(journal.page);

    buf.into_bytes()
}

/// Restore state written by [`save_state`]
pub fn load_state(
    bytes: &[u8],
    flags: &mut FlagSet,
    history: &mut TalkHistory,
    journal: &mut Journal,
) -> Result<(), SaveError> {
    let mut buf = SaveBuffer::from_bytes(bytes);

    let mut magic = [0u8; 4];
    buf.read(&mut magic)?;
    if &magic != SAVE_MAGIC {
        return Err(SaveError::BadMagic);
    }
    let version = buf.read_u8()?;
    if version != SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion(version));
    }

    let flag_len = buf.read_u16_le()? as usize;
    let mut flag_bytes = vec![0u8; flag_len];
    buf.read(&mut flag_bytes)?;

    let mut masks = vec![0u16; MAX_TALK_FILES];
    for mask in masks.iter_mut() {
        *mask = buf.read_u16_le()?;
    }

    let count = buf.read_u16_le()? as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(JournalEntry {
            file: buf.read_u16_le()?,
            statement: buf.read_u8()?,
            reply_only: buf.read_u8()? != 0,
        });
    }
    let index = buf.read_u16_le()?;
    let sub = buf.read_u16_le()?;
    let page = buf.read_u16_le()?;

    // Only commit once everything parsed
    flags.load_bytes(&flag_bytes);
    history.masks_mut().copy_from_slice(&masks);
    journal.restore(entries, index, sub, page);
    Ok(())
}
