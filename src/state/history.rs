//! Conversation History and Journal
//!
//! Tracks which statements the player has already heard and the ordered
//! journal of first-time statements for later review.

/// Number of talk-file slots in the history table
pub const MAX_TALK_FILES: usize = 500;

/// Statements tracked per talk file (one bit each)
pub const HISTORY_BITS: usize = 16;

/// "Already seen" bitfield, one fixed-width mask per talk file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkHistory {
    seen: Vec<u16>,
}

impl TalkHistory {
    pub fn new() -> Self {
        TalkHistory {
            seen: vec![0; MAX_TALK_FILES],
        }
    }

    /// Has `statement` of talk file `file` been selected before?
    pub fn is_seen(&self, file: u16, statement: usize) -> bool {
        match self.seen.get(file as usize) {
            Some(mask) if statement < HISTORY_BITS => (mask >> statement) & 1 != 0,
            _ => false,
        }
    }

    /// Mark a statement as seen. Statements beyond the mask width are not tracked.
    pub fn mark_seen(&mut self, file: u16, statement: usize) {
        if statement >= HISTORY_BITS {
            log::debug!(
                "Statement {} of talk file {} is past the history width",
                statement,
                file
            );
            return;
        }
        match self.seen.get_mut(file as usize) {
            Some(mask) => *mask |= 1 << statement,
            None => log::warn!("Talk file id {} has no history slot", file),
        }
    }

    /// Raw mask for one talk file
    pub fn mask(&self, file: u16) -> u16 {
        self.seen.get(file as usize).copied().unwrap_or(0)
    }

    pub(crate) fn masks(&self) -> &[u16] {
        &self.seen
    }

    pub(crate) fn masks_mut(&mut self) -> &mut [u16] {
        &mut self.seen
    }

    /// Forget everything (new game)
    pub fn clear(&mut self) {
        self.seen.fill(0);
    }
}

impl Default for TalkHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// One journal record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalEntry {
    /// Talk-file id (see `TalkLibrary`)
    pub file: u16,
    /// Statement index within that file
    pub statement: u8,
    /// Only the reply is worth recording, not the player's prompt
    pub reply_only: bool,
}

/// Ordered journal of recorded statements plus the reader's position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    /// Entry shown at the top of the journal view
    pub index: u16,
    /// Line offset inside that entry
    pub sub: u16,
    /// Current page number
    pub page: u16,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a statement. Repeating the most recent record is ignored.
    pub fn record(&mut self, file: u16, statement: u8, reply_only: bool) {
        let entry = JournalEntry {
            file,
            statement,
            reply_only,
        };
        if self.entries.last() == Some(&entry) {
            return;
        }
        self.entries.push(entry);
        log::debug!("Journal: recorded file {} statement {}", file, statement);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn restore(&mut self, entries: Vec<JournalEntry>, index: u16, sub: u16, page: u16) {
        self.entries = entries;
        self.index = index;
        self.sub = sub;
        self.page = page;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
