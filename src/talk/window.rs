//! Dialogue window
//!
//! Holds the visible page of reply text. Line position and character count
//! persist across opcodes until the page is flushed.

use crate::host::Host;

/// Byte that opens a comment in reply text
pub const COMMENT_OPEN: u8 = b'{';
/// Byte that closes a comment
pub const COMMENT_CLOSE: u8 = b'}';

/// Is `b` printable reply text?
pub fn is_text(b: u8) -> bool {
    b != 0 && b < 128 && b != COMMENT_OPEN
}

#[derive(Debug, Clone, Default)]
pub struct TalkWindow {
    open: bool,
    width: u32,
    page_lines: usize,
    header: Option<String>,
    lines: Vec<String>,
    char_count: usize,
    /// Every line shown since the conversation started, in order
    transcript: Vec<String>,
}

impl TalkWindow {
    pub fn new(width: u32, page_lines: usize) -> Self {
        Self {
            width,
            page_lines: page_lines.max(2),
            ..Default::default()
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.clear_page();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Start a fresh page
    pub fn clear_page(&mut self) {
        self.header = None;
        self.lines.clear();
        self.char_count = 0;
    }

    /// Name shown on the first line of the page
    pub fn set_header(&mut self, name: Option<String>) {
        self.header = name;
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn has_text(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Characters on the current page
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    /// Text lines a page holds; the header takes one
    pub fn capacity(&self) -> usize {
        if self.header.is_some() {
            self.page_lines - 1
        } else {
            self.page_lines
        }
    }

    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.capacity()
    }

    pub fn push_line(&mut self, line: String) {
        self.open = true;
        self.char_count += line.len();
        self.transcript.push(line.clone());
        self.lines.push(line);
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Lay out the next line of text starting at `pos`.
    ///
    /// Returns the line and the offset of the first byte after it. The line
    /// is broken at the last space that keeps it within the window width; a
    /// word wider than the window is broken where it overflows.
    pub fn wrap(&self, data: &[u8], pos: usize, host: &dyn Host) -> (String, usize) {
        let mut end = pos;
        let mut last_space = None;
        let mut overflow = false;
        while end < data.len() && is_text(data[end]) {
            let candidate: String = data[pos..=end].iter().map(|&b| b as char).collect();
            if host.string_width(&candidate) > self.width {
                overflow = true;
                break;
            }
            if data[end] == b' ' {
                last_space = Some(end);
            }
            end += 1;
        }

        if overflow {
            match last_space {
                Some(sp) if sp > pos => end = sp,
                _ if end == pos => end = pos + 1,
                _ => {}
            }
        }

        let line: String = data[pos..end].iter().map(|&b| b as char).collect();
        let mut next = end;
        if overflow && data.get(next) == Some(&b' ') {
            next += 1;
        }
        (line.trim_end().to_string(), next)
    }
}
