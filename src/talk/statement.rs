//! Statements and the choice list
//!
//! A [`Statement`] keeps its fields exactly as stored in the talk file so a
//! loaded file re-serializes byte for byte; the accessors decode them.

use crate::state::FlagSet;

/// Prompt prefix of a statement whose reply runs without being chosen
pub const REPLY_FIRST_PREFIX: u8 = b'*';
/// Prompt prefix of a reply that runs with no visible text
pub const STEALTH_PREFIX: u8 = b'^';
/// Portrait side bit that mirrors the player's portrait
pub const REVERSE_DIRECTION: u8 = 0x80;

/// One selectable line of dialogue and its reply program
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statement {
    pub prompt: Vec<u8>,
    pub reply: Vec<u8>,
    pub link: Vec<u8>,
    pub voice: Vec<u8>,
    pub required: Vec<i16>,
    pub modified: Vec<i16>,
    pub portrait_side: u8,
    pub quotient: u16,
    /// Dense index among visible statements, -1 when hidden
    pub talk_map: i32,
}

/// Horizontal portrait position for a side selector
pub fn portrait_x(side: u8) -> i32 {
    match side & 3 {
        2 => 220,
        3 => 120,
        _ => 20,
    }
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

fn name(bytes: &[u8]) -> Option<String> {
    let s = until_nul(bytes);
    if s.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(s).into_owned())
    }
}

impl Statement {
    pub fn prompt_text(&self) -> String {
        String::from_utf8_lossy(until_nul(&self.prompt)).into_owned()
    }

    /// Reply bytes up to the terminating NUL
    pub fn reply_program(&self) -> &[u8] {
        until_nul(&self.reply)
    }

    pub fn link_name(&self) -> Option<String> {
        name(&self.link)
    }

    pub fn voice_name(&self) -> Option<String> {
        name(&self.voice)
    }

    pub fn is_reply_first(&self) -> bool {
        self.prompt.first() == Some(&REPLY_FIRST_PREFIX)
    }

    pub fn is_stealth(&self) -> bool {
        self.prompt.first() == Some(&STEALTH_PREFIX)
    }

    /// Runs as soon as it becomes the entry statement
    pub fn runs_immediately(&self) -> bool {
        self.is_reply_first() || self.is_stealth()
    }

    pub fn is_visible(&self) -> bool {
        self.talk_map >= 0
    }

    /// Horizontal portrait position selected by the side byte
    pub fn portrait_x(&self) -> i32 {
        portrait_x(self.portrait_side)
    }

    pub fn flips_portrait(&self) -> bool {
        self.portrait_side & REVERSE_DIRECTION != 0
    }
}

/// Statements of the loaded file and the choice-list scroll position
#[derive(Debug, Clone, Default)]
pub struct StatementStore {
    statements: Vec<Statement>,
    scroll: usize,
}

impl StatementStore {
    pub fn new(statements: Vec<Statement>, flags: &FlagSet) -> Self {
        let mut store = Self {
            statements,
            scroll: 0,
        };
        store.set_talk_map(flags);
        store
    }

    /// Number visible statements densely, in file order
    pub fn set_talk_map(&mut self, flags: &FlagSet) {
        let mut next = 0;
        for s in &mut self.statements {
            if flags.all(&s.required) {
                s.talk_map = next;
                next += 1;
            } else {
                s.talk_map = -1;
            }
        }
        if self.scroll >= self.statements.len() || !self.statements[self.scroll].is_visible() {
            self.scroll = self.first_visible_from(0).unwrap_or(0);
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// File index of the statement with talk-map index `talk_map`
    pub fn by_talk_map(&self, talk_map: usize) -> Option<usize> {
        self.statements
            .iter()
            .position(|s| s.talk_map == talk_map as i32)
    }

    /// The first visible statement, run when a file is entered
    pub fn entry(&self) -> Option<usize> {
        self.by_talk_map(0)
    }

    /// Indices of all visible statements
    pub fn visible(&self) -> Vec<usize> {
        (0..self.statements.len())
            .filter(|&i| self.statements[i].is_visible())
            .collect()
    }

    fn first_visible_from(&self, start: usize) -> Option<usize> {
        (start..self.statements.len()).find(|&i| self.statements[i].is_visible())
    }

    /// Up to `rows` visible statements starting at the scroll position
    pub fn choices(&self, rows: usize) -> Vec<usize> {
        (self.scroll..self.statements.len())
            .filter(|&i| self.statements[i].is_visible())
            .take(rows)
            .collect()
    }

    pub fn can_scroll_up(&self) -> bool {
        (0..self.scroll).any(|i| self.statements[i].is_visible())
    }

    pub fn can_scroll_down(&self, rows: usize) -> bool {
        self.visible().iter().filter(|&&i| i >= self.scroll).count() > rows
    }

    pub fn scroll_up(&mut self) -> bool {
        match (0..self.scroll).rev().find(|&i| self.statements[i].is_visible()) {
            Some(i) => {
                self.scroll = i;
                true
            }
            None => false,
        }
    }

    pub fn scroll_down(&mut self, rows: usize) -> bool {
        if !self.can_scroll_down(rows) {
            return false;
        }
        match self.first_visible_from(self.scroll + 1) {
            Some(i) => {
                self.scroll = i;
                true
            }
            None => false,
        }
    }
}
