//! Scene entities
//!
//! Entities live in an arena owned by [`super::Scene`] and are addressed by
//! stable [`EntityId`]s, so the sequencer, the sequence stack and the talk
//! interpreter never hold references to each other.

use std::ops::{Add, AddAssign};

use super::program::{SequenceProgram, USE_COUNT};

/// Screen position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Stable arena index of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u16);

/// Lifecycle state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityKind {
    /// Animated every tick
    #[default]
    Active,
    /// Present but not drawn or animated
    Hidden,
    /// Turned off on its last frame; drawn but no longer animated
    Frozen,
    /// A finished finite animation, removed from the scene
    Removed,
}

/// A "use" action slot: a flag to set and up to four names to process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseSlot {
    pub names: Vec<String>,
    /// Signed flag to apply, 0 for none
    pub flag: i16,
}

/// An animatable scene object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub program: Option<SequenceProgram>,
    /// Program installed while this entity is speaking
    pub talk_program: Option<SequenceProgram>,
    /// Index of the current byte in `program`
    pub frame_number: usize,
    /// False until the first advance, which shows byte 0 instead of moving on
    pub started: bool,
    /// Pending loop-target frame, 0 for none
    pub seq_to: u8,
    pub seq_counter: u8,
    /// Loop counter saved by a goto
    pub seq_counter2: u8,
    /// Return index saved by a goto
    pub seq_return: Option<usize>,
    pub flipped: bool,
    pub position: Point,
    pub delta: Point,
    /// Finite ("allow") animation that completes instead of restarting
    pub finite: bool,
    pub image_loaded: bool,
    /// Speaker number that animates this entity when talking
    pub speaker: Option<u8>,
    pub uses: [UseSlot; USE_COUNT],
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            image_loaded: true,
            ..Default::default()
        }
    }

    pub fn with_program(mut self, program: impl Into<SequenceProgram>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_talk_program(mut self, program: impl Into<SequenceProgram>) -> Self {
        self.talk_program = Some(program.into());
        self
    }

    pub fn with_speaker(mut self, speaker: u8) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn finite(mut self) -> Self {
        self.finite = true;
        self
    }

    pub fn with_use(mut self, slot: usize, names: &[&str], flag: i16) -> Self {
        if let Some(u) = self.uses.get_mut(slot) {
            u.names = names.iter().map(|n| n.to_string()).collect();
            u.flag = flag;
        }
        self
    }

    /// Forget loop counters and goto return state
    pub fn reset_loops(&mut self) {
        self.seq_counter = 0;
        self.seq_counter2 = 0;
        self.seq_return = None;
    }

    /// Install a program and restart it
    pub fn set_program(&mut self, program: SequenceProgram) {
        self.program = Some(program);
        self.frame_number = 0;
        self.started = false;
        self.seq_to = 0;
        self.reset_loops();
    }

    /// Frame byte at the current index. An index past the end is clamped
    /// to the last byte and logged.
    pub fn current_frame(&self) -> Option<u8> {
        let program = self.program.as_ref()?;
        if program.is_empty() {
            return None;
        }
        let mut idx = self.frame_number;
        if idx >= program.len() {
            log::warn!(
                "Frame index {} of '{}' past program end {}, clamping",
                idx,
                self.name,
                program.len()
            );
            idx = program.len() - 1;
        }
        program.get(idx).filter(|&b| b > 0 && b < 128)
    }

    pub fn is_animating(&self) -> bool {
        self.kind == EntityKind::Active
    }
}

/// A cut-scene ("canimation") definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CAnim {
    pub name: String,
    pub program: SequenceProgram,
    pub position: Point,
    /// Where the player walks before it plays
    pub goto_position: Point,
    pub goto_facing: u8,
}

impl CAnim {
    pub fn new(name: &str, program: impl Into<SequenceProgram>) -> Self {
        Self {
            name: name.to_string(),
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn with_goto(mut self, position: Point, facing: u8) -> Self {
        self.goto_position = position;
        self.goto_facing = facing;
        self
    }
}
