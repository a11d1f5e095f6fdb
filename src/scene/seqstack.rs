//! Sequence stack
//!
//! Saves an entity's in-flight animation while a speaking override plays
//! and restores it verbatim afterwards.

use super::entity::EntityId;
use super::program::SequenceProgram;
use super::types::{SequenceError, SequenceResult};
use super::Scene;

/// Maximum number of saved sequences
pub const MAX_DEPTH: usize = 5;

/// Snapshot of one entity's animation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub entity: EntityId,
    pub program: SequenceProgram,
    pub frame_number: usize,
    pub seq_to: u8,
    started: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SequenceStack {
    entries: Vec<SequenceEntry>,
    pushes: usize,
    pops: usize,
}

impl SequenceStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the animation state of `entity`.
    ///
    /// `None` is the narrator/player sentinel and does nothing, as does an
    /// entity without a program. Returns whether an entry was pushed.
    pub fn push(&mut self, scene: &Scene, entity: Option<EntityId>) -> SequenceResult<bool> {
        let Some(id) = entity else {
            return Ok(false);
        };
        let Some(e) = scene.get(id) else {
            log::warn!("Sequence push: no entity {:?}", id);
            return Ok(false);
        };
        let Some(program) = e.program.as_ref() else {
            log::debug!("Sequence push: '{}' has no program", e.name);
            return Ok(false);
        };
        if self.entries.len() >= MAX_DEPTH {
            return Err(SequenceError::StackOverflow { limit: MAX_DEPTH });
        }

        self.entries.push(SequenceEntry {
            entity: id,
            program: program.clone(),
            frame_number: e.frame_number,
            seq_to: e.seq_to,
            started: e.started,
        });
        self.pushes += 1;
        Ok(true)
    }

    /// Restore the newest entry. An empty stack is a no-op.
    pub fn pop(&mut self, scene: &mut Scene) -> Option<EntityId> {
        let entry = self.entries.pop()?;
        self.pops += 1;
        match scene.get_mut(entry.entity) {
            Some(e) => {
                e.program = Some(entry.program);
                e.frame_number = entry.frame_number;
                e.seq_to = entry.seq_to;
                e.started = entry.started;
                e.reset_loops();
            }
            None => log::warn!("Sequence pop: entity {:?} is gone", entry.entity),
        }
        Some(entry.entity)
    }

    /// Restore every entry, newest first
    pub fn pop_all(&mut self, scene: &mut Scene) {
        while self.pop(scene).is_some() {}
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    /// Total (pushes, pops) performed, for balance checks
    pub fn counts(&self) -> (usize, usize) {
        (self.pushes, self.pops)
    }
}
