//! Scene objects and sprite sequencing
//!
//! This module owns the entity arena and the machinery that animates it:
//! - Sequence program decoding (two dialects)
//! - The per-tick object animation sequencer
//! - Name-code processing for "use" slots
//! - The sequence stack that saves animations during speech
//!
//! # Ownership
//!
//! Entities are stored in a flat arena and addressed by [`EntityId`];
//! cross-component references are id lookups, never pointers.

pub mod entity;
pub mod namecode;
pub mod program;
pub mod seqstack;
pub mod sequencer;
pub mod types;

pub use entity::{CAnim, Entity, EntityId, EntityKind, Point, UseSlot};
pub use program::{Dialect, SeqInstr, SequenceProgram};
pub use seqstack::{SequenceEntry, SequenceStack};
pub use sequencer::{SeqStep, Sequencer};
pub use types::{SequenceError, SequenceResult};

/// Most entities a scene can hold
pub const MAX_ENTITIES: usize = u16::MAX as usize + 1;

/// Entity arena plus the scene's cut-scene animation table
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entities: Vec<Entity>,
    canims: Vec<CAnim>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, returning its id. The slot of a removed entity is
    /// reused before the arena grows.
    pub fn add(&mut self, entity: Entity) -> SequenceResult<EntityId> {
        if let Some(i) = self.entities.iter().position(|e| e.kind == EntityKind::Removed) {
            self.entities[i] = entity;
            return Ok(EntityId(i as u16));
        }
        let index = u16::try_from(self.entities.len())
            .map_err(|_| SequenceError::ArenaFull { limit: MAX_ENTITIES })?;
        self.entities.push(entity);
        Ok(EntityId(index))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All ids in arena order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len() as u16).map(EntityId)
    }

    /// Case-insensitive lookup by name
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
            .map(|i| EntityId(i as u16))
    }

    /// Entity animated when `speaker` talks
    pub fn find_speaker(&self, speaker: u8) -> Option<EntityId> {
        self.entities
            .iter()
            .position(|e| e.speaker == Some(speaker) && e.kind != EntityKind::Removed)
            .map(|i| EntityId(i as u16))
    }

    /// Flip every object named `name` between hidden and active.
    /// Returns the number of objects changed.
    pub fn toggle(&mut self, name: &str) -> usize {
        let mut changed = 0;
        for e in self.entities.iter_mut().filter(|e| e.name.eq_ignore_ascii_case(name)) {
            e.kind = match e.kind {
                EntityKind::Hidden => EntityKind::Active,
                EntityKind::Active | EntityKind::Frozen => EntityKind::Hidden,
                EntityKind::Removed => continue,
            };
            changed += 1;
        }
        if changed == 0 {
            log::warn!("Toggle: no object named '{}'", name);
        }
        changed
    }

    /// Show or hide every object named `name`
    pub fn set_visible(&mut self, name: &str, visible: bool) -> usize {
        let mut changed = 0;
        for e in self.entities.iter_mut().filter(|e| e.name.eq_ignore_ascii_case(name)) {
            if e.kind == EntityKind::Removed {
                continue;
            }
            e.kind = if visible {
                EntityKind::Active
            } else {
                EntityKind::Hidden
            };
            changed += 1;
        }
        if changed == 0 {
            log::warn!("Set object: no object named '{}'", name);
        }
        changed
    }

    /// Register a cut-scene animation, returning its index
    pub fn add_canim(&mut self, canim: CAnim) -> usize {
        self.canims.push(canim);
        self.canims.len() - 1
    }

    pub fn canim(&self, index: usize) -> Option<&CAnim> {
        self.canims.get(index)
    }
}
