//! Object animation sequencer
//!
//! Advances each entity one displayed frame per tick by interpreting its
//! sequence program. Control codes are executed in the same tick until a
//! frame byte is reached.

use super::entity::{Entity, EntityId, EntityKind};
use super::namecode;
use super::program::{
    seq_to_code, Dialect, FlipOp, SeqInstr, Selector, SequenceProgram, VisibilityOp,
    END_OF_SEQUENCE,
};
use super::types::{SequenceError, SequenceResult};
use crate::host::{Host, NullHost};
use crate::world::World;

/// Frames a pre-scan may produce before the program is rejected
pub const MAX_PRESCAN_FRAMES: usize = 1000;

/// Control codes a single tick may execute before the program is rejected
pub const MAX_CODES_PER_TICK: usize = 256;

/// Outcome of advancing one entity by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqStep {
    /// New frame to display
    Frame(u8),
    /// Entity turned itself off on its previous frame
    Frozen,
    /// Finite animation finished and was removed
    Completed,
    /// Nothing to do (hidden, removed, or no program)
    Idle,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sequencer {
    dialect: Dialect,
    /// Side effects are suppressed while counting frames
    prescanning: bool,
}

impl Sequencer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            prescanning: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Advance every animating entity once, in arena order
    pub fn animate_all(
        &self,
        world: &mut World,
        host: &mut dyn Host,
    ) -> SequenceResult<Vec<(EntityId, SeqStep)>> {
        let ids: Vec<EntityId> = world.scene.ids().collect();
        let mut steps = Vec::with_capacity(ids.len());
        for id in ids {
            let animating = world.scene.get(id).map_or(false, Entity::is_animating);
            if animating {
                steps.push((id, self.advance_one(world, id, host)?));
            }
        }
        Ok(steps)
    }

    /// Advance entity `id` by one tick
    pub fn advance_one(
        &self,
        world: &mut World,
        id: EntityId,
        host: &mut dyn Host,
    ) -> SequenceResult<SeqStep> {
        let Some(entity) = world.scene.get_mut(id) else {
            log::warn!("Sequencer: no entity {:?}", id);
            return Ok(SeqStep::Idle);
        };
        match entity.kind {
            EntityKind::Active => {}
            EntityKind::Frozen => return Ok(SeqStep::Frozen),
            EntityKind::Hidden | EntityKind::Removed => return Ok(SeqStep::Idle),
        }
        if entity.program.as_ref().map_or(true, SequenceProgram::is_empty) {
            log::warn!("Sequencer: active entity '{}' has no program", entity.name);
            return Ok(SeqStep::Idle);
        }

        if entity.seq_to != 0 {
            if let Some(frame) = step_seq_to(entity) {
                return Ok(SeqStep::Frame(frame));
            }
        }

        if entity.started {
            entity.frame_number += 1;
        } else {
            entity.started = true;
        }
        self.run(world, id, host)
    }

    /// Execute codes from the current index until a frame is reached
    fn run(&self, world: &mut World, id: EntityId, host: &mut dyn Host) -> SequenceResult<SeqStep> {
        for _ in 0..MAX_CODES_PER_TICK {
            let entity = entity_mut(world, id)?;
            let Some(program) = entity.program.as_ref() else {
                return Ok(SeqStep::Idle);
            };
            let mut idx = entity.frame_number;
            if idx >= program.len() {
                log::warn!(
                    "Frame index {} of '{}' past program end {}, clamping",
                    idx,
                    entity.name,
                    program.len()
                );
                idx = program.len() - 1;
                entity.frame_number = idx;
            }
            let instr = program.decode_at(idx, self.dialect)?;
            let next = idx + 1 + instr.width(self.dialect);

            match instr {
                SeqInstr::Frame(frame) => return Ok(SeqStep::Frame(frame)),
                SeqInstr::End(Selector::Restart) => {
                    if entity.finite {
                        return Ok(complete(entity));
                    }
                    entity.frame_number = 0;
                }
                SeqInstr::End(Selector::Freeze) => {
                    entity.frame_number = idx.saturating_sub(1);
                    entity.kind = EntityKind::Frozen;
                    return Ok(SeqStep::Frozen);
                }
                SeqInstr::End(Selector::Segment(seq)) => {
                    self.jump(entity, seq);
                    if entity.finite && entity.frame_number == 0 {
                        return Ok(complete(entity));
                    }
                }
                SeqInstr::End(Selector::Loop(count)) => self.repeat(entity, idx, count, next),
                SeqInstr::Loop(count) => self.repeat(entity, idx, count, next),
                SeqInstr::Delta(delta) => {
                    entity.delta = delta;
                    entity.position += delta;
                    entity.frame_number = next;
                }
                SeqInstr::Teleport(pos) => {
                    entity.position = pos;
                    entity.frame_number = next;
                }
                SeqInstr::Flip(op) => {
                    entity.flipped = match op {
                        FlipOp::Clear => false,
                        FlipOp::Set => true,
                        FlipOp::Toggle => !entity.flipped,
                    };
                    entity.frame_number = next;
                }
                SeqInstr::SeqTo(target) => {
                    let prev = idx
                        .checked_sub(1)
                        .and_then(|i| program.get(i))
                        .filter(|&b| b > 0 && b < 128)
                        .unwrap_or(target);
                    if let Some(p) = entity.program.as_mut() {
                        p.put(idx, prev);
                    }
                    entity.seq_to = target;
                    if let Some(frame) = step_seq_to(entity) {
                        return Ok(SeqStep::Frame(frame));
                    }
                    entity.frame_number = next;
                }
                SeqInstr::Goto(seq) => {
                    entity.seq_counter2 = entity.seq_counter;
                    entity.seq_return = Some(next);
                    self.jump(entity, seq);
                }
                SeqInstr::Sound(index) => {
                    entity.frame_number = next;
                    match index {
                        Some(i) if !self.prescanning => host.play_sound(i),
                        _ => {}
                    }
                }
                SeqInstr::CallTalk(name) => {
                    entity.frame_number = next;
                    if !self.prescanning {
                        log::debug!("Sequence requests conversation '{}'", name);
                        world.pending_talk = Some(name);
                    }
                }
                SeqInstr::Visibility { object, op } => {
                    entity.frame_number = next;
                    if !self.prescanning {
                        set_visibility(world, EntityId(object), op);
                    }
                }
                SeqInstr::Use(slot) => {
                    entity.frame_number = next;
                    if !self.prescanning {
                        namecode::use_slot(world, id, slot, host);
                    }
                }
            }
        }

        let name = entity_mut(world, id)?.name.clone();
        Err(SequenceError::Overflow {
            name,
            limit: MAX_CODES_PER_TICK,
        })
    }

    fn jump(&self, entity: &mut Entity, seq: u8) {
        if let Some(program) = entity.program.as_ref() {
            entity.frame_number = program.segment_index(seq, self.dialect);
        }
        entity.seq_counter = 0;
    }

    fn repeat(&self, entity: &mut Entity, idx: usize, count: u8, fallthrough: usize) {
        entity.seq_counter = entity.seq_counter.saturating_add(1);
        if entity.seq_counter >= count {
            if let Some(ret) = entity.seq_return.take() {
                entity.frame_number = ret;
                entity.seq_counter = entity.seq_counter2;
                entity.seq_counter2 = 0;
            } else {
                entity.frame_number = fallthrough;
                entity.seq_counter = 0;
            }
        } else if let Some(program) = entity.program.as_ref() {
            entity.frame_number = program.segment_start_of(idx, self.dialect);
        }
    }

    /// Switch entity `id` to segment `seq` of its program
    pub fn set_sequence(&self, world: &mut World, id: EntityId, seq: u8) -> SequenceResult<()> {
        let entity = entity_mut(world, id)?;
        self.jump(entity, seq);
        entity.seq_return = None;
        entity.started = false;
        Ok(())
    }

    /// Run `program` to completion without side effects and return the
    /// frames it displays
    pub fn prescan(&self, name: &str, program: &SequenceProgram) -> SequenceResult<Vec<u8>> {
        let scanner = Sequencer {
            dialect: self.dialect,
            prescanning: true,
        };
        let mut scratch = World::default();
        let id = scratch
            .scene
            .add(Entity::new(name).with_program(program.clone()).finite())?;

        let mut frames = Vec::new();
        loop {
            match scanner.advance_one(&mut scratch, id, &mut NullHost)? {
                SeqStep::Frame(f) => {
                    if frames.len() >= MAX_PRESCAN_FRAMES {
                        return Err(SequenceError::Overflow {
                            name: name.to_string(),
                            limit: MAX_PRESCAN_FRAMES,
                        });
                    }
                    frames.push(f);
                }
                SeqStep::Frozen | SeqStep::Completed | SeqStep::Idle => return Ok(frames),
            }
        }
    }

    /// Start cut-scene animation `index` as a finite scene entity.
    ///
    /// The program is pre-scanned first; one that never finishes is
    /// rejected and nothing is started. A reversed animation plays the
    /// scanned frames backwards.
    pub fn start_canim(
        &self,
        world: &mut World,
        index: usize,
        reverse: bool,
    ) -> SequenceResult<EntityId> {
        let canim = world
            .scene
            .canim(index)
            .cloned()
            .ok_or(SequenceError::MissingAnimation(index))?;
        let frames = self.prescan(&canim.name, &canim.program)?;
        log::debug!("Cut-scene '{}' runs {} frames", canim.name, frames.len());

        let program = if reverse {
            let mut bytes: Vec<u8> = frames.into_iter().rev().collect();
            bytes.push(END_OF_SEQUENCE);
            SequenceProgram::new(bytes)
        } else {
            canim.program
        };
        let id = world
            .scene
            .add(Entity::new(&canim.name).with_program(program).at(canim.position).finite())?;
        Ok(id)
    }
}

fn entity_mut(world: &mut World, id: EntityId) -> SequenceResult<&mut Entity> {
    world
        .scene
        .get_mut(id)
        .ok_or(SequenceError::MissingEntity(id))
}

/// Step a pending loop-target one frame. Returns the displayed frame, or
/// `None` once the target is reached and the code byte restored.
fn step_seq_to(entity: &mut Entity) -> Option<u8> {
    let idx = entity.frame_number;
    let target = entity.seq_to;
    let program = entity.program.as_mut()?;
    let current = program.get(idx)?;
    if current == target {
        program.put(idx, seq_to_code(target));
        entity.seq_to = 0;
        return None;
    }
    let stepped = if current > target { current - 1 } else { current + 1 };
    program.put(idx, stepped);
    Some(stepped)
}

fn complete(entity: &mut Entity) -> SeqStep {
    log::debug!("Animation '{}' completed", entity.name);
    entity.kind = EntityKind::Removed;
    entity.image_loaded = false;
    entity.frame_number = 0;
    SeqStep::Completed
}

fn set_visibility(world: &mut World, object: EntityId, op: VisibilityOp) {
    let Some(target) = world.scene.get_mut(object) else {
        log::warn!("Sequence references missing object {:?}", object);
        return;
    };
    target.kind = match (op, target.kind) {
        (_, EntityKind::Removed) => EntityKind::Removed,
        (VisibilityOp::Hide, _) => EntityKind::Hidden,
        (VisibilityOp::Show, _) => EntityKind::Active,
        (VisibilityOp::Toggle, EntityKind::Hidden) => EntityKind::Active,
        (VisibilityOp::Toggle, _) => EntityKind::Hidden,
    };
}
