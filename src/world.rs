//! Shared game context
//!
//! Everything the interpreter and the sequencer mutate lives here and is
//! passed by `&mut` to each component; there is no global game state.

use crate::scene::{Point, Scene};
use crate::state::{FlagSet, Journal, TalkHistory};

/// What the player's input currently drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuMode {
    #[default]
    Standard,
    Look,
    Talk,
    Inventory,
    Journal,
}

/// Scene change requested by a script or name code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneChange {
    pub scene: u8,
    /// Arrival position and facing, if the script gave one
    pub arrival: Option<(Point, u8)>,
}

/// The player character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub visible: bool,
    pub position: Point,
    pub facing: u8,
    /// Horizontal position of the talking portrait
    pub portrait_side: i32,
    pub portrait_flip: bool,
    /// Score accumulated from statement quotients
    pub quotient: i32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            visible: true,
            position: Point::default(),
            facing: 0,
            portrait_side: 20,
            portrait_flip: false,
            quotient: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct World {
    pub flags: FlagSet,
    pub scene: Scene,
    pub history: TalkHistory,
    pub journal: Journal,
    pub inventory: Vec<String>,
    pub player: Player,
    /// Speaker names, indexed by speaker number (0 is the player)
    pub cast: Vec<String>,
    /// Speaker whose portrait is currently shown
    pub talking: Option<u8>,
    pub info_line: Option<String>,
    pub mode: MenuMode,
    /// Set by goto-scene opcodes and `*n` name codes
    pub next_scene: Option<SceneChange>,
    /// Conversation requested by a sequence program or name code
    pub pending_talk: Option<String>,
}

impl World {
    pub fn new(flag_count: usize) -> Self {
        Self {
            flags: FlagSet::new(flag_count),
            ..Default::default()
        }
    }

    pub fn with_cast(mut self, names: &[&str]) -> Self {
        self.cast = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Display name of a speaker
    pub fn speaker_name(&self, speaker: u8) -> Option<&str> {
        self.cast.get(speaker as usize).map(|s| s.as_str())
    }

    pub fn add_item(&mut self, name: &str) {
        if !self.has_item(name) {
            self.inventory.push(name.to_string());
        }
    }

    pub fn remove_item(&mut self, name: &str) {
        let before = self.inventory.len();
        self.inventory.retain(|i| !i.eq_ignore_ascii_case(name));
        if self.inventory.len() == before {
            log::warn!("Inventory has no '{}' to remove", name);
        }
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.inventory.iter().any(|i| i.eq_ignore_ascii_case(name))
    }

    pub fn take_pending_talk(&mut self) -> Option<String> {
        self.pending_talk.take()
    }

    pub fn take_scene_change(&mut self) -> Option<SceneChange> {
        self.next_scene.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory() {
        let mut world = World::new(16);
        world.add_item("Lens");
        world.add_item("lens");
        assert_eq!(world.inventory.len(), 1);
        assert!(world.has_item("LENS"));

        world.remove_item("Lens");
        assert!(!world.has_item("Lens"));
    }

    #[test]
    fn test_speaker_names() {
        let world = World::new(16).with_cast(&["Holmes", "Watson"]);
        assert_eq!(world.speaker_name(1), Some("Watson"));
        assert_eq!(world.speaker_name(5), None);
    }

    #[test]
    fn test_take_requests() {
        let mut world = World::new(16);
        world.pending_talk = Some("LESTRADE".into());
        world.next_scene = Some(SceneChange { scene: 3, arrival: None });

        assert_eq!(world.take_pending_talk().as_deref(), Some("LESTRADE"));
        assert!(world.take_pending_talk().is_none());
        assert_eq!(world.take_scene_change().unwrap().scene, 3);
    }
}
