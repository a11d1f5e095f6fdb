//! Name codes
//!
//! Processes the names attached to an entity's "use" slots. A name is either
//! a code (`*C`, `*G`, `*A`, `*<n>`, `@`, `!`) or the name of a scene object
//! whose visibility is toggled.

use super::entity::{EntityId, Point};
use crate::host::Host;
use crate::world::{SceneChange, World};

/// Decoded form of one use-slot name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCode {
    /// `*C<file>`: start a conversation
    Talk(String),
    /// `*G<xxx><yyy>`: move to an absolute position
    Goto(Point),
    /// `*A<xxx><yyy>`: add to the position
    Offset(Point),
    /// `*<n>`: change scene
    Scene(u8),
    /// `@<text>`: print on the info line
    Print(String),
    /// `!<n>`: show a fixed message
    Message(usize),
    /// Anything else names an object to toggle
    Toggle(String),
}

fn coords(digits: &str) -> Option<Point> {
    let x = digits.get(0..3)?.parse().ok()?;
    let y = digits.get(3..6)?.parse().ok()?;
    Some(Point::new(x, y))
}

/// Parse a use-slot name; `None` for an empty or malformed name
pub fn parse(name: &str) -> Option<NameCode> {
    if name.is_empty() {
        return None;
    }
    let code = if let Some(rest) = name.strip_prefix('*') {
        let mut chars = rest.chars();
        match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => NameCode::Talk(chars.as_str().to_string()),
            Some('G') => NameCode::Goto(coords(chars.as_str())?),
            Some('A') => NameCode::Offset(coords(chars.as_str())?),
            Some(c) if c.is_ascii_digit() => NameCode::Scene(rest.parse().ok()?),
            _ => return None,
        }
    } else if let Some(text) = name.strip_prefix('@') {
        NameCode::Print(text.to_string())
    } else if let Some(n) = name.strip_prefix('!') {
        NameCode::Message(n.parse().ok()?)
    } else {
        NameCode::Toggle(name.to_string())
    };
    Some(code)
}

/// Apply one name on behalf of `id`. Returns true if something was printed.
pub fn process_name(world: &mut World, id: EntityId, name: &str, host: &mut dyn Host) -> bool {
    let Some(code) = parse(name) else {
        if !name.is_empty() {
            log::warn!("Ignoring malformed name code '{}'", name);
        }
        return false;
    };
    log::debug!("Name code {:?} for {:?}", code, id);

    match code {
        NameCode::Talk(file) => world.pending_talk = Some(file),
        NameCode::Goto(p) => {
            if let Some(e) = world.scene.get_mut(id) {
                e.position = p;
            }
        }
        NameCode::Offset(p) => {
            if let Some(e) = world.scene.get_mut(id) {
                e.position += p;
            }
        }
        NameCode::Scene(scene) => {
            world.next_scene = Some(SceneChange {
                scene,
                arrival: None,
            })
        }
        NameCode::Print(text) => {
            world.info_line = Some(text);
            return true;
        }
        NameCode::Message(n) => {
            host.show_message(n);
            return true;
        }
        NameCode::Toggle(object) => {
            world.scene.toggle(&object);
        }
    }
    false
}

/// Invoke use slot `slot` of entity `id`: set its flag, then process its names
pub fn use_slot(world: &mut World, id: EntityId, slot: usize, host: &mut dyn Host) -> bool {
    let Some(action) = world.scene.get(id).and_then(|e| e.uses.get(slot)).cloned() else {
        log::warn!("Entity {:?} has no use slot {}", id, slot);
        return false;
    };
    if action.flag != 0 {
        world.flags.set(action.flag as i32);
    }
    let mut printed = false;
    for name in &action.names {
        printed |= process_name(world, id, name, host);
    }
    printed
}
