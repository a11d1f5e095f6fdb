//! External collaborators
//!
//! Audio, cut-scene playback, walking, the mouse and font metrics belong to
//! the surrounding game. The interpreter and sequencer reach them only
//! through [`Host`]; every method has an immediate no-op default so a host
//! implements just what it renders.

use crate::scene::Point;

/// Default glyph advance used when a host has no font metrics
pub const DEFAULT_GLYPH_WIDTH: u32 = 7;

pub trait Host {
    /// Sound effect by scene sound index (sequence programs)
    fn play_sound(&mut self, _index: usize) {}

    /// Sound effect by name (reply programs)
    fn play_sfx(&mut self, _name: &str) {}

    /// Voice clip for a statement
    fn play_speech(&mut self, _name: &str) {}

    /// Start a full-screen cut-scene
    fn start_cutscene(&mut self, _name: &str) {}

    /// Is a cut-scene started by `start_cutscene` still playing?
    fn cutscene_running(&self) -> bool {
        false
    }

    /// Start walking the player to `target`
    fn start_walk(&mut self, _target: Point, _facing: u8) {}

    /// Is the player still walking?
    fn walking(&self) -> bool {
        false
    }

    fn move_mouse(&mut self, _pos: Point) {}

    /// Display a numbered fixed message on the info line
    fn show_message(&mut self, _number: usize) {}

    /// Rendered width of `text` in pixels
    fn string_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * DEFAULT_GLYPH_WIDTH
    }
}

/// Host that does nothing and finishes everything immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}

/// Host with fixed-advance font metrics and nothing else
#[derive(Debug, Clone, Copy)]
pub struct MonospaceHost {
    pub glyph_width: u32,
}

impl Host for MonospaceHost {
    fn string_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.glyph_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metrics() {
        assert_eq!(NullHost.string_width("abc"), 3 * DEFAULT_GLYPH_WIDTH);
        assert_eq!(MonospaceHost { glyph_width: 5 }.string_width("abcd"), 20);
    }

    #[test]
    fn test_null_host_finishes_immediately() {
        let mut host = NullHost;
        host.start_cutscene("INTRO");
        host.start_walk(Point::new(1, 2), 0);
        assert!(!host.cutscene_running());
        assert!(!host.walking());
    }
}
