//! Reply program opcodes
//!
//! Bytes of 128 and above in a reply are opcodes. Numeric operands are
//! stored plus one so a reply never contains a NUL before its end.

use crate::scene::program::padded_name;
use crate::scene::Point;

pub const SWITCH_SPEAKER: u8 = 128;
pub const RUN_CANIMATION: u8 = 129;
pub const ASSIGN_PORTRAIT_LOCATION: u8 = 130;
pub const PAUSE: u8 = 131;
pub const REMOVE_PORTRAIT: u8 = 132;
pub const CLEAR_WINDOW: u8 = 133;
pub const ADJUST_OBJ_SEQUENCE: u8 = 134;
pub const WALK_TO_COORDS: u8 = 135;
pub const PAUSE_WITHOUT_CONTROL: u8 = 136;
pub const BANISH_WINDOW: u8 = 137;
pub const SUMMON_WINDOW: u8 = 138;
pub const SET_FLAG: u8 = 139;
pub const SFX_COMMAND: u8 = 140;
pub const TOGGLE_OBJECT: u8 = 141;
pub const STEALTH_MODE_ACTIVE: u8 = 142;
pub const IF_STATEMENT: u8 = 143;
pub const ELSE_STATEMENT: u8 = 144;
pub const END_IF_STATEMENT: u8 = 145;
pub const STEALTH_MODE_DEACTIVATE: u8 = 146;
pub const TURN_HOLMES_OFF: u8 = 147;
pub const TURN_HOLMES_ON: u8 = 148;
pub const GOTO_SCENE: u8 = 149;
pub const PLAY_PROLOGUE: u8 = 150;
pub const ADD_ITEM_TO_INVENTORY: u8 = 151;
pub const SET_OBJECT: u8 = 152;
pub const CALL_TALK_FILE: u8 = 153;
pub const MOVE_MOUSE: u8 = 154;
pub const DISPLAY_INFO_LINE: u8 = 155;
pub const CLEAR_INFO_LINE: u8 = 156;
pub const WALK_TO_CANIMATION: u8 = 157;
pub const REMOVE_ITEM_FROM_INVENTORY: u8 = 158;
pub const ENABLE_END_KEY: u8 = 159;
pub const DISABLE_END_KEY: u8 = 160;
pub const CARRIAGE_RETURN: u8 = 161;

/// Scene number of the overland map, which has no arrival position
pub const MAP_SCENE: u8 = 100;

const NAME_LEN: usize = 8;

/// A decoded reply opcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    SwitchSpeaker(u8),
    RunCAnim { index: usize, reverse: bool },
    AssignPortrait { side: u8, flip: bool },
    Pause(u32),
    RemovePortrait,
    ClearWindow,
    AdjustObjSequence { name: String, save: bool, sequence: Vec<u8> },
    WalkToCoords { position: Point, facing: u8 },
    PauseWithoutControl(u32),
    BanishWindow,
    SummonWindow,
    SetFlag(i32),
    Sfx(String),
    ToggleObject(String),
    StealthOn,
    If(i32),
    Else,
    EndIf,
    StealthOff,
    PlayerOff,
    PlayerOn,
    GotoScene { scene: u8, arrival: Option<(Point, u8)> },
    PlayCutscene(String),
    AddItem(String),
    SetObject { name: String, hide: bool },
    CallTalkFile(String),
    MoveMouse(Point),
    InfoLine(String),
    ClearInfo,
    WalkToCAnim(usize),
    RemoveItem(String),
    EnableEndKey,
    DisableEndKey,
    CarriageReturn,
    /// Opcode with no handler; skipped
    Unknown(u8),
}

/// Operands of the opcode at `offset` run past the end of the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Opcode {code} at offset {offset} is truncated")]
pub struct Truncated {
    pub offset: usize,
    pub code: u8,
}

struct Operands<'a> {
    data: &'a [u8],
    start: usize,
    pos: usize,
}

impl<'a> Operands<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], Truncated> {
        let bytes = self.data.get(self.pos..self.pos + n).ok_or(Truncated {
            offset: self.start,
            code: self.data[self.start],
        })?;
        self.pos += n;
        Ok(bytes)
    }

    /// One byte stored plus one
    fn value(&mut self) -> Result<u8, Truncated> {
        Ok(self.take(1)?[0].wrapping_sub(1))
    }

    fn raw(&mut self) -> Result<u8, Truncated> {
        Ok(self.take(1)?[0])
    }

    /// Two bytes stored plus one, high first
    fn wide(&mut self) -> Result<i32, Truncated> {
        let hi = self.value()? as i32;
        let lo = self.value()? as i32;
        Ok(hi * 256 + lo)
    }

    fn name(&mut self) -> Result<String, Truncated> {
        Ok(padded_name(self.take(NAME_LEN)?))
    }

    fn text(&mut self, len: usize) -> Result<String, Truncated> {
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// Flag operand: a wide value whose low byte of 1 stands for 0xFF of
    /// the previous high byte
    fn flag(&mut self) -> Result<i32, Truncated> {
        let b = self.take(2)?;
        let (hi, lo) = (b[0] as i32, b[1] as i32);
        Ok((hi - 1) * 256 + lo - 1 - i32::from(lo == 1))
    }
}

/// Decode the opcode at `offset`, returning it and its total length
pub fn decode(data: &[u8], offset: usize) -> Result<(Opcode, usize), Truncated> {
    let code = data[offset];
    let mut ops = Operands {
        data,
        start: offset,
        pos: offset + 1,
    };

    let op = match code {
        SWITCH_SPEAKER => Opcode::SwitchSpeaker(ops.value()? & 0x7F),
        RUN_CANIMATION => {
            let b = ops.raw()?;
            Opcode::RunCAnim {
                index: ((b & 0x7F) as usize).saturating_sub(1),
                reverse: b & 0x80 != 0,
            }
        }
        ASSIGN_PORTRAIT_LOCATION => {
            let v = ops.value()?;
            Opcode::AssignPortrait {
                side: v & 0x0F,
                flip: v > 15,
            }
        }
        PAUSE => Opcode::Pause(ops.value()? as u32),
        REMOVE_PORTRAIT => Opcode::RemovePortrait,
        CLEAR_WINDOW => Opcode::ClearWindow,
        ADJUST_OBJ_SEQUENCE => {
            let len = ops.raw()?;
            let count = ops.raw()? as usize;
            let name = ops.text((len & 0x7F) as usize)?;
            let sequence = ops.take(count)?.iter().map(|b| b.wrapping_sub(1)).collect();
            Opcode::AdjustObjSequence {
                name,
                save: len & 0x80 != 0,
                sequence,
            }
        }
        WALK_TO_COORDS => {
            let x = ops.wide()?;
            let y = ops.value()? as i32;
            let facing = ops.value()?;
            Opcode::WalkToCoords {
                position: Point::new(x, y),
                facing,
            }
        }
        PAUSE_WITHOUT_CONTROL => Opcode::PauseWithoutControl(ops.value()? as u32),
        BANISH_WINDOW => Opcode::BanishWindow,
        SUMMON_WINDOW => Opcode::SummonWindow,
        SET_FLAG => {
            let v = ops.flag()?;
            let magnitude = v & 0x3FFF;
            Opcode::SetFlag(if v & 0x4000 != 0 { -magnitude } else { magnitude })
        }
        SFX_COMMAND => Opcode::Sfx(ops.name()?),
        TOGGLE_OBJECT => {
            let len = ops.raw()? as usize;
            Opcode::ToggleObject(ops.text(len)?)
        }
        STEALTH_MODE_ACTIVE => Opcode::StealthOn,
        IF_STATEMENT => {
            let v = ops.flag()?;
            let magnitude = v & 0x7FFF;
            Opcode::If(if v & 0x8000 != 0 { -magnitude } else { magnitude })
        }
        ELSE_STATEMENT => Opcode::Else,
        END_IF_STATEMENT => Opcode::EndIf,
        STEALTH_MODE_DEACTIVATE => Opcode::StealthOff,
        TURN_HOLMES_OFF => Opcode::PlayerOff,
        TURN_HOLMES_ON => Opcode::PlayerOn,
        GOTO_SCENE => {
            let scene = ops.value()?;
            let facing = ops.value()?;
            let x = ops.wide()?;
            let y = ops.value()? as i32;
            Opcode::GotoScene {
                scene,
                arrival: (scene != MAP_SCENE).then_some((Point::new(x, y), facing)),
            }
        }
        PLAY_PROLOGUE => Opcode::PlayCutscene(ops.name()?),
        ADD_ITEM_TO_INVENTORY => {
            let len = ops.raw()? as usize;
            Opcode::AddItem(ops.text(len)?)
        }
        SET_OBJECT => {
            let len = ops.raw()?;
            Opcode::SetObject {
                name: ops.text((len & 0x7F) as usize)?,
                hide: len & 0x80 != 0,
            }
        }
        CALL_TALK_FILE => Opcode::CallTalkFile(ops.name()?),
        MOVE_MOUSE => {
            let x = ops.wide()?;
            let y = ops.value()? as i32;
            Opcode::MoveMouse(Point::new(x, y))
        }
        DISPLAY_INFO_LINE => {
            let len = ops.raw()? as usize;
            Opcode::InfoLine(ops.text(len)?)
        }
        CLEAR_INFO_LINE => Opcode::ClearInfo,
        WALK_TO_CANIMATION => Opcode::WalkToCAnim(ops.value()? as usize),
        REMOVE_ITEM_FROM_INVENTORY => {
            let len = ops.raw()? as usize;
            Opcode::RemoveItem(ops.text(len)?)
        }
        ENABLE_END_KEY => Opcode::EnableEndKey,
        DISABLE_END_KEY => Opcode::DisableEndKey,
        CARRIAGE_RETURN => Opcode::CarriageReturn,
        other => Opcode::Unknown(other),
    };
    Ok((op, ops.pos - offset))
}

/// Encode a flag operand for set-flag and if opcodes. Values whose low
/// byte is zero cannot be represented.
pub fn encode_flag(value: u16) -> Option<[u8; 2]> {
    let hi = (value >> 8) as u8;
    let lo = (value & 0xFF) as u8;
    match lo {
        0 => None,
        0xFF => Some([hi.checked_add(2)?, 1]),
        _ => Some([hi.checked_add(1)?, lo + 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(bytes: &[u8]) -> Opcode {
        decode(bytes, 0).unwrap().0
    }

    #[test]
    fn test_simple_opcodes() {
        assert_eq!(op(&[SWITCH_SPEAKER, 3]), Opcode::SwitchSpeaker(2));
        assert_eq!(op(&[PAUSE, 11]), Opcode::Pause(10));
        assert_eq!(op(&[CLEAR_WINDOW]), Opcode::ClearWindow);
        assert_eq!(op(&[WALK_TO_CANIMATION, 2]), Opcode::WalkToCAnim(1));
        assert_eq!(op(&[250]), Opcode::Unknown(250));
        assert_eq!(
            op(&[RUN_CANIMATION, 0x83]),
            Opcode::RunCAnim {
                index: 2,
                reverse: true
            }
        );
        assert_eq!(
            op(&[ASSIGN_PORTRAIT_LOCATION, 18]),
            Opcode::AssignPortrait { side: 1, flip: true }
        );
    }

    #[test]
    fn test_lengths() {
        let (_, len) = decode(&[b'x', GOTO_SCENE, 5, 2, 1, 11, 21, b'y'], 1).unwrap();
        assert_eq!(len, 6);
        let (_, len) = decode(&[SFX_COMMAND, b'B', b'E', b'L', b'L', b'~', b'~', b'~', b'~'], 0).unwrap();
        assert_eq!(len, 9);
        let (o, len) = decode(&[ADJUST_OBJ_SEQUENCE, 0x84, 3, b'D', b'O', b'O', b'R', 2, 3, 1], 0).unwrap();
        assert_eq!(len, 10);
        assert_eq!(
            o,
            Opcode::AdjustObjSequence {
                name: "DOOR".into(),
                save: true,
                sequence: vec![1, 2, 0]
            }
        );
    }

    #[test]
    fn test_goto_scene() {
        assert_eq!(
            op(&[GOTO_SCENE, 5, 2, 2, 11, 21]),
            Opcode::GotoScene {
                scene: 4,
                arrival: Some((Point::new(266, 20), 1))
            }
        );
        assert_eq!(
            op(&[GOTO_SCENE, MAP_SCENE + 1, 1, 1, 1, 1]),
            Opcode::GotoScene {
                scene: MAP_SCENE,
                arrival: None
            }
        );
    }

    #[test]
    fn test_flag_operands() {
        let [hi, lo] = encode_flag(5).unwrap();
        assert_eq!(op(&[SET_FLAG, hi, lo]), Opcode::SetFlag(5));

        let [hi, lo] = encode_flag(0x4000 | 300).unwrap();
        assert_eq!(op(&[SET_FLAG, hi, lo]), Opcode::SetFlag(-300));

        let [hi, lo] = encode_flag(0x8000 | 5).unwrap();
        assert_eq!(op(&[IF_STATEMENT, hi, lo]), Opcode::If(-5));

        // Low byte 0xFF uses the low-byte-of-one form
        let [hi, lo] = encode_flag(0x01FF).unwrap();
        assert_eq!(lo, 1);
        assert_eq!(op(&[IF_STATEMENT, hi, lo]), Opcode::If(0x01FF));

        assert_eq!(encode_flag(0x0100), None);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            decode(&[b'a', SET_FLAG, 1], 1),
            Err(Truncated {
                offset: 1,
                code: SET_FLAG
            })
        );
        assert!(decode(&[CALL_TALK_FILE, b'A', b'B'], 0).is_err());
    }
}
