//! Conversation interpreter
//!
//! [`Talk`] is a resumable state machine. The game loop calls
//! [`Talk::update`] once per tick; each call performs at most one opcode or
//! one line of text and reports what the conversation is waiting for.
//!
//! ```text
//! Choosing -> Prompt -> Reply <-> Waiting -> ... -> Completed
//!                         |                   \-> Aborted
//!                         \-> (call) nested file -> back to Reply
//! ```

use crate::host::Host;
use crate::resource::TalkLibrary;
use crate::scene::{EntityId, SequenceError, SequenceProgram, SequenceStack, Sequencer};
use crate::world::{MenuMode, SceneChange, World};

use super::opcode::{self, Opcode, PAUSE};
use super::script::{CallFrame, CallStack, Script, MAX_CALL_DEPTH};
use super::statement::{portrait_x, StatementStore};
use super::talkfile::TalkFile;
use super::types::{Input, TalkConfig, TalkError, TalkResult, TalkStatus, Wait};
use super::window::{TalkWindow, COMMENT_OPEN};

/// Where the conversation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting for the player to pick a statement
    Choosing,
    /// Prompt shown; the reply starts after the wait
    Prompt,
    /// Executing the reply program
    Reply,
    /// Reply finished; flags, links and the ending are next
    ReplyDone,
    Completed,
    Aborted,
}

/// A statement offered to the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Talk-map index to pass to `select_and_run`
    pub index: usize,
    pub text: String,
    pub seen: bool,
}

/// Sequence replaced by an "adjust object sequence" opcode with save set
#[derive(Debug, Clone)]
struct SavedSequence {
    entity: EntityId,
    program: Option<SequenceProgram>,
    frame_number: usize,
}

pub struct Talk {
    library: TalkLibrary,
    config: TalkConfig,
    sequencer: Sequencer,

    file_name: String,
    file_id: u16,
    store: StatementStore,
    selected: Option<usize>,
    script: Script,
    window: TalkWindow,
    calls: CallStack,
    sequences: SequenceStack,
    saved_sequences: Vec<SavedSequence>,

    phase: Phase,
    aborted_from: Phase,
    wait: Option<Wait>,
    ticks_left: u32,

    talk_to: u8,
    speaker: Option<u8>,
    stealth: bool,
    end_key_enabled: bool,
    abort_requested: bool,
    saved_mode: MenuMode,
}

impl Talk {
    pub fn new(library: TalkLibrary, config: TalkConfig) -> Self {
        Self {
            sequencer: Sequencer::new(config.dialect),
            window: TalkWindow::new(config.window_width, config.page_lines),
            library,
            config,
            file_name: String::new(),
            file_id: 0,
            store: StatementStore::default(),
            selected: None,
            script: Script::default(),
            calls: CallStack::default(),
            sequences: SequenceStack::new(),
            saved_sequences: Vec::new(),
            phase: Phase::Idle,
            aborted_from: Phase::Idle,
            wait: None,
            ticks_left: 0,
            talk_to: 0,
            speaker: None,
            stealth: false,
            end_key_enabled: true,
            abort_requested: false,
            saved_mode: MenuMode::Standard,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn window(&self) -> &TalkWindow {
        &self.window
    }

    pub fn statements(&self) -> &StatementStore {
        &self.store
    }

    pub fn sequences(&self) -> &SequenceStack {
        &self.sequences
    }

    pub fn call_depth(&self) -> usize {
        self.calls.len()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn library(&self) -> &TalkLibrary {
        &self.library
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Completed)
    }

    /// Status without doing any work
    pub fn status(&self) -> TalkStatus {
        if let Some(wait) = self.wait {
            return TalkStatus::Waiting(wait);
        }
        match self.phase {
            Phase::Choosing => TalkStatus::Choosing,
            Phase::Completed | Phase::Idle => TalkStatus::Completed,
            Phase::Aborted => TalkStatus::Aborted,
            Phase::Prompt | Phase::Reply | Phase::ReplyDone => TalkStatus::Running,
        }
    }

    /// Begin a conversation with `talk_to` using talk file `file`
    pub fn start(
        &mut self,
        world: &mut World,
        host: &mut dyn Host,
        file: &str,
        talk_to: u8,
    ) -> TalkResult<TalkStatus> {
        if self.is_active() {
            log::warn!("Starting '{}' ends conversation '{}'", file, self.file_name);
            self.end_conversation(world);
        }
        log::info!("Talking to speaker {} with '{}'", talk_to, file);

        self.load_file(world, file)?;
        self.saved_mode = world.mode;
        world.mode = MenuMode::Talk;
        self.talk_to = talk_to;
        self.speaker = None;
        self.calls.clear();
        self.end_key_enabled = true;
        self.abort_requested = false;
        self.wait = None;
        self.window.clear_transcript();
        self.window.open();
        self.enter_file(world)
    }

    /// Parse talk file `name` and compute its talk map
    pub fn load_file(&mut self, world: &World, name: &str) -> TalkResult<()> {
        let (id, bytes) = self
            .library
            .get(name)
            .ok_or_else(|| TalkError::MissingFile(name.to_string()))?;
        let file = TalkFile::parse(bytes).map_err(|source| TalkError::File {
            name: name.to_string(),
            source,
        })?;
        log::debug!("Loaded '{}' with {} statements", name, file.statements.len());

        self.store = StatementStore::new(file.statements, &world.flags);
        self.file_name = name.to_string();
        self.file_id = id;
        Ok(())
    }

    /// Run the entry statement of a freshly loaded file, or offer choices
    fn enter_file(&mut self, world: &mut World) -> TalkResult<TalkStatus> {
        self.stealth = false;
        self.selected = None;
        let Some(entry) = self.store.entry() else {
            log::warn!("Talk file '{}' has no available statements", self.file_name);
            self.end_conversation(world);
            return Ok(TalkStatus::Completed);
        };

        if self.store.statements()[entry].runs_immediately() {
            self.run_entry(world, entry)?;
            Ok(TalkStatus::Running)
        } else {
            self.phase = Phase::Choosing;
            Ok(TalkStatus::Choosing)
        }
    }

    fn run_entry(&mut self, world: &mut World, index: usize) -> TalkResult<()> {
        self.record_entry(world, index);
        self.begin_reply(world, index)
    }

    /// Journal an entry statement heard for the first time and mark it seen
    fn record_entry(&self, world: &mut World, index: usize) {
        if !world.history.is_seen(self.file_id, index) {
            world.journal.record(self.file_id, index as u8, true);
        }
        world.history.mark_seen(self.file_id, index);
    }

    /// The statements currently offered to the player
    pub fn choices(&self, world: &World) -> Vec<Choice> {
        if self.phase != Phase::Choosing {
            return Vec::new();
        }
        self.store
            .choices(self.config.choice_rows)
            .into_iter()
            .map(|i| {
                let s = &self.store.statements()[i];
                Choice {
                    index: s.talk_map as usize,
                    text: s.prompt_text(),
                    seen: world.history.is_seen(self.file_id, i),
                }
            })
            .collect()
    }

    pub fn scroll_up(&mut self) -> bool {
        self.phase == Phase::Choosing && self.store.scroll_up()
    }

    pub fn scroll_down(&mut self) -> bool {
        self.phase == Phase::Choosing && self.store.scroll_down(self.config.choice_rows)
    }

    /// Leave the choice list; only allowed while the exit key is enabled
    pub fn exit(&mut self, world: &mut World) -> bool {
        if self.phase != Phase::Choosing || !self.end_key_enabled {
            return false;
        }
        self.end_conversation(world);
        true
    }

    /// Pick the statement with talk-map index `choice` and run it
    pub fn select_and_run(
        &mut self,
        world: &mut World,
        host: &mut dyn Host,
        choice: usize,
    ) -> TalkResult<TalkStatus> {
        if self.phase != Phase::Choosing {
            return Err(TalkError::NotChoosing);
        }
        let index = self
            .store
            .by_talk_map(choice)
            .ok_or(TalkError::InvalidChoice(choice))?;
        let statement = self.store.statements()[index].clone();

        if !world.history.is_seen(self.file_id, index) {
            world.journal.record(self.file_id, index as u8, false);
            world.player.quotient += statement.quotient as i32;
        }
        world.history.mark_seen(self.file_id, index);

        self.window.clear_page();
        self.window.set_header(Some(self.config.player_name.clone()));
        let prompt = statement.prompt_text().into_bytes();
        let mut pos = 0;
        while pos < prompt.len() {
            let (line, next) = self.window.wrap(&prompt, pos, host);
            if next == pos {
                break;
            }
            self.window.push_line(line);
            pos = next;
        }

        world.player.portrait_side = statement.portrait_x();
        if statement.flips_portrait() {
            world.player.portrait_flip = true;
        }
        world.talking = Some(0);
        if let Some(voice) = statement.voice_name() {
            host.play_speech(&voice);
        }

        self.selected = Some(index);
        self.phase = Phase::Prompt;
        let wait = Wait::More {
            ticks: prompt.len() as u32,
        };
        self.suspend(wait);
        Ok(TalkStatus::Waiting(wait))
    }

    /// Request cancellation; takes effect on the next update
    pub fn abort(&mut self) {
        self.abort_requested = true;
    }

    /// Continue an aborted conversation where it stopped
    pub fn resume_quiet(&mut self) -> TalkStatus {
        if self.phase != Phase::Aborted {
            return self.status();
        }
        self.abort_requested = false;
        self.phase = self.aborted_from;
        self.wait = None;
        self.status()
    }

    /// End the conversation normally, from any state
    pub fn finish(&mut self, world: &mut World) {
        self.end_conversation(world);
    }

    /// Continue after the scene change requested by a goto-scene opcode
    pub fn resume_after_scene(&mut self) -> TalkStatus {
        if let Some(Wait::Scene(scene)) = self.wait {
            log::debug!("Resuming '{}' in scene {}", self.file_name, scene);
            self.wait = None;
        }
        self.status()
    }

    /// Perform one unit of work
    pub fn update(
        &mut self,
        world: &mut World,
        host: &mut dyn Host,
        input: Input,
    ) -> TalkResult<TalkStatus> {
        match self.phase {
            Phase::Idle => return Err(TalkError::NotLoaded),
            Phase::Completed => return Ok(TalkStatus::Completed),
            Phase::Aborted => return Ok(TalkStatus::Aborted),
            Phase::Choosing => return Ok(TalkStatus::Choosing),
            Phase::Prompt | Phase::Reply | Phase::ReplyDone => {}
        }

        if self.abort_requested && !matches!(self.wait, Some(Wait::Scene(_))) {
            log::info!("Conversation '{}' aborted", self.file_name);
            self.aborted_from = self.phase;
            self.wait = None;
            self.phase = Phase::Aborted;
            return Ok(TalkStatus::Aborted);
        }

        if let Some(wait) = self.wait {
            if !self.wait_done(world, host, input, wait) {
                return Ok(TalkStatus::Waiting(wait));
            }
            self.wait = None;
            if let Wait::More { .. } = wait {
                self.window.clear_page();
            }
        }

        match self.phase {
            Phase::Prompt => {
                world.talking = None;
                let index = self.selected.ok_or(TalkError::NotLoaded)?;
                self.begin_reply(world, index)?;
                Ok(TalkStatus::Running)
            }
            Phase::Reply => self.step(world, host),
            Phase::ReplyDone => self.complete_reply(world),
            _ => Ok(self.status()),
        }
    }

    fn suspend(&mut self, wait: Wait) {
        self.ticks_left = wait.ticks();
        self.wait = Some(wait);
    }

    fn wait_done(&mut self, world: &World, host: &dyn Host, input: Input, wait: Wait) -> bool {
        let elapsed = |ticks_left: &mut u32| {
            if *ticks_left == 0 {
                true
            } else {
                *ticks_left -= 1;
                false
            }
        };
        match wait {
            Wait::More { .. } | Wait::Pause { .. } => {
                input.is_some() || elapsed(&mut self.ticks_left)
            }
            Wait::Hold { .. } => elapsed(&mut self.ticks_left),
            Wait::Animation(id) => world.scene.get(id).map_or(true, |e| !e.is_animating()),
            Wait::Walk => !host.walking(),
            Wait::CutScene => !host.cutscene_running(),
            Wait::Scene(_) => false,
        }
    }

    fn page_ticks(&self) -> u32 {
        (self.window.char_count() as u32).max(self.config.page_ticks)
    }

    /// Suspend so the player can read the page, if it has text
    fn flush(&mut self) -> Option<TalkStatus> {
        if self.window.has_text() && !self.stealth {
            let wait = Wait::More {
                ticks: self.page_ticks(),
            };
            self.suspend(wait);
            Some(TalkStatus::Waiting(wait))
        } else {
            None
        }
    }

    fn speaker_label(&self, world: &World, speaker: u8) -> Option<String> {
        world
            .speaker_name(speaker)
            .map(str::to_string)
            .or_else(|| (speaker == 0).then(|| self.config.player_name.clone()))
    }

    fn begin_reply(&mut self, world: &mut World, index: usize) -> TalkResult<()> {
        let statement = &self.store.statements()[index];
        self.script = Script::new(statement.reply_program());
        self.stealth = statement.is_stealth();
        self.selected = Some(index);
        self.phase = Phase::Reply;
        self.switch_speaker(world, self.talk_to)
    }

    /// Undo the previous speaker's override and start the new one
    fn switch_speaker(&mut self, world: &mut World, speaker: u8) -> TalkResult<()> {
        self.sequences.pop(&mut world.scene);
        let target = if speaker == 0 {
            None
        } else {
            world.scene.find_speaker(speaker)
        };
        if self.sequences.push(&world.scene, target)? {
            if let Some(e) = target.and_then(|id| world.scene.get_mut(id)) {
                if let Some(program) = e.talk_program.clone() {
                    e.set_program(program);
                }
            }
        }
        self.speaker = Some(speaker);
        world.talking = Some(speaker);
        Ok(())
    }

    fn step(&mut self, world: &mut World, host: &mut dyn Host) -> TalkResult<TalkStatus> {
        let Some(byte) = self.script.peek() else {
            return Ok(self.end_of_reply());
        };
        if byte == COMMENT_OPEN {
            self.script.skip_comment();
            return Ok(TalkStatus::Running);
        }
        if byte < 128 {
            return Ok(self.text_line(world, host));
        }
        self.execute(world, host, byte)
    }

    fn end_of_reply(&mut self) -> TalkStatus {
        self.phase = Phase::ReplyDone;
        self.flush().unwrap_or(TalkStatus::Running)
    }

    fn text_line(&mut self, world: &World, host: &dyn Host) -> TalkStatus {
        let (line, next) = self.window.wrap(self.script.bytes(), self.script.pos, host);
        self.script.pos = next;
        if self.stealth || line.is_empty() {
            return TalkStatus::Running;
        }
        if !self.window.has_text() {
            let label = self.speaker.and_then(|s| self.speaker_label(world, s));
            self.window.set_header(label);
        }
        self.window.push_line(line);
        self.check_page_full()
    }

    /// A full page waits for the player unless a pause comes next
    fn check_page_full(&mut self) -> TalkStatus {
        if !self.window.is_full() {
            return TalkStatus::Running;
        }
        match self.script.peek() {
            None | Some(PAUSE) => TalkStatus::Running,
            Some(_) => self.flush().unwrap_or(TalkStatus::Running),
        }
    }

    fn execute(&mut self, world: &mut World, host: &mut dyn Host, code: u8) -> TalkResult<TalkStatus> {
        use super::opcode::{
            ASSIGN_PORTRAIT_LOCATION, BANISH_WINDOW, CALL_TALK_FILE, GOTO_SCENE, SWITCH_SPEAKER,
        };

        let flushes = matches!(
            code,
            SWITCH_SPEAKER | ASSIGN_PORTRAIT_LOCATION | GOTO_SCENE | BANISH_WINDOW | CALL_TALK_FILE
        );
        if flushes {
            if let Some(status) = self.flush() {
                return Ok(status);
            }
        }

        let start = self.script.pos;
        let (op, len) = match opcode::decode(self.script.bytes(), start) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("{} in '{}'; ending reply", e, self.file_name);
                self.script.pos = self.script.bytes().len();
                return Ok(self.end_of_reply());
            }
        };
        self.script.pos = start + len;
        log::debug!("{}@{}: {:?}", self.file_name, start, op);

        let wait = match op {
            Opcode::SwitchSpeaker(speaker) => {
                self.switch_speaker(world, speaker)?;
                None
            }
            Opcode::RunCAnim { index, reverse } => {
                match self.sequencer.start_canim(world, index, reverse) {
                    Ok(id) => Some(Wait::Animation(id)),
                    Err(SequenceError::MissingAnimation(i)) => {
                        log::warn!("Reply runs missing cut-scene animation {}", i);
                        None
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Opcode::AssignPortrait { side, flip } => {
                world.player.portrait_side = portrait_x(side);
                world.player.portrait_flip = flip;
                None
            }
            Opcode::Pause(ticks) => Some(Wait::Pause { ticks }),
            Opcode::RemovePortrait => {
                self.sequences.pop(&mut world.scene);
                world.talking = None;
                None
            }
            Opcode::ClearWindow => {
                self.window.clear_page();
                None
            }
            Opcode::AdjustObjSequence {
                name,
                save,
                sequence,
            } => {
                self.adjust_sequence(world, &name, save, sequence);
                None
            }
            Opcode::WalkToCoords { position, facing } => {
                host.start_walk(position, facing);
                Some(Wait::Walk)
            }
            Opcode::PauseWithoutControl(ticks) => Some(Wait::Hold { ticks }),
            Opcode::BanishWindow => {
                self.sequences.pop(&mut world.scene);
                world.talking = None;
                self.window.close();
                None
            }
            Opcode::SummonWindow => {
                self.window.open();
                None
            }
            Opcode::SetFlag(flag) => {
                world.flags.set(flag);
                None
            }
            Opcode::Sfx(name) => {
                host.play_sfx(&name);
                None
            }
            Opcode::ToggleObject(name) => {
                world.scene.toggle(&name);
                None
            }
            Opcode::StealthOn => {
                self.stealth = true;
                None
            }
            Opcode::StealthOff => {
                self.stealth = false;
                None
            }
            Opcode::If(flag) => {
                if !world.flags.read(flag) {
                    self.script.skip_to_else();
                }
                None
            }
            Opcode::Else => {
                self.script.skip_to_end_if();
                None
            }
            Opcode::EndIf => None,
            Opcode::PlayerOff => {
                world.player.visible = false;
                None
            }
            Opcode::PlayerOn => {
                world.player.visible = true;
                None
            }
            Opcode::GotoScene { scene, arrival } => {
                world.next_scene = Some(SceneChange { scene, arrival });
                Some(Wait::Scene(scene))
            }
            Opcode::PlayCutscene(name) => {
                host.start_cutscene(&name);
                Some(Wait::CutScene)
            }
            Opcode::AddItem(name) => {
                world.add_item(&name);
                None
            }
            Opcode::RemoveItem(name) => {
                world.remove_item(&name);
                None
            }
            Opcode::SetObject { name, hide } => {
                world.scene.set_visible(&name, !hide);
                None
            }
            Opcode::CallTalkFile(name) => {
                self.call_file(world, &name)?;
                None
            }
            Opcode::MoveMouse(pos) => {
                host.move_mouse(pos);
                if self.abort_requested {
                    self.aborted_from = self.phase;
                    self.phase = Phase::Aborted;
                    return Ok(TalkStatus::Aborted);
                }
                None
            }
            Opcode::InfoLine(text) => {
                world.info_line = Some(text);
                None
            }
            Opcode::ClearInfo => {
                world.info_line = None;
                None
            }
            Opcode::WalkToCAnim(index) => match world.scene.canim(index) {
                Some(canim) => {
                    host.start_walk(canim.goto_position, canim.goto_facing);
                    Some(Wait::Walk)
                }
                None => {
                    log::warn!("Walk to missing cut-scene animation {}", index);
                    None
                }
            },
            Opcode::EnableEndKey => {
                self.end_key_enabled = true;
                None
            }
            Opcode::DisableEndKey => {
                self.end_key_enabled = false;
                None
            }
            Opcode::CarriageReturn => {
                if !self.stealth {
                    self.window.push_line(String::new());
                    return Ok(self.check_page_full());
                }
                None
            }
            Opcode::Unknown(code) => {
                log::warn!("Skipping unknown opcode {} in '{}'", code, self.file_name);
                None
            }
        };

        match wait {
            Some(wait) => {
                self.suspend(wait);
                Ok(TalkStatus::Waiting(wait))
            }
            None => Ok(TalkStatus::Running),
        }
    }

    fn adjust_sequence(&mut self, world: &mut World, name: &str, save: bool, sequence: Vec<u8>) {
        let Some(id) = world.scene.find(name) else {
            log::warn!("Adjust sequence: no object named '{}'", name);
            return;
        };
        let Some(entity) = world.scene.get_mut(id) else {
            return;
        };
        if save && !self.saved_sequences.iter().any(|s| s.entity == id) {
            self.saved_sequences.push(SavedSequence {
                entity: id,
                program: entity.program.clone(),
                frame_number: entity.frame_number,
            });
        }
        entity.set_program(SequenceProgram::new(sequence));
    }

    fn call_file(&mut self, world: &mut World, name: &str) -> TalkResult<()> {
        let statement = self.selected.ok_or(TalkError::NotLoaded)?;
        let frame = CallFrame {
            file: self.file_name.clone(),
            resume: self.script.pos,
            statement,
            stealth: self.stealth,
        };
        if !self.calls.push(frame) {
            return Err(TalkError::CallStackOverflow {
                limit: MAX_CALL_DEPTH,
            });
        }
        if let Err(e) = self.load_file(world, name) {
            self.calls.pop();
            return Err(e);
        }
        log::debug!("Called '{}' (depth {})", name, self.calls.len());

        match self.store.entry() {
            Some(entry) => {
                self.record_entry(world, entry);
                let statement = &self.store.statements()[entry];
                self.stealth = statement.is_stealth();
                self.script = Script::new(statement.reply_program());
                self.selected = Some(entry);
            }
            None => {
                log::warn!("Called talk file '{}' has no available statements", name);
                self.script = Script::default();
            }
        }
        Ok(())
    }

    fn complete_reply(&mut self, world: &mut World) -> TalkResult<TalkStatus> {
        let statement = self
            .selected
            .and_then(|i| self.store.get(i))
            .cloned()
            .unwrap_or_default();

        if let Some(frame) = self.calls.pop() {
            for &flag in &statement.modified {
                world.flags.set(flag as i32);
            }
            self.load_file(world, &frame.file)?;
            let reply = self
                .store
                .get(frame.statement)
                .map(|s| s.reply_program().to_vec())
                .unwrap_or_default();
            self.selected = Some(frame.statement);
            self.script = Script::new(&reply);
            self.script.pos = frame.resume;
            self.stealth = frame.stealth;
            self.phase = Phase::Reply;
            log::debug!("Returned to '{}' at {}", frame.file, frame.resume);
            return Ok(TalkStatus::Running);
        }

        if !self.stealth {
            self.window.clear_page();
        }
        self.sequences.pop_all(&mut world.scene);
        world.talking = None;
        if !statement.modified.is_empty() {
            for &flag in &statement.modified {
                world.flags.set(flag as i32);
            }
            self.store.set_talk_map(&world.flags);
        }

        match statement.link_name() {
            Some(link) => {
                self.load_file(world, &link)?;
                self.enter_file(world)
            }
            None => {
                self.end_conversation(world);
                Ok(TalkStatus::Completed)
            }
        }
    }

    fn end_conversation(&mut self, world: &mut World) {
        self.sequences.pop_all(&mut world.scene);
        for saved in self.saved_sequences.drain(..) {
            if let Some(e) = world.scene.get_mut(saved.entity) {
                e.program = saved.program;
                e.frame_number = saved.frame_number;
                e.reset_loops();
            }
        }
        self.window.close();
        self.calls.clear();
        self.wait = None;
        self.selected = None;
        self.speaker = None;
        self.stealth = false;
        self.abort_requested = false;
        world.talking = None;
        world.mode = self.saved_mode;
        self.phase = Phase::Completed;
        log::info!("Conversation '{}' ended", self.file_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MonospaceHost, NullHost};
    use crate::scene::{CAnim, Entity, EntityKind, Point};
    use crate::talk::opcode::*;
    use crate::talk::statement::Statement;

    fn cstr(s: &[u8]) -> Vec<u8> {
        let mut v = s.to_vec();
        v.push(0);
        v
    }

    fn statement(prompt: &str, reply: &[u8], required: &[i16]) -> Statement {
        Statement {
            prompt: cstr(prompt.as_bytes()),
            reply: cstr(reply),
            required: required.to_vec(),
            ..Default::default()
        }
    }

    fn file(statements: Vec<Statement>) -> Vec<u8> {
        TalkFile {
            version: [1, 0],
            statements,
        }
        .serialize()
        .unwrap()
    }

    fn talk(files: &[(&str, Vec<u8>)]) -> Talk {
        let mut lib = TalkLibrary::new();
        for (name, bytes) in files {
            lib.insert(name, bytes.clone());
        }
        Talk::new(lib, TalkConfig::default())
    }

    /// Drive until the conversation needs a choice or ends, answering every
    /// wait with a key press
    fn run(talk: &mut Talk, world: &mut World, host: &mut dyn Host) -> TalkStatus {
        for _ in 0..10_000 {
            match talk.update(world, host, Input::Key(' ')).unwrap() {
                TalkStatus::Running | TalkStatus::Waiting(_) => continue,
                done => return done,
            }
        }
        panic!("conversation did not settle");
    }

    #[test]
    fn test_start_offers_choices() {
        let mut t = talk(&[("T1", file(vec![statement("Hello", b"Hi.", &[])]))]);
        let mut world = World::new(64);
        world.mode = MenuMode::Look;

        let status = t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        assert_eq!(status, TalkStatus::Choosing);
        assert_eq!(world.mode, MenuMode::Talk);
        let choices = t.choices(&world);
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].text, "Hello");
        assert!(!choices[0].seen);
    }

    #[test]
    fn test_select_runs_reply_and_ends() {
        let mut s = statement("Hello", b"Good day.", &[]);
        s.quotient = 3;
        s.modified = vec![7];
        let mut t = talk(&[("T1", file(vec![s]))]);
        let mut world = World::new(64);
        world.mode = MenuMode::Look;

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        let status = t.select_and_run(&mut world, &mut NullHost, 0).unwrap();
        assert!(matches!(status, TalkStatus::Waiting(Wait::More { ticks: 5 })));
        assert_eq!(t.window().lines(), &["Hello".to_string()]);

        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert!(world.flags.read(7));
        assert_eq!(world.player.quotient, 3);
        assert_eq!(world.journal.len(), 1);
        assert!(world.history.is_seen(0, 0));
        assert_eq!(world.mode, MenuMode::Look);
        assert!(t.window().transcript().contains(&"Good day.".to_string()));
        assert!(!t.window().is_open());
    }

    #[test]
    fn test_second_selection_adds_no_quotient() {
        let mut s = statement("Again", b"Yes.", &[]);
        s.quotient = 2;
        s.link = cstr(b"T1");
        let mut t = talk(&[("T1", file(vec![s]))]);
        let mut world = World::new(64);

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        t.select_and_run(&mut world, &mut NullHost, 0).unwrap();
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Choosing);
        assert!(t.choices(&world)[0].seen);

        t.select_and_run(&mut world, &mut NullHost, 0).unwrap();
        run(&mut t, &mut world, &mut NullHost);
        assert_eq!(world.player.quotient, 2);
        assert_eq!(world.journal.len(), 1);
    }

    #[test]
    fn test_reply_first_entry_runs_immediately() {
        let mut t = talk(&[(
            "T1",
            file(vec![statement("*", b"I was expecting you.", &[])]),
        )]);
        let mut world = World::new(64);
        assert_eq!(
            t.start(&mut world, &mut NullHost, "T1", 1).unwrap(),
            TalkStatus::Running
        );
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert!(world.journal.entries()[0].reply_only);
    }

    #[test]
    fn test_stealth_shows_no_text() {
        let mut t = talk(&[("T1", file(vec![statement("^", b"Hidden text", &[])]))]);
        let mut world = World::new(64);
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert!(t.window().transcript().is_empty());
    }

    #[test]
    fn test_transcript_starts_empty_each_conversation() {
        let mut t = talk(&[
            ("T1", file(vec![statement("*", b"First visit.", &[])])),
            ("T2", file(vec![statement("*", b"Second visit.", &[])])),
        ]);
        let mut world = World::new(64);

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        run(&mut t, &mut world, &mut NullHost);
        t.start(&mut world, &mut NullHost, "T2", 1).unwrap();
        run(&mut t, &mut world, &mut NullHost);
        assert_eq!(t.window().transcript(), &["Second visit.".to_string()]);
    }

    #[test]
    fn test_speaker_header_and_page_wait() {
        let mut reply = Vec::new();
        for i in 0..6 {
            reply.extend_from_slice(format!("Line number {} here. ", i).as_bytes());
        }
        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(64).with_cast(&["Holmes", "Watson"]);
        let mut host = MonospaceHost { glyph_width: 10 };

        t.start(&mut world, &mut host, "T1", 1).unwrap();
        let mut first_wait = None;
        for _ in 0..20 {
            if let TalkStatus::Waiting(w) = t.update(&mut world, &mut host, Input::None).unwrap() {
                first_wait = Some(w);
                break;
            }
        }
        // 4 text lines under the header fill the page
        assert_eq!(t.window().header(), Some("Watson"));
        assert_eq!(t.window().lines().len(), 4);
        assert!(matches!(first_wait, Some(Wait::More { ticks }) if ticks >= 160));
    }

    #[test]
    fn test_more_times_out() {
        let mut t = talk(&[("T1", file(vec![statement("Hi", b"Bye", &[])]))]);
        let mut world = World::new(64);
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        t.select_and_run(&mut world, &mut NullHost, 0).unwrap();

        // Prompt wait is the prompt length in ticks
        for _ in 0..2 {
            assert!(matches!(
                t.update(&mut world, &mut NullHost, Input::None).unwrap(),
                TalkStatus::Waiting(Wait::More { .. })
            ));
        }
        assert_eq!(
            t.update(&mut world, &mut NullHost, Input::None).unwrap(),
            TalkStatus::Running
        );
    }

    #[test]
    fn test_flag_and_inventory_opcodes() {
        let [hi, lo] = encode_flag(12).unwrap();
        let mut reply = vec![SET_FLAG, hi, lo, ADD_ITEM_TO_INVENTORY, 4];
        reply.extend_from_slice(b"Pipe");
        reply.extend_from_slice(&[DISPLAY_INFO_LINE, 3]);
        reply.extend_from_slice(b"Ok!");
        reply.extend_from_slice(&[TOGGLE_OBJECT, 4]);
        reply.extend_from_slice(b"Lamp");
        reply.extend_from_slice(&[TURN_HOLMES_OFF, 250]);

        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(64);
        let lamp = world.scene.add(Entity::new("Lamp")).unwrap();
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);

        assert!(world.flags.read(12));
        assert!(world.has_item("pipe"));
        assert_eq!(world.info_line.as_deref(), Some("Ok!"));
        assert_eq!(world.scene.get(lamp).unwrap().kind, EntityKind::Hidden);
        assert!(!world.player.visible);
    }

    #[test]
    fn test_truncated_operand_ends_reply() {
        let mut t = talk(&[(
            "T1",
            file(vec![statement("*", &[b'A', SFX_COMMAND, b'B'], &[])]),
        )]);
        let mut world = World::new(64);
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert_eq!(t.window().transcript(), &["A".to_string()]);
    }

    #[test]
    fn test_speaker_switch_pushes_and_end_restores() {
        let reply = [b'A', SWITCH_SPEAKER, 3, b'B', BANISH_WINDOW];
        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(64).with_cast(&["Holmes", "Watson", "Lestrade"]);
        let watson = world.scene.add(
            Entity::new("Watson")
                .with_speaker(1)
                .with_program(vec![1u8, 2, 0])
                .with_talk_program(vec![9u8, 10, 0]),
        ).unwrap();
        let lestrade = world.scene.add(
            Entity::new("Lestrade")
                .with_speaker(2)
                .with_program(vec![3u8, 0])
                .with_talk_program(vec![11u8, 0]),
        ).unwrap();
        let before: Vec<Entity> = vec![
            world.scene.get(watson).unwrap().clone(),
            world.scene.get(lestrade).unwrap().clone(),
        ];

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        t.update(&mut world, &mut NullHost, Input::None).unwrap();
        assert_eq!(t.sequences().len(), 1);
        assert_eq!(
            world.scene.get(watson).unwrap().program.as_ref().unwrap().bytes(),
            &[9, 10, 0]
        );

        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert!(t.sequences().is_empty());
        let (pushes, pops) = t.sequences().counts();
        assert_eq!(pushes, pops);
        assert_eq!(world.scene.get(watson).unwrap(), &before[0]);
        assert_eq!(world.scene.get(lestrade).unwrap(), &before[1]);
    }

    #[test]
    fn test_call_talk_file_resumes_parent() {
        let mut parent_reply = b"Before ".to_vec();
        parent_reply.push(CALL_TALK_FILE);
        parent_reply.extend_from_slice(b"CHILD~~~");
        parent_reply.extend_from_slice(b"After");
        let mut child = statement("*", b"Inside", &[]);
        child.modified = vec![21];

        let mut t = talk(&[
            ("PARENT", file(vec![statement("*", &parent_reply, &[])])),
            ("CHILD", file(vec![child])),
        ]);
        let mut world = World::new(64);
        t.start(&mut world, &mut NullHost, "PARENT", 1).unwrap();
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);

        assert_eq!(
            t.window().transcript(),
            &["Before".to_string(), "Inside".to_string(), "After".to_string()]
        );
        assert!(world.flags.read(21));
        assert!(world.history.is_seen(1, 0));
        assert_eq!(t.call_depth(), 0);
    }

    #[test]
    fn test_call_stack_overflow() {
        let mut reply = vec![CALL_TALK_FILE];
        reply.extend_from_slice(b"LOOP~~~~");
        let mut t = talk(&[("LOOP", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(64);
        t.start(&mut world, &mut NullHost, "LOOP", 1).unwrap();

        let mut result = Ok(TalkStatus::Running);
        for _ in 0..100 {
            result = t.update(&mut world, &mut NullHost, Input::None);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(
            result,
            Err(TalkError::CallStackOverflow {
                limit: MAX_CALL_DEPTH
            })
        );
    }

    #[test]
    fn test_missing_file() {
        let mut t = talk(&[]);
        let mut world = World::new(8);
        assert_eq!(
            t.start(&mut world, &mut NullHost, "NOPE", 1),
            Err(TalkError::MissingFile("NOPE".into()))
        );
    }

    #[test]
    fn test_canim_wait_and_abort() {
        let reply = [RUN_CANIMATION, 1, b'X'];
        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(8);
        world.scene.add_canim(CAnim::new("Fall", vec![1u8, 2, 0]));

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        t.update(&mut world, &mut NullHost, Input::None).unwrap();
        let status = t.update(&mut world, &mut NullHost, Input::None).unwrap();
        assert!(matches!(status, TalkStatus::Waiting(Wait::Animation(_))));

        t.abort();
        assert_eq!(
            t.update(&mut world, &mut NullHost, Input::None).unwrap(),
            TalkStatus::Aborted
        );
        assert_eq!(t.phase(), Phase::Aborted);
        assert_eq!(t.sequences().len(), 0);

        assert_eq!(t.resume_quiet(), TalkStatus::Running);
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert_eq!(t.window().transcript(), &["X".to_string()]);
    }

    #[test]
    fn test_canim_completes_with_sequencer() {
        let reply = [RUN_CANIMATION, 1, b'Y'];
        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(8);
        world.scene.add_canim(CAnim::new("Wave", vec![1u8, 2, 0]));
        let seq = Sequencer::default();

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        let mut waited = 0;
        loop {
            seq.animate_all(&mut world, &mut NullHost).unwrap();
            match t.update(&mut world, &mut NullHost, Input::None).unwrap() {
                TalkStatus::Waiting(Wait::Animation(_)) => waited += 1,
                TalkStatus::Completed => break,
                _ => {}
            }
            assert!(waited < 50);
        }
        assert!(waited >= 2);
    }

    #[test]
    fn test_goto_scene_waits_for_resume() {
        let reply = [GOTO_SCENE, 4, 1, 1, 11, 21, b'Z'];
        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(8);
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();

        t.update(&mut world, &mut NullHost, Input::None).unwrap();
        for _ in 0..3 {
            assert_eq!(
                t.update(&mut world, &mut NullHost, Input::Click).unwrap(),
                TalkStatus::Waiting(Wait::Scene(3))
            );
        }
        let change = world.take_scene_change().unwrap();
        assert_eq!(change.arrival, Some((Point::new(10, 20), 0)));

        t.resume_after_scene();
        assert_eq!(run(&mut t, &mut world, &mut NullHost), TalkStatus::Completed);
        assert_eq!(t.window().transcript(), &["Z".to_string()]);
    }

    #[test]
    fn test_adjust_sequence_restored_at_end() {
        let mut reply = vec![ADJUST_OBJ_SEQUENCE, 0x80 | 4, 3];
        reply.extend_from_slice(b"Door");
        reply.extend_from_slice(&[6, 7, 1]);
        let mut t = talk(&[("T1", file(vec![statement("*", &reply, &[])]))]);
        let mut world = World::new(8);
        let door = world.scene.add(Entity::new("Door").with_program(vec![1u8, 0])).unwrap();

        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        t.update(&mut world, &mut NullHost, Input::None).unwrap();
        assert_eq!(
            world.scene.get(door).unwrap().program.as_ref().unwrap().bytes(),
            &[5, 6, 0]
        );
        run(&mut t, &mut world, &mut NullHost);
        assert_eq!(
            world.scene.get(door).unwrap().program.as_ref().unwrap().bytes(),
            &[1, 0]
        );
    }

    #[test]
    fn test_exit_requires_end_key() {
        let mut t = talk(&[("T1", file(vec![statement("Hi", b"x", &[])]))]);
        let mut world = World::new(8);
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        t.end_key_enabled = false;
        assert!(!t.exit(&mut world));
        t.end_key_enabled = true;
        assert!(t.exit(&mut world));
        assert_eq!(t.phase(), Phase::Completed);
    }

    #[test]
    fn test_select_outside_choosing() {
        let mut t = talk(&[("T1", file(vec![statement("Hi", b"x", &[])]))]);
        let mut world = World::new(8);
        assert_eq!(
            t.select_and_run(&mut world, &mut NullHost, 0),
            Err(TalkError::NotChoosing)
        );
        t.start(&mut world, &mut NullHost, "T1", 1).unwrap();
        assert_eq!(
            t.select_and_run(&mut world, &mut NullHost, 4),
            Err(TalkError::InvalidChoice(4))
        );
    }
}
