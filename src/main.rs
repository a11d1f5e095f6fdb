use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use parlor::cli::{Cli, Command};
use parlor::config::{self, Options};
use parlor::host::Host;
use parlor::logging;
use parlor::resource::{TalkLibrary, TALK_EXTENSION};
use parlor::scene::{Point, Sequencer};
use parlor::state::FlagSet;
use parlor::talk::{Input, StatementStore, Talk, TalkFile, TalkStatus, TalkWindow, Wait};
use parlor::world::World;

/// Ticks after which a headless conversation is considered stuck
const MAX_TICKS: usize = 100_000;

/// Host for headless runs: fixed-width text and logged side effects
struct HeadlessHost {
    glyph_width: u32,
}

impl Host for HeadlessHost {
    fn play_sound(&mut self, index: usize) {
        log::info!("Sound {}", index);
    }

    fn play_sfx(&mut self, name: &str) {
        log::info!("Sound effect '{}'", name);
    }

    fn play_speech(&mut self, name: &str) {
        log::info!("Speech '{}'", name);
    }

    fn start_cutscene(&mut self, name: &str) {
        println!("  <cut-scene {}>", name);
    }

    fn start_walk(&mut self, target: Point, facing: u8) {
        log::info!("Walk to ({}, {}) facing {}", target.x, target.y, facing);
    }

    fn show_message(&mut self, number: usize) {
        println!("  <message {}>", number);
    }

    fn string_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.glyph_width
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = config::load_config(cli.config.as_deref())?;
    let options = cli.merge_into_options(options)?;
    logging::init(options.log_level);
    log::debug!("Options: {:?}", options);

    match &cli.command {
        Command::Dump { file } => {
            let (library, name) = load_library(&options, file)?;
            dump(&library, &name)
        }
        Command::Play {
            file,
            choose,
            talkto,
            flags,
            cast,
        } => {
            let (library, name) = load_library(&options, file)?;
            play(&options, library, &name, *talkto, choose, flags, cast)
        }
    }
}

/// Load the content directory. `file` may also be a path to a talk file,
/// whose directory is then loaded. Returns the library and the file's name.
fn load_library(options: &Options, file: &str) -> Result<(TalkLibrary, String)> {
    let path = Path::new(file);
    let is_path = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(TALK_EXTENSION));

    let (dir, name) = if is_path {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Invalid talk file name {}", file))?;
        (dir.to_path_buf(), stem.to_string())
    } else {
        let dir = options.content_dir.as_deref().unwrap_or(".");
        (Path::new(dir).to_path_buf(), file.to_string())
    };

    let mut library = TalkLibrary::new();
    let count = library
        .load_dir(&dir)
        .with_context(|| format!("Cannot load talk files from {}", dir.display()))?;
    log::info!("Loaded {} talk files from {}", count, dir.display());
    if library.id_of(&name).is_none() {
        anyhow::bail!("Talk file '{}' not found in {}", name, dir.display());
    }
    Ok((library, name))
}

fn dump(library: &TalkLibrary, name: &str) -> Result<()> {
    let (id, bytes) = library
        .get(name)
        .with_context(|| format!("Talk file '{}' not found", name))?;
    let file = TalkFile::parse(bytes).with_context(|| format!("Cannot parse '{}'", name))?;
    let store = StatementStore::new(file.statements, &FlagSet::default());

    println!("{} (id {}, version {}.{})", name, id, file.version[0], file.version[1]);
    for (i, s) in store.statements().iter().enumerate() {
        let map = if s.is_visible() {
            s.talk_map.to_string()
        } else {
            "-".to_string()
        };
        println!("[{:2}] map {:>2}  {}", i, map, s.prompt_text());
        if !s.required.is_empty() {
            println!("       requires {:?}", s.required);
        }
        if !s.modified.is_empty() {
            println!("       modifies {:?}", s.modified);
        }
        if let Some(link) = s.link_name() {
            println!("       links to {}", link);
        }
        println!("       reply {} bytes", s.reply_program().len());
    }
    Ok(())
}

fn print_page(window: &TalkWindow) {
    if !window.has_text() {
        return;
    }
    if let Some(header) = window.header() {
        println!("{}:", header);
    }
    for line in window.lines() {
        println!("  {}", line);
    }
    println!();
}

fn play(
    options: &Options,
    library: TalkLibrary,
    name: &str,
    talk_to: u8,
    choices: &[usize],
    flags: &[i32],
    cast: &[String],
) -> Result<()> {
    let mut world = World::new(options.flag_count);
    world.cast = cast.to_vec();
    for &flag in flags {
        world.flags.set(flag);
    }
    let mut host = HeadlessHost {
        glyph_width: options.glyph_width,
    };
    let sequencer = Sequencer::new(options.dialect);
    let mut talk = Talk::new(library, options.talk_config());
    let mut pending = choices.iter().copied();

    let mut status = talk.start(&mut world, &mut host, name, talk_to)?;
    for _ in 0..MAX_TICKS {
        match status {
            TalkStatus::Completed => {
                print_page(talk.window());
                println!("-- conversation ended");
                return Ok(());
            }
            TalkStatus::Aborted => {
                println!("-- conversation aborted");
                return Ok(());
            }
            TalkStatus::Choosing => {
                for choice in talk.choices(&world) {
                    let mark = if choice.seen { '*' } else { ' ' };
                    println!("{}{}) {}", mark, choice.index, choice.text);
                }
                let Some(index) = pending.next() else {
                    println!("-- no more choices");
                    talk.finish(&mut world);
                    return Ok(());
                };
                println!("> {}\n", index);
                status = talk.select_and_run(&mut world, &mut host, index)?;
                continue;
            }
            TalkStatus::Waiting(Wait::More { .. }) => print_page(talk.window()),
            TalkStatus::Waiting(Wait::Scene(scene)) => {
                if let Some(change) = world.take_scene_change() {
                    println!("-- scene {} {:?}", change.scene, change.arrival);
                }
                log::debug!("Scene {} loaded", scene);
                talk.resume_after_scene();
            }
            _ => {}
        }

        sequencer.animate_all(&mut world, &mut host)?;
        let input = match status {
            TalkStatus::Waiting(Wait::More { .. }) | TalkStatus::Waiting(Wait::Pause { .. }) => {
                Input::Key(' ')
            }
            _ => Input::None,
        };
        status = talk.update(&mut world, &mut host, input)?;
    }
    anyhow::bail!("Conversation '{}' did not finish within {} ticks", name, MAX_TICKS)
}
