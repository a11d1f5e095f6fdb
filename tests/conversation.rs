//! End-to-end conversation scenarios driven through the public API.

use rstest::rstest;

use parlor::host::NullHost;
use parlor::resource::TalkLibrary;
use parlor::scene::{CAnim, Entity, Sequencer};
use parlor::state::{load_state, save_state, FlagSet, Journal, JournalEntry, TalkHistory};
use parlor::talk::opcode::{
    encode_flag, BANISH_WINDOW, CALL_TALK_FILE, ELSE_STATEMENT, END_IF_STATEMENT, IF_STATEMENT,
    RUN_CANIMATION, SWITCH_SPEAKER,
};
use parlor::talk::{Input, Statement, Talk, TalkConfig, TalkError, TalkFile, TalkStatus};
use parlor::world::World;

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

fn talk_file(statements: Vec<Statement>) -> Vec<u8> {
    TalkFile {
        version: [1, 0],
        statements,
    }
    .serialize()
    .unwrap()
}

fn talk_with(files: &[(&str, Vec<u8>)]) -> Talk {
    let mut library = TalkLibrary::new();
    for (name, bytes) in files {
        library.insert(name, bytes.clone());
    }
    Talk::new(library, TalkConfig::default())
}

/// Drive the conversation until it needs a choice or ends, pressing a key
/// at every page
fn drive(talk: &mut Talk, world: &mut World) -> TalkStatus {
    for _ in 0..10_000 {
        match talk.update(world, &mut NullHost, Input::Key(' ')).unwrap() {
            TalkStatus::Running | TalkStatus::Waiting(_) => {}
            settled => return settled,
        }
    }
    panic!("conversation never settled");
}

#[test]
fn test_three_statement_scenario() {
    let file = talk_file(vec![
        statement("Good morning.", b"Reply zero", &[]),
        statement("About the flag?", b"Reply one", &[5]),
        statement("Anything else?", b"Reply two", &[-5]),
    ]);
    let mut talk = talk_with(&[("LESTR1", file)]);
    let mut world = World::new(64);

    assert_eq!(
        talk.start(&mut world, &mut NullHost, "LESTR1", 1).unwrap(),
        TalkStatus::Choosing
    );

    let choices = talk.choices(&world);
    let indices: Vec<usize> = choices.iter().map(|c| c.index).collect();
    let texts: Vec<&str> = choices.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(texts, vec!["Good morning.", "Anything else?"]);

    let maps: Vec<i32> = talk.statements().statements().iter().map(|s| s.talk_map).collect();
    assert_eq!(maps, vec![0, -1, 1]);

    talk.select_and_run(&mut world, &mut NullHost, 1).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Completed);

    let transcript = talk.window().transcript();
    assert!(transcript.contains(&"Reply two".to_string()));
    assert!(!transcript.contains(&"Reply zero".to_string()));
    assert!(world.history.is_seen(0, 2));
    assert!(!world.history.is_seen(0, 0));
}

#[rstest]
#[case::flag_set(true, &["B", "C"])]
#[case::flag_clear(false, &["A", "C"])]
fn test_if_else_branches(#[case] flag_set: bool, #[case] expected: &[&str]) {
    // IF (flag 10 is false) A ELSE B END-IF C
    let [hi, lo] = encode_flag(0x8000 | 10).unwrap();
    let mut reply = vec![IF_STATEMENT, hi, lo, b'A', ELSE_STATEMENT, b'B', END_IF_STATEMENT];
    reply.push(b'C');

    let mut talk = talk_with(&[("IFTEST", talk_file(vec![statement("*", &reply, &[])]))]);
    let mut world = World::new(64);
    world.flags.put(10, flag_set);

    talk.start(&mut world, &mut NullHost, "IFTEST", 1).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Completed);
    assert_eq!(talk.window().transcript(), expected);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn test_sequence_stack_balanced(#[case] switches: u8) {
    let mut reply = Vec::new();
    for i in 0..switches {
        reply.extend_from_slice(&[SWITCH_SPEAKER, (i % 3) + 2, b'x']);
    }
    for _ in 0..switches {
        reply.push(BANISH_WINDOW);
    }

    let mut talk = talk_with(&[("STACK", talk_file(vec![statement("*", &reply, &[])]))]);
    let mut world = World::new(16);
    for speaker in 1..=3u8 {
        world.scene.add(
            Entity::new(&format!("Npc{}", speaker))
                .with_speaker(speaker)
                .with_program(vec![speaker, speaker + 1, 0])
                .with_talk_program(vec![40 + speaker, 0]),
        ).unwrap();
    }
    let before: Vec<Entity> = world.scene.ids().map(|id| world.scene.get(id).unwrap().clone()).collect();

    talk.start(&mut world, &mut NullHost, "STACK", 1).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Completed);

    assert!(talk.sequences().is_empty());
    let (pushes, pops) = talk.sequences().counts();
    assert_eq!(pushes, pops);
    assert_eq!(pushes, switches as usize + 1);
    let after: Vec<Entity> = world.scene.ids().map(|id| world.scene.get(id).unwrap().clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_nested_call_and_link() {
    let mut outer = b"Let me ask ".to_vec();
    outer.push(CALL_TALK_FILE);
    outer.extend_from_slice(b"INNER~~~");
    outer.extend_from_slice(b"Done.");
    let mut start = statement("*", &outer, &[]);
    start.link = cstr(b"NEXT");

    let mut inner = statement("*", b"Inner words", &[]);
    inner.modified = vec![3];

    let mut talk = talk_with(&[
        ("OUTER", talk_file(vec![start])),
        ("INNER", talk_file(vec![inner])),
        ("NEXT", talk_file(vec![statement("Then what?", b"Nothing.", &[3])])),
    ]);
    let mut world = World::new(16);

    talk.start(&mut world, &mut NullHost, "OUTER", 1).unwrap();
    // The link target only shows statements whose flags the callee set
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Choosing);
    assert_eq!(talk.file_name(), "NEXT");
    assert_eq!(talk.choices(&world).len(), 1);
    assert_eq!(
        talk.window().transcript(),
        &["Let me ask", "Inner words", "Done."]
    );

    talk.select_and_run(&mut world, &mut NullHost, 0).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Completed);
}

#[test]
fn test_link_to_choices_restores_speaker() {
    let mut first = statement("*", b"Come in.", &[]);
    first.link = cstr(b"NEXT");
    let mut talk = talk_with(&[
        ("FIRST", talk_file(vec![first])),
        ("NEXT", talk_file(vec![statement("Who are you?", b"Gregson.", &[])])),
    ]);
    let mut world = World::new(16);
    let npc = world
        .scene
        .add(
            Entity::new("Npc")
                .with_speaker(1)
                .with_program(vec![1u8, 2, 0])
                .with_talk_program(vec![9u8, 0]),
        )
        .unwrap();
    let before = world.scene.get(npc).unwrap().clone();

    talk.start(&mut world, &mut NullHost, "FIRST", 1).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Choosing);

    // The speaking override ends with the reply, not with the conversation
    assert!(talk.sequences().is_empty());
    assert_eq!(world.scene.get(npc).unwrap(), &before);
    assert_eq!(world.talking, None);
}

#[test]
fn test_stealth_callee_is_silent_and_journaled() {
    let mut outer = b"A".to_vec();
    outer.push(CALL_TALK_FILE);
    outer.extend_from_slice(b"QUIET~~~");
    outer.push(b'B');
    let mut talk = talk_with(&[
        ("PARENT", talk_file(vec![statement("*", &outer, &[])])),
        ("QUIET", talk_file(vec![statement("^", b"Secret", &[])])),
    ]);
    let mut world = World::new(16);

    talk.start(&mut world, &mut NullHost, "PARENT", 1).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Completed);

    // The caller's own text is shown again after the callee returns
    assert_eq!(talk.window().transcript(), &["A", "B"]);
    assert_eq!(
        world.journal.entries(),
        &[
            JournalEntry {
                file: 0,
                statement: 0,
                reply_only: true
            },
            JournalEntry {
                file: 1,
                statement: 0,
                reply_only: true
            },
        ]
    );
    assert!(world.history.is_seen(1, 0));
}

#[test]
fn test_repeated_cutscenes_reuse_arena() {
    let reply = [RUN_CANIMATION, 1, b'X'];
    let mut talk = talk_with(&[("FALL", talk_file(vec![statement("*", &reply, &[])]))]);
    let mut world = World::new(16);
    world.scene.add_canim(CAnim::new("Fall", vec![1u8, 2, 0]));
    let sequencer = Sequencer::default();

    for _ in 0..50 {
        talk.start(&mut world, &mut NullHost, "FALL", 1).unwrap();
        let mut status = TalkStatus::Running;
        for _ in 0..100 {
            sequencer.animate_all(&mut world, &mut NullHost).unwrap();
            status = talk.update(&mut world, &mut NullHost, Input::Key(' ')).unwrap();
            if status == TalkStatus::Completed {
                break;
            }
        }
        assert_eq!(status, TalkStatus::Completed);
        assert_eq!(talk.window().transcript(), &["X"]);
    }
    assert_eq!(world.scene.len(), 1);
}

#[test]
fn test_missing_called_file_is_fatal() {
    let mut reply = vec![CALL_TALK_FILE];
    reply.extend_from_slice(b"GHOST~~~");
    let mut talk = talk_with(&[("CALLER", talk_file(vec![statement("*", &reply, &[])]))]);
    let mut world = World::new(16);

    talk.start(&mut world, &mut NullHost, "CALLER", 1).unwrap();
    let err = talk.update(&mut world, &mut NullHost, Input::None).unwrap_err();
    assert_eq!(err, TalkError::MissingFile("GHOST".into()));
    assert_eq!(talk.call_depth(), 0);
}

#[test]
fn test_library_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("holmes.tlk"),
        talk_file(vec![statement("*", b"Elementary.", &[])]),
    )
    .unwrap();

    let mut library = TalkLibrary::new();
    assert_eq!(library.load_dir(dir.path()).unwrap(), 1);
    let mut talk = Talk::new(library, TalkConfig::default());
    let mut world = World::new(16);

    talk.start(&mut world, &mut NullHost, "HOLMES", 0).unwrap();
    assert_eq!(drive(&mut talk, &mut world), TalkStatus::Completed);
    assert_eq!(talk.window().transcript(), &["Elementary."]);
}

#[test]
fn test_progress_survives_save() {
    let mut first = statement("Who are you?", b"A friend.", &[]);
    first.modified = vec![9];
    let mut talk = talk_with(&[("SAVE", talk_file(vec![first]))]);
    let mut world = World::new(32);

    talk.start(&mut world, &mut NullHost, "SAVE", 1).unwrap();
    talk.select_and_run(&mut world, &mut NullHost, 0).unwrap();
    drive(&mut talk, &mut world);

    let bytes = save_state(&world.flags, &world.history, &world.journal);
    let mut flags = FlagSet::new(32);
    let mut history = TalkHistory::default();
    let mut journal = Journal::default();
    load_state(&bytes, &mut flags, &mut history, &mut journal).unwrap();

    assert!(flags.read(9));
    assert!(history.is_seen(0, 0));
    assert_eq!(journal.entries(), world.journal.entries());
}
