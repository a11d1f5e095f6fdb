//! Property tests for the talk-file codec, talk maps and the sequencer.

use proptest::prelude::*;

use parlor::host::NullHost;
use parlor::scene::program::LOOP_CODE;
use parlor::scene::{Dialect, Entity, SeqStep, Sequencer};
use parlor::state::FlagSet;
use parlor::talk::{Statement, StatementStore, TalkFile};
use parlor::world::World;

const FLAG_COUNT: usize = 32;

fn flag_id() -> impl Strategy<Value = i16> {
    (1i16..FLAG_COUNT as i16).prop_flat_map(|f| prop_oneof![Just(f), Just(-f)])
}

fn statement() -> impl Strategy<Value = Statement> {
    (
        proptest::collection::vec(any::<u8>(), 0..40),
        proptest::collection::vec(any::<u8>(), 0..80),
        proptest::collection::vec(any::<u8>(), 0..9),
        proptest::collection::vec(any::<u8>(), 0..9),
        proptest::collection::vec(flag_id(), 0..4),
        proptest::collection::vec(flag_id(), 0..4),
        any::<u8>(),
        any::<u16>(),
    )
        .prop_map(
            |(prompt, reply, link, voice, required, modified, portrait_side, quotient)| Statement {
                prompt,
                reply,
                link,
                voice,
                required,
                modified,
                portrait_side,
                quotient,
                talk_map: -1,
            },
        )
}

/// Frames and loop codes only, always terminated
fn sequence_program() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![
            4 => 1u8..100,
            1 => (0u8..4).prop_map(|n| LOOP_CODE + n),
        ],
        1..24,
    )
    .prop_map(|mut bytes| {
        bytes.push(0);
        bytes
    })
}

proptest! {
    #[test]
    fn talk_file_round_trips(
        version in any::<[u8; 2]>(),
        statements in proptest::collection::vec(statement(), 0..8),
    ) {
        let file = TalkFile { version, statements };
        let bytes = file.serialize().unwrap();
        let parsed = TalkFile::parse(&bytes).unwrap();
        prop_assert_eq!(&parsed, &file);
        prop_assert_eq!(parsed.serialize().unwrap(), bytes);
    }

    #[test]
    fn talk_map_is_dense_in_file_order(
        statements in proptest::collection::vec(statement(), 0..12),
        set in proptest::collection::vec(any::<bool>(), FLAG_COUNT),
    ) {
        let mut flags = FlagSet::new(FLAG_COUNT);
        for (i, &on) in set.iter().enumerate() {
            flags.put(i, on);
        }

        let store = StatementStore::new(statements, &flags);
        let mut next = 0;
        for s in store.statements() {
            if flags.all(&s.required) {
                prop_assert_eq!(s.talk_map, next);
                next += 1;
            } else {
                prop_assert_eq!(s.talk_map, -1);
            }
        }
        prop_assert_eq!(store.visible().len(), next as usize);
    }

    #[test]
    fn sequencer_is_deterministic(
        program in sequence_program(),
        ticks in 1usize..60,
        tattoo in any::<bool>(),
    ) {
        let dialect = if tattoo { Dialect::Tattoo } else { Dialect::Scalpel };
        let sequencer = Sequencer::new(dialect);
        let trace = || {
            let mut world = World::new(8);
            let id = world.scene.add(Entity::new("Prop").with_program(program.clone())).unwrap();
            (0..ticks)
                .map(|_| sequencer.advance_one(&mut world, id, &mut NullHost))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(trace(), trace());
    }

    #[test]
    fn loop_repeats_then_falls_through(count in 1u8..20) {
        let sequencer = Sequencer::new(Dialect::Scalpel);
        let mut world = World::new(8);
        let id = world.scene.add(Entity::new("Clock").with_program(vec![5, LOOP_CODE + count, 7, 0])).unwrap();

        let frames: Vec<SeqStep> = (0..=count as usize)
            .map(|_| sequencer.advance_one(&mut world, id, &mut NullHost).unwrap())
            .collect();
        let mut expected = vec![SeqStep::Frame(5); count as usize];
        expected.push(SeqStep::Frame(7));
        prop_assert_eq!(frames, expected);
    }
}
