mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use proptest::prelude::*;
use rand::rngs::mock::StepRng;
use synthwave_sequencer::random::seeded_source;
use synthwave_sequencer::{
    resolve, ClockAdapter, Pattern, PatternStore, SchedulerSession, SessionOptions, StepContext,
    TempoHandle,
};

use support::recording_dispatcher;

#[derive(Clone, Debug)]
enum Edit {
    Resize(u32),
    Toggle { row: u8, step: u8 },
    Gate { row: u8, step: u8, value: f32 },
    Ratchet { row: u8, step: u8, value: f32 },
    Randomize { density: f32, seed: u64 },
    Clear,
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (1u32..=80).prop_map(Edit::Resize),
        (any::<u8>(), any::<u8>()).prop_map(|(row, step)| Edit::Toggle { row, step }),
        (any::<u8>(), any::<u8>(), -1.0f32..2.0).prop_map(|(row, step, value)| Edit::Gate {
            row,
            step,
            value,
        }),
        (any::<u8>(), any::<u8>(), -3.0f32..9.0).prop_map(|(row, step, value)| Edit::Ratchet {
            row,
            step,
            value,
        }),
        (0.0f32..1.0, any::<u64>()).prop_map(|(density, seed)| Edit::Randomize { density, seed }),
        Just(Edit::Clear),
    ]
}

proptest! {
    #[test]
    fn clock_visits_every_step_once_per_cycle(steps in 1u32..=64, cycles in 1usize..4) {
        let mut clock = ClockAdapter::new();
        let visited: Vec<u32> = (0..steps as usize * cycles)
            .map(|i| clock.on_tick(i as f64, steps).step)
            .collect();
        for (i, step) in visited.iter().enumerate() {
            prop_assert_eq!(*step, i as u32 % steps);
        }
    }

    #[test]
    fn solo_takes_precedence_over_mute(
        mutes in prop::collection::vec(any::<bool>(), 16),
        solos in prop::collection::vec(any::<bool>(), 16),
    ) {
        let mut pattern = Pattern::default();
        for row in 0..16 {
            pattern.set_velocity(row, 0, 1.0).unwrap();
            pattern.set_row_mute(row, mutes[row]).unwrap();
            pattern.set_row_solo(row, solos[row]).unwrap();
        }
        let ctx = StepContext { step_index: 0, step_time: 0.0, bpm: 120.0, swing_pct: 0.0, humanize_ms: 0.0 };
        let fired: Vec<usize> = resolve(&pattern, &ctx, &mut StepRng::new(0, 0))
            .iter()
            .map(|intent| intent.row)
            .collect();
        let any_solo = solos.iter().any(|s| *s);
        let expected: Vec<usize> = (0..16)
            .filter(|row| if any_solo { solos[*row] } else { !mutes[*row] })
            .collect();
        prop_assert_eq!(fired, expected);
    }

    #[test]
    fn editor_sequences_keep_the_grid_rectangular(edits in prop::collection::vec(edit_strategy(), 1..48)) {
        let mut pattern = Pattern::default();
        for edit in edits {
            let rows = pattern.row_count();
            let steps = pattern.steps() as usize;
            match edit {
                Edit::Resize(steps) => pattern.set_steps(steps).unwrap(),
                Edit::Toggle { row, step } => {
                    pattern.toggle_cell(row as usize % rows, step as usize % steps).unwrap()
                }
                Edit::Gate { row, step, value } => {
                    pattern.set_gate(row as usize % rows, step as usize % steps, value).unwrap()
                }
                Edit::Ratchet { row, step, value } => {
                    pattern.set_ratchet(row as usize % rows, step as usize % steps, value).unwrap()
                }
                Edit::Randomize { density, seed } => pattern.randomize(density, &mut seeded_source(seed)),
                Edit::Clear => pattern.clear(),
            }
            prop_assert!(pattern.validate_shape().is_ok());
            prop_assert!(pattern.steps() >= 1 && pattern.steps() <= 64);
        }
        for row in pattern.rows() {
            for cell in row.cells() {
                prop_assert!(cell.gate >= 0.1 && cell.gate <= 1.0);
                prop_assert!((1..=4).contains(&cell.ratchet));
            }
        }
    }

    #[test]
    fn each_row_schedules_strictly_increasing_times(
        seed in any::<u64>(),
        swing in 0.0f32..80.0,
        humanize in 0.0f32..40.0,
        bpm in 60.0f32..200.0,
    ) {
        let store = Arc::new(PatternStore::default());
        store.edit(|pattern| pattern.randomize(0.6, &mut seeded_source(seed)));
        store.edit_groove(|groove| {
            groove.set_swing_pct(swing);
            groove.set_humanize_ms(humanize);
        });
        let (dispatcher, sink) = recording_dispatcher();
        let (tx, _rx) = unbounded();
        let tempo = TempoHandle::new(bpm);
        let step = store.snapshot().resolution().step_duration(bpm);
        let mut session = SchedulerSession::start(
            store,
            dispatcher,
            tempo,
            Box::new(seeded_source(seed.wrapping_add(1))),
            SessionOptions::default(),
            tx,
        );
        for i in 0..48 {
            session.on_tick(0.05 + i as f64 * step);
        }

        let mut last: BTreeMap<u8, f64> = BTreeMap::new();
        for event in sink.triggered() {
            if let Some(previous) = last.insert(event.note.midi(), event.time) {
                prop_assert!(event.time > previous, "{} at {} after {}", event.note, event.time, previous);
            }
            prop_assert!(event.time >= 0.0);
        }
        session.stop();
    }
}
