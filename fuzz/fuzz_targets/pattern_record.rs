#![no_main]

use libfuzzer_sys::fuzz_target;
use synthwave_sequencer::random::seeded_source;
use synthwave_sequencer::{resolve, Pattern, PatternRecord, StepContext};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = PatternRecord::from_json(text) else {
        return;
    };
    let mut pattern = Pattern::default();
    if pattern.load_record(&record).is_err() {
        return;
    }
    assert!(pattern.validate_shape().is_ok());
    let mut rng = seeded_source(0);
    for step in 0..pattern.steps() {
        let ctx = StepContext {
            step_index: step,
            step_time: 0.0,
            bpm: 120.0,
            swing_pct: 80.0,
            humanize_ms: 40.0,
        };
        for intent in resolve(&pattern, &ctx, &mut rng) {
            assert!(intent.time >= 0.0);
            assert!((0.0..=1.0).contains(&intent.velocity));
        }
    }
});
