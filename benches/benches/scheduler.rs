use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use synthwave_sequencer::random::seeded_source;
use synthwave_sequencer::{
    resolve, Dispatcher, InstrumentKind, InstrumentRack, InstrumentSink, NoteEvent, Pattern,
    PatternStore, SchedulerSession, SessionOptions, SinkError, StepContext, TempoHandle,
};

struct DiscardSink;

impl InstrumentSink for DiscardSink {
    fn trigger(&self, event: &NoteEvent) -> Result<(), SinkError> {
        black_box(event);
        Ok(())
    }
}

fn busy_pattern() -> Pattern {
    let mut pattern = Pattern::new(64).expect("pattern");
    pattern.randomize(0.6, &mut seeded_source(17));
    pattern
}

fn resolve_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    group.measurement_time(Duration::from_secs(5));

    let pattern = busy_pattern();
    let mut rng = seeded_source(3);
    group.bench_function("16_rows_64_steps_swing_humanize", |b| {
        let mut step = 0u32;
        b.iter(|| {
            let ctx = StepContext {
                step_index: step,
                step_time: f64::from(step) * 0.125,
                bpm: 128.0,
                swing_pct: 55.0,
                humanize_ms: 8.0,
            };
            step = (step + 1) % 64;
            black_box(resolve(&pattern, &ctx, &mut rng));
        });
    });

    group.finish();
}

fn session_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("tick_dispatch_16_rows", |b| {
        let store = Arc::new(PatternStore::new(busy_pattern()));
        let rack = InstrumentRack::new().with_sink(InstrumentKind::SubSynth, Arc::new(DiscardSink));
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut session = SchedulerSession::start(
            store,
            Dispatcher::without_routing(rack),
            TempoHandle::new(128.0),
            Box::new(seeded_source(9)),
            SessionOptions::default(),
            tx,
        );
        let mut time = 0.0;
        b.iter(|| {
            black_box(session.on_tick(time));
            time += 0.117;
            while rx.try_recv().is_ok() {}
        });
    });

    group.finish();
}

criterion_group!(benches, resolve_step, session_tick);
criterion_main!(benches);
