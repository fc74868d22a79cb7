use std::fmt;
use std::sync::Arc;

use crate::error::SinkError;
use crate::instrument::{
    next_event_id, EventId, InstrumentKind, InstrumentRack, NoteEvent, NullRouting, RoutingLayer,
};
use crate::resolve::TriggerIntent;
use crate::time::Seconds;

/// A sub-hit that a sink accepted and may still cancel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub row: usize,
    pub target: InstrumentKind,
    pub time: Seconds,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    pub scheduled: Vec<ScheduledEvent>,
    pub failed: Vec<(usize, SinkError)>,
}

/// Executes trigger intents against the instrument rack.
#[derive(Clone)]
pub struct Dispatcher {
    instruments: InstrumentRack,
    routing: Arc<dyn RoutingLayer>,
}

impl Dispatcher {
    pub fn new(instruments: InstrumentRack, routing: Arc<dyn RoutingLayer>) -> Self {
        Self {
            instruments,
            routing,
        }
    }

    pub fn without_routing(instruments: InstrumentRack) -> Self {
        Self::new(instruments, Arc::new(NullRouting))
    }

    pub fn instruments(&self) -> &InstrumentRack {
        &self.instruments
    }

    /// Routing is written before every trigger. A failing sink drops the
    /// rest of that row's sub-hits for this step; other rows still play.
    pub fn dispatch(&self, intents: &[TriggerIntent]) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut failed_row = None;
        for intent in intents {
            if failed_row == Some(intent.row) {
                continue;
            }
            self.routing.set_pan(intent.target, intent.pan);
            self.routing.set_delay_send(intent.delay_send);
            self.routing.set_reverb_send(intent.reverb_send);

            let result = match self.instruments.get(intent.target) {
                Some(sink) => {
                    let event = NoteEvent {
                        id: next_event_id(),
                        note: intent.note,
                        duration: intent.duration,
                        time: intent.time,
                        velocity: intent.velocity,
                    };
                    sink.trigger(&event).map(|()| event.id)
                }
                None => Err(SinkError::Unavailable(intent.target)),
            };

            match result {
                Ok(id) => report.scheduled.push(ScheduledEvent {
                    id,
                    row: intent.row,
                    target: intent.target,
                    time: intent.time,
                }),
                Err(err) => {
                    tracing::warn!(?err, row = intent.row, target = %intent.target, "trigger skipped");
                    failed_row = Some(intent.row);
                    report.failed.push((intent.row, err));
                }
            }
        }
        report
    }

    pub fn cancel(&self, event: &ScheduledEvent) {
        if let Some(sink) = self.instruments.get(event.target) {
            sink.cancel(event.id);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("instruments", &self.instruments)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pitch::PitchName;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, entry: String) {
            self.calls.lock().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl RoutingLayer for Journal {
        fn set_pan(&self, instrument: InstrumentKind, value: f32) {
            self.push(format!("pan {instrument} {value}"));
        }

        fn set_delay_send(&self, level: f32) {
            self.push(format!("delay {level}"));
        }

        fn set_reverb_send(&self, level: f32) {
            self.push(format!("reverb {level}"));
        }
    }

    struct JournalSink {
        journal: Arc<Journal>,
        fail: bool,
    }

    impl crate::instrument::InstrumentSink for JournalSink {
        fn trigger(&self, event: &NoteEvent) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::rejected(InstrumentKind::FmSynth, "offline"));
            }
            self.journal.push(format!("trigger {}", event.note));
            Ok(())
        }

        fn cancel(&self, id: EventId) {
            self.journal.push(format!("cancel {id}"));
        }
    }

    fn intent(row: usize, target: InstrumentKind, ratchet_index: u8) -> TriggerIntent {
        TriggerIntent {
            row,
            target,
            note: PitchName::from_midi(60 + row as u8),
            time: 1.0 + f64::from(ratchet_index) * 0.01,
            duration: 0.1,
            velocity: 1.0,
            pan: -0.5,
            delay_send: 0.2,
            reverb_send: 0.3,
            ratchet_index,
        }
    }

    #[test]
    fn routing_is_applied_before_each_trigger() {
        let journal = Arc::new(Journal::default());
        let rack = InstrumentRack::new().with_sink(
            InstrumentKind::SubSynth,
            Arc::new(JournalSink {
                journal: journal.clone(),
                fail: false,
            }),
        );
        let dispatcher = Dispatcher::new(rack, journal.clone());
        let report = dispatcher.dispatch(&[intent(0, InstrumentKind::SubSynth, 0)]);
        assert_eq!(report.scheduled.len(), 1);
        assert_eq!(
            journal.entries(),
            vec!["pan subsynth -0.5", "delay 0.2", "reverb 0.3", "trigger C4"]
        );

        dispatcher.cancel(&report.scheduled[0]);
        assert_eq!(
            journal.entries().last().unwrap(),
            &format!("cancel {}", report.scheduled[0].id)
        );
    }

    #[test]
    fn failing_rows_are_skipped_without_blocking_others() {
        let journal = Arc::new(Journal::default());
        let rack = InstrumentRack::new()
            .with_sink(
                InstrumentKind::SubSynth,
                Arc::new(JournalSink {
                    journal: journal.clone(),
                    fail: false,
                }),
            )
            .with_sink(
                InstrumentKind::FmSynth,
                Arc::new(JournalSink {
                    journal: journal.clone(),
                    fail: true,
                }),
            );
        let dispatcher = Dispatcher::without_routing(rack);
        let report = dispatcher.dispatch(&[
            intent(0, InstrumentKind::FmSynth, 0),
            intent(0, InstrumentKind::FmSynth, 1),
            intent(1, InstrumentKind::BeatBox, 0),
            intent(2, InstrumentKind::SubSynth, 0),
        ]);
        assert_eq!(report.scheduled.len(), 1);
        assert_eq!(report.scheduled[0].row, 2);
        assert_eq!(
            report.failed,
            vec![
                (0, SinkError::rejected(InstrumentKind::FmSynth, "offline")),
                (1, SinkError::Unavailable(InstrumentKind::BeatBox)),
            ]
        );
    }
}
