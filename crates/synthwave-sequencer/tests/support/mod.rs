#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use synthwave_sequencer::{
    Dispatcher, EventId, InstrumentKind, InstrumentRack, InstrumentSink, NoteEvent, SinkError,
};

/// Sink that keeps every trigger and cancel it receives.
#[derive(Default)]
pub struct RecordingSink {
    triggered: Mutex<Vec<NoteEvent>>,
    cancelled: Mutex<Vec<EventId>>,
}

impl RecordingSink {
    pub fn triggered(&self) -> Vec<NoteEvent> {
        self.triggered.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<EventId> {
        self.cancelled.lock().clone()
    }
}

impl InstrumentSink for RecordingSink {
    fn trigger(&self, event: &NoteEvent) -> Result<(), SinkError> {
        self.triggered.lock().push(event.clone());
        Ok(())
    }

    fn cancel(&self, id: EventId) {
        self.cancelled.lock().push(id);
    }
}

/// Dispatcher with a recorder behind the default row target.
pub fn recording_dispatcher() -> (Dispatcher, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let rack = InstrumentRack::new().with_sink(InstrumentKind::SubSynth, sink.clone());
    (Dispatcher::without_routing(rack), sink)
}
