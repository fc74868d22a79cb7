use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::error::{SequencerError, SinkError};
use crate::pitch::PitchName;
use crate::time::Seconds;

/// The closed set of instruments a sequencer row can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    SubSynth,
    PcmSynth,
    BeatBox,
    FmSynth,
    BassLine,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 5] = [
        InstrumentKind::SubSynth,
        InstrumentKind::PcmSynth,
        InstrumentKind::BeatBox,
        InstrumentKind::FmSynth,
        InstrumentKind::BassLine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::SubSynth => "subsynth",
            InstrumentKind::PcmSynth => "pcmsynth",
            InstrumentKind::BeatBox => "beatbox",
            InstrumentKind::FmSynth => "fmsynth",
            InstrumentKind::BassLine => "bassline",
        }
    }
}

impl Default for InstrumentKind {
    fn default() -> Self {
        InstrumentKind::SubSynth
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentKind {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrumentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SequencerError::UnknownInstrument(s.to_string()))
    }
}

pub type EventId = u64;

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id for a dispatched note, so ids from a stopped
/// session can never collide with ids from the next one.
pub fn next_event_id() -> EventId {
    NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single note handed to an instrument sink.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub id: EventId,
    pub note: PitchName,
    pub duration: Seconds,
    pub time: Seconds,
    pub velocity: f32,
}

/// Receives notes for one instrument. Calls must not block; the sink is
/// expected to honour `event.time` itself.
pub trait InstrumentSink: Send + Sync {
    fn trigger(&self, event: &NoteEvent) -> Result<(), SinkError>;

    /// Drop a previously triggered event that has not sounded yet.
    fn cancel(&self, _id: EventId) {}
}

/// Per-instrument routing parameters that sinks read at trigger time.
pub trait RoutingLayer: Send + Sync {
    fn set_pan(&self, instrument: InstrumentKind, value: f32);
    fn set_delay_send(&self, level: f32);
    fn set_reverb_send(&self, level: f32);
}

/// Routing layer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRouting;

impl RoutingLayer for NullRouting {
    fn set_pan(&self, _instrument: InstrumentKind, _value: f32) {}
    fn set_delay_send(&self, _level: f32) {}
    fn set_reverb_send(&self, _level: f32) {}
}

/// One sink per instrument kind. Kinds without a sink are reported as
/// unavailable when a row targets them.
#[derive(Clone, Default)]
pub struct InstrumentRack {
    sinks: BTreeMap<InstrumentKind, Arc<dyn InstrumentSink>>,
}

impl InstrumentRack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, kind: InstrumentKind, sink: Arc<dyn InstrumentSink>) -> Self {
        self.insert(kind, sink);
        self
    }

    pub fn insert(&mut self, kind: InstrumentKind, sink: Arc<dyn InstrumentSink>) {
        self.sinks.insert(kind, sink);
    }

    pub fn get(&self, kind: InstrumentKind) -> Option<&Arc<dyn InstrumentSink>> {
        self.sinks.get(&kind)
    }
}

impl fmt::Debug for InstrumentRack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentRack")
            .field("kinds", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCommand {
    Trigger(NoteEvent),
    Cancel(EventId),
}

/// Forwards notes to an audio thread over a bounded channel.
///
/// The audio side drains the receiver at the top of each block, the same way
/// the engine drains its command queue, so `trigger` never waits.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    kind: InstrumentKind,
    tx: Sender<SinkCommand>,
}

impl ChannelSink {
    pub fn new(kind: InstrumentKind, tx: Sender<SinkCommand>) -> Self {
        Self { kind, tx }
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }
}

impl InstrumentSink for ChannelSink {
    fn trigger(&self, event: &NoteEvent) -> Result<(), SinkError> {
        match self.tx.try_send(SinkCommand::Trigger(event.clone())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SinkError::rejected(self.kind, "command queue full")),
            Err(TrySendError::Disconnected(_)) => Err(SinkError::Unavailable(self.kind)),
        }
    }

    fn cancel(&self, id: EventId) {
        let _ = self.tx.try_send(SinkCommand::Cancel(id));
    }
}
