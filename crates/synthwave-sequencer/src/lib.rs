//! Synthwave Sequencer
//! ===================
//! Step-sequencer scheduling engine for the Synthwave dashboard. A transport
//! callback drives a [`SchedulerSession`], which resolves each step of the
//! live [`Pattern`] into timed notes and hands them to instrument sinks,
//! while editors mutate the same pattern through a [`PatternStore`].

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod groove;
pub mod instrument;
pub mod pattern;
pub mod pitch;
pub mod random;
pub mod record;
pub mod resolve;
pub mod sequencer;
pub mod session;
pub mod slots;
pub mod song;
pub mod store;
pub mod time;
pub mod transport;

pub use clock::{ClockAdapter, ClockTick};
pub use config::SequencerConfig;
pub use dispatch::{DispatchReport, Dispatcher, ScheduledEvent};
pub use error::{SequencerError, SinkError};
pub use groove::{Groove, GrooveTemplate};
pub use instrument::{
    ChannelSink, EventId, InstrumentKind, InstrumentRack, InstrumentSink, NoteEvent, NullRouting,
    RoutingLayer, SinkCommand,
};
pub use pattern::{Pattern, QuickPresetLevel, QuickPresetMode, Row, StepCell};
pub use pitch::PitchName;
pub use random::RandomSource;
pub use record::PatternRecord;
pub use resolve::{resolve, StepContext, TriggerIntent};
pub use sequencer::Sequencer;
pub use session::{SchedulerSession, SessionOptions, TickReport, UiUpdate};
pub use slots::{SlotBank, SlotLabel, SlotTransition};
pub use song::{SongArrangement, SongBlock};
pub use store::PatternStore;
pub use time::{Seconds, Subdivision, TempoHandle, TimeSignature};
pub use transport::{ManualTransport, SubscriptionId, TickCallback, TransportClock};
