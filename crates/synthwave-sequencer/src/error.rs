use thiserror::Error;

use crate::instrument::InstrumentKind;
use crate::slots::SlotLabel;

/// Errors raised at the editor boundary or by the sequencer facade.
///
/// Nothing inside the tick path returns these; scheduling degrades instead
/// of failing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequencerError {
    #[error("pattern must have at least one step")]
    ZeroSteps,
    #[error("row {row} has {found} {field} cells, expected {expected}")]
    InvalidPatternShape {
        row: usize,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("row {0} is out of range")]
    RowOutOfRange(usize),
    #[error("cell ({row}, {step}) is out of range")]
    CellOutOfRange { row: usize, step: usize },
    #[error("invalid pitch name `{0}`")]
    InvalidPitch(String),
    #[error("unknown slot label `{0}`")]
    UnknownSlot(String),
    #[error("unknown instrument `{0}`")]
    UnknownInstrument(String),
    #[error("unknown resolution `{0}`")]
    UnknownResolution(String),
    #[error("slot {0} holds no pattern")]
    MalformedSlotReference(SlotLabel),
    #[error("malformed pattern record: {0}")]
    MalformedRecord(String),
    #[error("song block `{0}` not found")]
    UnknownBlock(String),
    #[error("sequencer is already playing")]
    AlreadyPlaying,
    #[error("sequencer is not playing")]
    NotPlaying,
}

/// Failure reported by an instrument sink for a single trigger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("{0} instrument is not available")]
    Unavailable(InstrumentKind),
    #[error("{kind} rejected event: {reason}")]
    Rejected {
        kind: InstrumentKind,
        reason: String,
    },
}

impl SinkError {
    pub fn rejected(kind: InstrumentKind, reason: impl Into<String>) -> Self {
        SinkError::Rejected {
            kind,
            reason: reason.into(),
        }
    }
}
