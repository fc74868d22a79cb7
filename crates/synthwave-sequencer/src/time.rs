use std::fmt;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

/// Absolute playback time or a duration, in seconds.
pub type Seconds = f64;

pub const DEFAULT_BPM: f32 = 120.0;
pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 300.0;

/// Grid resolution of a pattern: how long one step lasts relative to a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subdivision {
    #[serde(rename = "16n")]
    Sixteenth,
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "4n")]
    Quarter,
}

impl Subdivision {
    #[inline]
    pub fn steps_per_beat(self) -> u32 {
        match self {
            Subdivision::Sixteenth => 4,
            Subdivision::Eighth => 2,
            Subdivision::Quarter => 1,
        }
    }

    /// Length of one step counted in sixteenth notes.
    #[inline]
    pub fn sixteenths(self) -> u32 {
        4 / self.steps_per_beat()
    }

    /// `60 / bpm / steps_per_beat`.
    #[inline]
    pub fn step_duration(self, bpm: f32) -> Seconds {
        let bpm = f64::from(bpm.max(MIN_BPM));
        60.0 / bpm / f64::from(self.steps_per_beat())
    }

    pub fn label(self) -> &'static str {
        match self {
            Subdivision::Sixteenth => "16n",
            Subdivision::Eighth => "8n",
            Subdivision::Quarter => "4n",
        }
    }
}

impl Default for Subdivision {
    fn default() -> Self {
        Subdivision::Sixteenth
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Subdivision {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16n" => Ok(Subdivision::Sixteenth),
            "8n" => Ok(Subdivision::Eighth),
            "4n" => Ok(Subdivision::Quarter),
            other => Err(SequencerError::UnknownResolution(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.numerator.max(1) as u32
    }

    /// Bar length in sixteenth notes, with beats counted as quarter notes.
    pub fn sixteenths_per_bar(&self) -> u32 {
        self.beats_per_bar() * 4
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

/// Tempo shared between the transport (writer) and the scheduler (reader).
#[derive(Debug, Clone)]
pub struct TempoHandle(Arc<AtomicF32>);

impl TempoHandle {
    pub fn new(bpm: f32) -> Self {
        Self(Arc::new(AtomicF32::new(bpm.clamp(MIN_BPM, MAX_BPM))))
    }

    #[inline]
    pub fn bpm(&self) -> f32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set_bpm(&self, bpm: f32) {
        self.0.store(bpm.clamp(MIN_BPM, MAX_BPM), Ordering::Relaxed);
    }
}

impl Default for TempoHandle {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}
