use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note identity of a sequencer row, e.g. `C4` or `F#3`.
///
/// Stored as a MIDI note number (`C4` = 60) and serialized as its name.
/// Flats are accepted when parsing but names are always rendered with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PitchName(u8);

impl PitchName {
    pub const MAX_MIDI: u8 = 127;

    pub const fn from_midi(note: u8) -> Self {
        if note > Self::MAX_MIDI {
            Self(Self::MAX_MIDI)
        } else {
            Self(note)
        }
    }

    #[inline]
    pub fn midi(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Shift by whole semitones, saturating at the MIDI range.
    pub fn transpose(self, semitones: i8) -> Self {
        let shifted = (self.0 as i16 + semitones as i16).clamp(0, Self::MAX_MIDI as i16);
        Self(shifted as u8)
    }

    pub fn frequency_hz(self) -> f32 {
        440.0 * 2.0_f32.powf((self.0 as f32 - 69.0) / 12.0)
    }
}

impl fmt::Display for PitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PITCH_CLASSES[(self.0 % 12) as usize], self.octave())
    }
}

impl FromStr for PitchName {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SequencerError::InvalidPitch(s.to_string());
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let base: i16 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let (accidental, octave_text) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };
        let octave: i16 = octave_text.parse().map_err(|_| invalid())?;
        let midi = (octave + 1) * 12 + base + accidental;
        if !(0..=Self::MAX_MIDI as i16).contains(&midi) {
            return Err(invalid());
        }
        Ok(Self(midi as u8))
    }
}

impl TryFrom<String> for PitchName {
    type Error = SequencerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PitchName> for String {
    fn from(pitch: PitchName) -> Self {
        pitch.to_string()
    }
}
