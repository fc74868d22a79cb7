use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::instrument::InstrumentKind;
use crate::pitch::PitchName;
use crate::random::RandomSource;
use crate::time::Subdivision;

pub const DEFAULT_STEPS: u32 = 16;
pub const MAX_STEPS: u32 = 64;
pub const MIN_GATE: f32 = 0.1;
pub const MAX_RATCHET: u8 = 4;
pub const MAX_TRANSPOSE: i8 = 24;
pub const DEFAULT_TOGGLE_VELOCITY: f32 = 0.7;
pub const DEFAULT_SEND_LEVEL: f32 = 0.2;
pub const DEFAULT_RANDOM_DENSITY: f32 = 0.25;

/// Row pitches of the default 16-lane grid, top to bottom (C5 down to B2).
pub const DEFAULT_ROW_NOTES: [PitchName; 16] = [
    PitchName::from_midi(72),
    PitchName::from_midi(71),
    PitchName::from_midi(69),
    PitchName::from_midi(67),
    PitchName::from_midi(65),
    PitchName::from_midi(64),
    PitchName::from_midi(62),
    PitchName::from_midi(60),
    PitchName::from_midi(59),
    PitchName::from_midi(57),
    PitchName::from_midi(55),
    PitchName::from_midi(53),
    PitchName::from_midi(52),
    PitchName::from_midi(50),
    PitchName::from_midi(48),
    PitchName::from_midi(47),
];

/// Musical data of one row at one step.
///
/// `probability`, `gate` and `ratchet` only matter while `velocity > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepCell {
    pub velocity: f32,
    pub probability: f32,
    pub gate: f32,
    pub ratchet: u8,
}

impl StepCell {
    pub fn with_velocity(velocity: f32) -> Self {
        Self {
            velocity: clamp_unit(velocity),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.velocity > 0.0
    }

    /// Force every field into its documented range.
    pub fn clamped(self) -> Self {
        Self {
            velocity: clamp_unit(self.velocity),
            probability: clamp_unit(self.probability),
            gate: clamp_gate(self.gate),
            ratchet: self.ratchet.clamp(1, MAX_RATCHET),
        }
    }
}

impl Default for StepCell {
    fn default() -> Self {
        Self {
            velocity: 0.0,
            probability: 1.0,
            gate: 1.0,
            ratchet: 1,
        }
    }
}

/// One lane of the grid: a pitch, its instrument and its mixer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) note: PitchName,
    pub(crate) target: InstrumentKind,
    pub(crate) mute: bool,
    pub(crate) solo: bool,
    pub(crate) volume: f32,
    pub(crate) pan: f32,
    pub(crate) transpose_semitones: i8,
    pub(crate) delay_send: f32,
    pub(crate) reverb_send: f32,
    pub(crate) cells: Vec<StepCell>,
}

impl Row {
    pub fn new(note: PitchName, steps: u32) -> Self {
        Self {
            note,
            target: InstrumentKind::default(),
            mute: false,
            solo: false,
            volume: 1.0,
            pan: 0.0,
            transpose_semitones: 0,
            delay_send: DEFAULT_SEND_LEVEL,
            reverb_send: DEFAULT_SEND_LEVEL,
            cells: vec![StepCell::default(); steps as usize],
        }
    }

    pub fn note(&self) -> PitchName {
        self.note
    }

    pub fn target(&self) -> InstrumentKind {
        self.target
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn is_soloed(&self) -> bool {
        self.solo
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn transpose_semitones(&self) -> i8 {
        self.transpose_semitones
    }

    pub fn delay_send(&self) -> f32 {
        self.delay_send
    }

    pub fn reverb_send(&self) -> f32 {
        self.reverb_send
    }

    /// Pitch actually sent to the instrument.
    pub fn sounding_note(&self) -> PitchName {
        self.note.transpose(self.transpose_semitones)
    }

    pub fn cells(&self) -> &[StepCell] {
        &self.cells
    }

    pub fn cell(&self, step: usize) -> Option<&StepCell> {
        self.cells.get(step)
    }

    fn resize(&mut self, steps: u32) {
        self.cells.resize(steps as usize, StepCell::default());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickPresetMode {
    Velocity,
    Probability,
    Gate,
    Ratchet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickPresetLevel {
    Low,
    Med,
    High,
}

impl QuickPresetLevel {
    pub fn value(self) -> f32 {
        match self {
            QuickPresetLevel::Low => 0.4,
            QuickPresetLevel::Med => 0.7,
            QuickPresetLevel::High => 1.0,
        }
    }

    pub fn ratchet(self) -> u8 {
        match self {
            QuickPresetLevel::Low => 1,
            QuickPresetLevel::Med => 2,
            QuickPresetLevel::High => 4,
        }
    }
}

/// The live grid. Every row holds exactly `steps` cells; all mutators keep
/// that invariant and clamp their inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub tags: Vec<String>,
    pub(crate) resolution: Subdivision,
    pub(crate) steps: u32,
    pub(crate) rows: Vec<Row>,
}

impl Pattern {
    pub fn new(steps: u32) -> Result<Self, SequencerError> {
        Self::with_notes(steps, &DEFAULT_ROW_NOTES)
    }

    pub fn with_notes(steps: u32, notes: &[PitchName]) -> Result<Self, SequencerError> {
        if steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        let steps = steps.min(MAX_STEPS);
        Ok(Self {
            name: String::new(),
            tags: Vec::new(),
            resolution: Subdivision::default(),
            steps,
            rows: notes.iter().map(|note| Row::new(*note, steps)).collect(),
        })
    }

    #[inline]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    #[inline]
    pub fn resolution(&self) -> Subdivision {
        self.resolution
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, step: usize) -> Option<StepCell> {
        self.rows.get(row)?.cells.get(step).copied()
    }

    pub fn any_solo(&self) -> bool {
        self.rows.iter().any(|row| row.solo)
    }

    /// With any solo engaged only soloed rows play, muted or not; otherwise
    /// every unmuted row plays.
    pub fn is_row_audible(&self, index: usize) -> bool {
        let Some(row) = self.rows.get(index) else {
            return false;
        };
        if self.any_solo() {
            row.solo
        } else {
            !row.mute
        }
    }

    pub fn validate_shape(&self) -> Result<(), SequencerError> {
        if self.steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        for (index, row) in self.rows.iter().enumerate() {
            if row.cells.len() != self.steps as usize {
                return Err(SequencerError::InvalidPatternShape {
                    row: index,
                    field: "step",
                    expected: self.steps as usize,
                    found: row.cells.len(),
                });
            }
        }
        Ok(())
    }

    /// Resize every row, keeping cells `0..min(old, new)` and filling the rest
    /// with defaults.
    pub fn set_steps(&mut self, steps: u32) -> Result<(), SequencerError> {
        if steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        self.steps = steps.min(MAX_STEPS);
        for row in &mut self.rows {
            row.resize(self.steps);
        }
        Ok(())
    }

    pub fn set_resolution(&mut self, resolution: Subdivision) {
        self.resolution = resolution;
    }

    pub fn toggle_cell(&mut self, row: usize, step: usize) -> Result<(), SequencerError> {
        self.toggle_cell_with(row, step, DEFAULT_TOGGLE_VELOCITY)
    }

    pub fn toggle_cell_with(
        &mut self,
        row: usize,
        step: usize,
        velocity: f32,
    ) -> Result<(), SequencerError> {
        let cell = self.cell_mut(row, step)?;
        cell.velocity = if cell.is_active() {
            0.0
        } else {
            clamp_unit(velocity)
        };
        Ok(())
    }

    pub fn set_velocity(&mut self, row: usize, step: usize, velocity: f32) -> Result<(), SequencerError> {
        self.cell_mut(row, step)?.velocity = clamp_unit(velocity);
        Ok(())
    }

    pub fn set_probability(
        &mut self,
        row: usize,
        step: usize,
        probability: f32,
    ) -> Result<(), SequencerError> {
        self.cell_mut(row, step)?.probability = clamp_unit(probability);
        Ok(())
    }

    pub fn set_gate(&mut self, row: usize, step: usize, gate: f32) -> Result<(), SequencerError> {
        self.cell_mut(row, step)?.gate = clamp_gate(gate);
        Ok(())
    }

    /// Rounds to the nearest whole re-trigger count in `1..=4`.
    pub fn set_ratchet(&mut self, row: usize, step: usize, ratchet: f32) -> Result<(), SequencerError> {
        self.cell_mut(row, step)?.ratchet = round_ratchet(ratchet);
        Ok(())
    }

    pub fn toggle_row_mute(&mut self, row: usize) -> Result<(), SequencerError> {
        let row = self.row_mut(row)?;
        row.mute = !row.mute;
        Ok(())
    }

    pub fn toggle_row_solo(&mut self, row: usize) -> Result<(), SequencerError> {
        let row = self.row_mut(row)?;
        row.solo = !row.solo;
        Ok(())
    }

    pub fn set_row_mute(&mut self, row: usize, mute: bool) -> Result<(), SequencerError> {
        self.row_mut(row)?.mute = mute;
        Ok(())
    }

    pub fn set_row_solo(&mut self, row: usize, solo: bool) -> Result<(), SequencerError> {
        self.row_mut(row)?.solo = solo;
        Ok(())
    }

    pub fn set_row_volume(&mut self, row: usize, volume: f32) -> Result<(), SequencerError> {
        self.row_mut(row)?.volume = clamp_unit(volume);
        Ok(())
    }

    pub fn set_row_pan(&mut self, row: usize, pan: f32) -> Result<(), SequencerError> {
        self.row_mut(row)?.pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
        Ok(())
    }

    pub fn set_row_transpose(&mut self, row: usize, semitones: i32) -> Result<(), SequencerError> {
        let limit = MAX_TRANSPOSE as i32;
        self.row_mut(row)?.transpose_semitones = semitones.clamp(-limit, limit) as i8;
        Ok(())
    }

    pub fn set_row_delay_send(&mut self, row: usize, level: f32) -> Result<(), SequencerError> {
        self.row_mut(row)?.delay_send = clamp_unit(level);
        Ok(())
    }

    pub fn set_row_reverb_send(&mut self, row: usize, level: f32) -> Result<(), SequencerError> {
        self.row_mut(row)?.reverb_send = clamp_unit(level);
        Ok(())
    }

    pub fn set_row_target(&mut self, row: usize, target: InstrumentKind) -> Result<(), SequencerError> {
        self.row_mut(row)?.target = target;
        Ok(())
    }

    pub fn set_row_note(&mut self, row: usize, note: PitchName) -> Result<(), SequencerError> {
        self.row_mut(row)?.note = note;
        Ok(())
    }

    /// Reset every cell; row settings are untouched.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.cells.fill(StepCell::default());
        }
    }

    /// Scatter hits over the grid. Each cell becomes active with chance
    /// `density` and gets a random probability, gate and ratchet.
    pub fn randomize<R: RandomSource + ?Sized>(&mut self, density: f32, rng: &mut R) {
        let density = f64::from(clamp_unit(density));
        for row in &mut self.rows {
            for cell in &mut row.cells {
                let velocity = if rng.next_unit() < density {
                    0.4 + rng.next_unit() * 0.6
                } else {
                    0.0
                };
                let probability = rng.next_unit() * 0.8 + 0.2;
                let gate = 0.3 + rng.next_unit() * 0.7;
                let ratchet = (rng.next_unit() * MAX_RATCHET as f64).ceil();
                *cell = StepCell {
                    velocity: velocity as f32,
                    probability: probability as f32,
                    gate: gate as f32,
                    ratchet: ratchet as u8,
                }
                .clamped();
            }
        }
    }

    /// Rewrite one parameter on every active cell.
    pub fn apply_quick_preset(&mut self, mode: QuickPresetMode, level: QuickPresetLevel) {
        let value = level.value();
        for cell in self.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
            if !cell.is_active() {
                continue;
            }
            match mode {
                QuickPresetMode::Velocity => cell.velocity = value,
                QuickPresetMode::Probability => cell.probability = value,
                QuickPresetMode::Gate => cell.gate = clamp_gate(value),
                QuickPresetMode::Ratchet => cell.ratchet = level.ratchet(),
            }
        }
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut Row, SequencerError> {
        self.rows
            .get_mut(row)
            .ok_or(SequencerError::RowOutOfRange(row))
    }

    fn cell_mut(&mut self, row: usize, step: usize) -> Result<&mut StepCell, SequencerError> {
        self.rows
            .get_mut(row)
            .and_then(|lane| lane.cells.get_mut(step))
            .ok_or(SequencerError::CellOutOfRange { row, step })
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            name: String::new(),
            tags: Vec::new(),
            resolution: Subdivision::default(),
            steps: DEFAULT_STEPS,
            rows: DEFAULT_ROW_NOTES
                .iter()
                .map(|note| Row::new(*note, DEFAULT_STEPS))
                .collect(),
        }
    }
}

#[inline]
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[inline]
pub(crate) fn clamp_gate(value: f32) -> f32 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(MIN_GATE, 1.0)
    }
}

#[inline]
pub(crate) fn round_ratchet(value: f32) -> u8 {
    if value.is_nan() {
        return 1;
    }
    value.round().clamp(1.0, MAX_RATCHET as f32) as u8
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::mock::StepRng;

    use super::*;
    use crate::random::seeded_source;

    #[test]
    fn default_grid_matches_lane_layout() {
        let pattern = Pattern::default();
        assert_eq!(pattern.steps(), 16);
        assert_eq!(pattern.row_count(), 16);
        assert_eq!(pattern.row(0).unwrap().note().to_string(), "C5");
        assert_eq!(pattern.row(15).unwrap().note().to_string(), "B2");
        assert_eq!(pattern.resolution(), Subdivision::Sixteenth);
        assert!(pattern.validate_shape().is_ok());
        let row = pattern.row(3).unwrap();
        assert_eq!(row.delay_send(), 0.2);
        assert_eq!(row.reverb_send(), 0.2);
        assert_eq!(row.volume(), 1.0);
        assert_eq!(row.target(), InstrumentKind::SubSynth);
    }

    #[test]
    fn resize_preserves_existing_cells() {
        let mut pattern = Pattern::default();
        pattern.set_velocity(0, 0, 0.7).unwrap();
        pattern.set_gate(0, 15, 0.5).unwrap();
        pattern.set_steps(32).unwrap();
        assert!(pattern.validate_shape().is_ok());
        assert_eq!(pattern.cell(0, 0).unwrap().velocity, 0.7);
        assert_eq!(pattern.cell(0, 15).unwrap().gate, 0.5);
        for step in 16..32 {
            assert_eq!(pattern.cell(0, step).unwrap(), StepCell::default());
        }

        pattern.set_steps(8).unwrap();
        assert_eq!(pattern.row(0).unwrap().cells().len(), 8);
        assert_eq!(pattern.cell(0, 0).unwrap().velocity, 0.7);
        assert_eq!(pattern.set_steps(0), Err(SequencerError::ZeroSteps));
        assert_eq!(pattern.steps(), 8);
    }

    #[test]
    fn editors_clamp_inputs() {
        let mut pattern = Pattern::default();
        pattern.set_velocity(1, 1, 3.0).unwrap();
        pattern.set_probability(1, 1, -1.0).unwrap();
        pattern.set_gate(1, 1, 0.0).unwrap();
        pattern.set_ratchet(1, 1, 2.6).unwrap();
        let cell = pattern.cell(1, 1).unwrap();
        assert_eq!(cell.velocity, 1.0);
        assert_eq!(cell.probability, 0.0);
        assert_eq!(cell.gate, MIN_GATE);
        assert_eq!(cell.ratchet, 3);

        pattern.set_ratchet(1, 1, 9.0).unwrap();
        assert_eq!(pattern.cell(1, 1).unwrap().ratchet, 4);
        pattern.set_row_pan(2, -4.0).unwrap();
        pattern.set_row_transpose(2, 100).unwrap();
        assert_eq!(pattern.row(2).unwrap().pan(), -1.0);
        assert_eq!(pattern.row(2).unwrap().transpose_semitones(), MAX_TRANSPOSE);
        assert_eq!(
            pattern.set_velocity(99, 0, 1.0),
            Err(SequencerError::CellOutOfRange { row: 99, step: 0 })
        );
    }

    #[test]
    fn toggle_uses_default_velocity() {
        let mut pattern = Pattern::default();
        pattern.toggle_cell(4, 2).unwrap();
        assert_eq!(pattern.cell(4, 2).unwrap().velocity, DEFAULT_TOGGLE_VELOCITY);
        pattern.toggle_cell(4, 2).unwrap();
        assert_eq!(pattern.cell(4, 2).unwrap().velocity, 0.0);
    }

    #[test]
    fn solo_overrides_mute() {
        let mut pattern = Pattern::default();
        pattern.set_row_mute(0, true).unwrap();
        assert!(!pattern.is_row_audible(0));
        assert!(pattern.is_row_audible(1));

        pattern.set_row_solo(0, true).unwrap();
        assert!(pattern.is_row_audible(0));
        assert!(!pattern.is_row_audible(1));
    }

    #[test]
    fn quick_presets_touch_active_cells_only() {
        let mut pattern = Pattern::default();
        pattern.set_velocity(0, 0, 0.9).unwrap();
        pattern.apply_quick_preset(QuickPresetMode::Probability, QuickPresetLevel::Low);
        pattern.apply_quick_preset(QuickPresetMode::Ratchet, QuickPresetLevel::High);
        pattern.apply_quick_preset(QuickPresetMode::Velocity, QuickPresetLevel::Med);
        assert_eq!(
            pattern.cell(0, 0).unwrap(),
            StepCell {
                velocity: 0.7,
                probability: 0.4,
                gate: 1.0,
                ratchet: 4,
            }
        );
        assert_eq!(pattern.cell(0, 1).unwrap(), StepCell::default());
    }

    #[test]
    fn randomize_stays_in_range_and_clear_resets() {
        let mut pattern = Pattern::default();
        pattern.randomize(0.5, &mut seeded_source(11));
        let cells: Vec<StepCell> = pattern
            .rows()
            .iter()
            .flat_map(|row| row.cells().iter().copied())
            .collect();
        assert!(cells.iter().any(StepCell::is_active));
        for cell in &cells {
            assert_eq!(*cell, cell.clamped());
            if cell.is_active() {
                assert!(cell.velocity >= 0.4);
            }
        }

        pattern.clear();
        assert!(pattern
            .rows()
            .iter()
            .all(|row| row.cells().iter().all(|cell| *cell == StepCell::default())));
    }

    #[test]
    fn randomize_with_zero_density_leaves_grid_silent() {
        let mut pattern = Pattern::default();
        // StepRng(0, 0) always yields 0.0, which never falls below a density of 0.
        pattern.randomize(0.0, &mut StepRng::new(0, 0));
        assert!(pattern
            .rows()
            .iter()
            .all(|row| row.cells().iter().all(|cell| !cell.is_active() && cell.ratchet == 1)));
    }
}
