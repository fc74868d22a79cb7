use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::pattern::{clamp_gate, clamp_unit, round_ratchet, Pattern, StepCell, MAX_STEPS};
use crate::time::Subdivision;

/// Persisted form of a pattern: row-major per-step arrays.
///
/// `gate` and `ratchet` may be missing in older snapshots; missing values
/// load as defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(default)]
    pub name: String,
    pub steps: u32,
    pub grid: Vec<Vec<f32>>,
    pub probability: Vec<Vec<f32>>,
    #[serde(default)]
    pub gate: Vec<Vec<f32>>,
    #[serde(default)]
    pub ratchet: Vec<Vec<f32>>,
    #[serde(default)]
    pub resolution: Subdivision,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PatternRecord {
    pub fn from_json(text: &str) -> Result<Self, SequencerError> {
        let record: PatternRecord = serde_json::from_str(text)
            .map_err(|err| SequencerError::MalformedRecord(err.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String, SequencerError> {
        serde_json::to_string_pretty(self).map_err(|err| SequencerError::MalformedRecord(err.to_string()))
    }

    /// Strict shape check. Loading tolerates ragged data, but records written
    /// by this crate always pass.
    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        if self.steps > MAX_STEPS {
            return Err(SequencerError::MalformedRecord(format!(
                "{} steps exceeds the maximum of {MAX_STEPS}",
                self.steps
            )));
        }
        let rows = self.grid.len();
        let expected = self.steps as usize;
        let fields: [(&'static str, &Vec<Vec<f32>>, bool); 4] = [
            ("grid", &self.grid, true),
            ("probability", &self.probability, true),
            ("gate", &self.gate, false),
            ("ratchet", &self.ratchet, false),
        ];
        for (field, values, required) in fields {
            if values.is_empty() && !required {
                continue;
            }
            if values.len() != rows {
                return Err(SequencerError::MalformedRecord(format!(
                    "{field} has {} rows, grid has {rows}",
                    values.len()
                )));
            }
            if let Some((row, lane)) = values
                .iter()
                .enumerate()
                .find(|(_, lane)| lane.len() != expected)
            {
                return Err(SequencerError::InvalidPatternShape {
                    row,
                    field,
                    expected,
                    found: lane.len(),
                });
            }
        }
        Ok(())
    }

    fn value(values: &[Vec<f32>], row: usize, step: usize) -> Option<f32> {
        values.get(row)?.get(step).copied()
    }

    fn cell(&self, row: usize, step: usize) -> StepCell {
        let defaults = StepCell::default();
        StepCell {
            velocity: Self::value(&self.grid, row, step).map_or(defaults.velocity, clamp_unit),
            probability: Self::value(&self.probability, row, step)
                .map_or(defaults.probability, clamp_unit),
            gate: Self::value(&self.gate, row, step).map_or(defaults.gate, clamp_gate),
            ratchet: Self::value(&self.ratchet, row, step).map_or(defaults.ratchet, round_ratchet),
        }
    }
}

impl Pattern {
    pub fn to_record(&self, name: impl Into<String>) -> PatternRecord {
        let lanes = |f: fn(&StepCell) -> f32| -> Vec<Vec<f32>> {
            self.rows
                .iter()
                .map(|row| row.cells.iter().map(f).collect())
                .collect()
        };
        PatternRecord {
            name: name.into(),
            steps: self.steps,
            grid: lanes(|cell| cell.velocity),
            probability: lanes(|cell| cell.probability),
            gate: lanes(|cell| cell.gate),
            ratchet: lanes(|cell| f32::from(cell.ratchet)),
            resolution: self.resolution,
            tags: self.tags.clone(),
        }
    }

    /// Replace step count, resolution and cell data. Row settings stay; rows
    /// or steps missing from the record load as default cells and extra
    /// record data is dropped.
    pub fn load_record(&mut self, record: &PatternRecord) -> Result<(), SequencerError> {
        if record.steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        self.steps = record.steps.min(MAX_STEPS);
        self.resolution = record.resolution;
        self.tags = record.tags.clone();
        if !record.name.is_empty() {
            self.name = record.name.clone();
        }
        let steps = self.steps as usize;
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            row.cells = (0..steps).map(|step| record.cell(row_index, step)).collect();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pattern_survives_a_record_trip() {
        let mut pattern = Pattern::default();
        pattern.set_velocity(2, 5, 0.8).unwrap();
        pattern.set_ratchet(2, 5, 3.0).unwrap();
        pattern.set_gate(2, 5, 0.25).unwrap();
        pattern.set_resolution(Subdivision::Eighth);
        pattern.set_row_mute(1, true).unwrap();

        let json = pattern.to_record("verse").to_json().unwrap();
        let record = PatternRecord::from_json(&json).unwrap();
        assert_eq!(record.name, "verse");

        let mut loaded = Pattern::default();
        loaded.load_record(&record).unwrap();
        assert_eq!(loaded.cell(2, 5), pattern.cell(2, 5));
        assert_eq!(loaded.resolution(), Subdivision::Eighth);
        // Row settings are not part of a record.
        assert!(!loaded.row(1).unwrap().is_muted());
    }

    #[test]
    fn legacy_record_without_gate_or_ratchet_loads_defaults() {
        let json = r#"{
            "steps": 2,
            "grid": [[0.5, 0.0]],
            "probability": [[1.0, 1.0]],
            "resolution": "4n"
        }"#;
        let record = PatternRecord::from_json(json).unwrap();
        let mut pattern = Pattern::default();
        pattern.load_record(&record).unwrap();
        assert_eq!(pattern.steps(), 2);
        assert_eq!(
            pattern.cell(0, 0).unwrap(),
            StepCell {
                velocity: 0.5,
                ..StepCell::default()
            }
        );
        // Rows beyond the record are padded with defaults.
        assert_eq!(pattern.cell(15, 1).unwrap(), StepCell::default());
        assert!(pattern.validate_shape().is_ok());
    }

    #[test]
    fn validate_reports_ragged_rows() {
        let json = r#"{"steps": 3, "grid": [[1, 0, 0], [1, 0]], "probability": [[1, 1, 1], [1, 1, 1]]}"#;
        assert_eq!(
            PatternRecord::from_json(json),
            Err(SequencerError::InvalidPatternShape {
                row: 1,
                field: "grid",
                expected: 3,
                found: 2,
            })
        );
        assert!(matches!(
            PatternRecord::from_json("{\"steps\": 4"),
            Err(SequencerError::MalformedRecord(_))
        ));
        assert!(matches!(
            PatternRecord::from_json(r#"{"steps": 0, "grid": [], "probability": []}"#),
            Err(SequencerError::ZeroSteps)
        ));
    }

    #[test]
    fn loading_clamps_out_of_range_values() {
        let record = PatternRecord {
            name: String::new(),
            steps: 1,
            grid: vec![vec![4.0]],
            probability: vec![vec![-2.0]],
            gate: vec![vec![0.0]],
            ratchet: vec![vec![7.4]],
            resolution: Subdivision::Sixteenth,
            tags: vec![],
        };
        let mut pattern = Pattern::default();
        pattern.load_record(&record).unwrap();
        assert_eq!(
            pattern.cell(0, 0).unwrap(),
            StepCell {
                velocity: 1.0,
                probability: 0.0,
                gate: 0.1,
                ratchet: 4,
            }
        );
    }
}
