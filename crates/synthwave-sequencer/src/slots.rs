use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::record::PatternRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum SlotLabel {
    #[default]
    A,
    B,
    C,
    D,
}

impl SlotLabel {
    pub const ALL: [SlotLabel; 4] = [SlotLabel::A, SlotLabel::B, SlotLabel::C, SlotLabel::D];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotLabel::A => "A",
            SlotLabel::B => "B",
            SlotLabel::C => "C",
            SlotLabel::D => "D",
        }
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotLabel {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SequencerError::UnknownSlot(s.to_string()))
    }
}

/// Stored snapshots and automation flags for the four slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotBank {
    pub current: SlotLabel,
    patterns: [Option<PatternRecord>; 4],
    auto: [bool; 4],
}

impl SlotBank {
    pub fn pattern(&self, label: SlotLabel) -> Option<&PatternRecord> {
        self.patterns[label.index()].as_ref()
    }

    pub fn store(&mut self, label: SlotLabel, record: PatternRecord) {
        self.patterns[label.index()] = Some(record);
    }

    pub fn is_auto(&self, label: SlotLabel) -> bool {
        self.auto[label.index()]
    }

    pub fn set_auto(&mut self, label: SlotLabel, enabled: bool) {
        self.auto[label.index()] = enabled;
    }

    pub fn toggle_auto(&mut self, label: SlotLabel) {
        self.auto[label.index()] = !self.auto[label.index()];
    }

    pub fn set_auto_map(&mut self, auto: [bool; 4]) {
        self.auto = auto;
    }

    /// Auto-enabled labels in A..D order.
    pub fn auto_labels(&self) -> impl Iterator<Item = SlotLabel> + '_ {
        SlotLabel::ALL.into_iter().filter(|label| self.is_auto(*label))
    }
}

/// Decision taken at a pattern-cycle boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotTransition {
    pub from: SlotLabel,
    pub to: SlotLabel,
    /// Snapshot to load, `None` when the target slot is empty.
    pub pattern: Option<PatternRecord>,
}

/// Next slot under automation: the auto-enabled label after `current`,
/// wrapping, or the first auto-enabled label when `current` is not one.
pub fn next_auto_slot(bank: &SlotBank) -> Option<SlotLabel> {
    let enabled: Vec<SlotLabel> = bank.auto_labels().collect();
    if enabled.is_empty() {
        return None;
    }
    let next = match enabled.iter().position(|label| *label == bank.current) {
        Some(index) => enabled[(index + 1) % enabled.len()],
        None => enabled[0],
    };
    Some(next)
}

/// Evaluate automation for one wrap. Returns `None` when nothing is enabled.
pub fn plan_transition(bank: &SlotBank) -> Option<SlotTransition> {
    let to = next_auto_slot(bank)?;
    Some(SlotTransition {
        from: bank.current,
        to,
        pattern: bank.pattern(to).cloned(),
    })
}
