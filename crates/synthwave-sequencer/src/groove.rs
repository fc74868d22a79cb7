use serde::{Deserialize, Serialize};

pub const MAX_SWING_PCT: f32 = 80.0;
pub const MAX_HUMANIZE_MS: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GrooveTemplate {
    #[default]
    Straight,
    LightSwing,
    HeavySwing,
    Shuffle,
    Triplet,
    Custom,
}

impl GrooveTemplate {
    pub const ALL: [GrooveTemplate; 6] = [
        GrooveTemplate::Straight,
        GrooveTemplate::LightSwing,
        GrooveTemplate::HeavySwing,
        GrooveTemplate::Shuffle,
        GrooveTemplate::Triplet,
        GrooveTemplate::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GrooveTemplate::Straight => "Straight",
            GrooveTemplate::LightSwing => "Light Swing",
            GrooveTemplate::HeavySwing => "Heavy Swing",
            GrooveTemplate::Shuffle => "Shuffle",
            GrooveTemplate::Triplet => "Triplet",
            GrooveTemplate::Custom => "Custom",
        }
    }

    /// `(swing_pct, humanize_ms)`, or `None` for `Custom`.
    pub fn settings(self) -> Option<(f32, f32)> {
        match self {
            GrooveTemplate::Straight => Some((0.0, 0.0)),
            GrooveTemplate::LightSwing => Some((20.0, 5.0)),
            GrooveTemplate::HeavySwing => Some((55.0, 8.0)),
            GrooveTemplate::Shuffle => Some((65.0, 6.0)),
            GrooveTemplate::Triplet => Some((75.0, 10.0)),
            GrooveTemplate::Custom => None,
        }
    }
}

/// Swing and humanize amounts applied at resolve time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Groove {
    #[serde(default)]
    pub template: GrooveTemplate,
    #[serde(default)]
    swing_pct: f32,
    #[serde(default)]
    humanize_ms: f32,
}

impl Groove {
    pub fn from_template(template: GrooveTemplate) -> Self {
        let mut groove = Self::default();
        groove.apply_template(template);
        groove
    }

    pub fn swing_pct(&self) -> f32 {
        clamp_swing(self.swing_pct)
    }

    pub fn humanize_ms(&self) -> f32 {
        clamp_humanize(self.humanize_ms)
    }

    pub fn set_swing_pct(&mut self, swing_pct: f32) {
        self.swing_pct = clamp_swing(swing_pct);
        self.template = GrooveTemplate::Custom;
    }

    pub fn set_humanize_ms(&mut self, humanize_ms: f32) {
        self.humanize_ms = clamp_humanize(humanize_ms);
        self.template = GrooveTemplate::Custom;
    }

    /// Custom keeps the current amounts and only relabels.
    pub fn apply_template(&mut self, template: GrooveTemplate) {
        self.template = template;
        if let Some((swing, humanize)) = template.settings() {
            self.swing_pct = swing;
            self.humanize_ms = humanize;
        }
    }
}

impl Default for Groove {
    fn default() -> Self {
        Self {
            template: GrooveTemplate::Straight,
            swing_pct: 0.0,
            humanize_ms: 0.0,
        }
    }
}

fn clamp_swing(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_SWING_PCT)
    }
}

fn clamp_humanize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_HUMANIZE_MS)
    }
}
