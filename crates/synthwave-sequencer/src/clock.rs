use crate::time::Seconds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    pub step: u32,
    pub time: Seconds,
    /// The step just returned was the last of the pattern; the next tick
    /// starts a new cycle.
    pub cycle_complete: bool,
}

/// Turns transport callbacks into step indices.
///
/// The transport's `step_time` is taken as the authoritative origin for the
/// step; nothing here reads a wall clock.
#[derive(Debug, Default, Clone)]
pub struct ClockAdapter {
    step_index: u32,
}

impl ClockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next tick will return.
    pub fn position(&self) -> u32 {
        self.step_index
    }

    pub fn on_tick(&mut self, step_time: Seconds, steps: u32) -> ClockTick {
        let steps = steps.max(1);
        // A pattern shortened mid-cycle folds the index back into range.
        let step = self.step_index % steps;
        let next = (step + 1) % steps;
        self.step_index = next;
        ClockTick {
            step,
            time: step_time,
            cycle_complete: next == 0,
        }
    }
}
