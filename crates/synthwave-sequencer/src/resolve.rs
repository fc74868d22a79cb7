use crate::instrument::InstrumentKind;
use crate::pattern::{clamp_unit, Pattern, MAX_RATCHET};
use crate::pitch::PitchName;
use crate::random::RandomSource;
use crate::time::Seconds;

/// Shortest note ever handed to a sink.
pub const MIN_NOTE_SECONDS: Seconds = 0.03;

/// Everything about the current tick that is not pattern data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    pub step_index: u32,
    pub step_time: Seconds,
    pub bpm: f32,
    pub swing_pct: f32,
    pub humanize_ms: f32,
}

/// A note the dispatcher should send, with its routing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerIntent {
    pub row: usize,
    pub target: InstrumentKind,
    pub note: PitchName,
    pub time: Seconds,
    pub duration: Seconds,
    pub velocity: f32,
    pub pan: f32,
    pub delay_send: f32,
    pub reverb_send: f32,
    pub ratchet_index: u8,
}

/// Delay applied to odd steps: `swing_pct` percent of half a step.
#[inline]
pub fn swing_offset_seconds(step_index: u32, step_duration: Seconds, swing_pct: f32) -> Seconds {
    if step_index % 2 == 1 {
        step_duration * 0.5 * f64::from(swing_pct) / 100.0
    } else {
        0.0
    }
}

/// Compute the notes one step produces, in row order.
///
/// Draws one probability roll per active audible cell and, when humanize is
/// non-zero, one jitter sample per firing row.
pub fn resolve<R: RandomSource + ?Sized>(
    pattern: &Pattern,
    ctx: &StepContext,
    rng: &mut R,
) -> Vec<TriggerIntent> {
    debug_assert!(pattern.validate_shape().is_ok(), "resolve on malformed pattern");
    debug_assert!(ctx.step_index < pattern.steps(), "step index past pattern end");
    let steps = pattern.steps();
    if steps == 0 {
        return Vec::new();
    }
    let step = (ctx.step_index % steps) as usize;
    let step_duration = pattern.resolution().step_duration(ctx.bpm);
    let swing = swing_offset_seconds(ctx.step_index % steps, step_duration, ctx.swing_pct);
    let humanize_s = f64::from(ctx.humanize_ms.max(0.0)) / 1000.0;
    let any_solo = pattern.any_solo();

    let mut intents = Vec::new();
    for (index, row) in pattern.rows().iter().enumerate() {
        let audible = if any_solo { row.is_soloed() } else { !row.is_muted() };
        if !audible {
            continue;
        }
        // Missing cells on a malformed row are skipped in release builds.
        let Some(cell) = row.cell(step) else {
            continue;
        };
        if !cell.is_active() {
            continue;
        }
        let roll = rng.next_unit();
        if cell.probability <= 0.0 || roll > f64::from(cell.probability) {
            continue;
        }
        let jitter = if humanize_s > 0.0 {
            (rng.next_unit() * 2.0 - 1.0) * humanize_s
        } else {
            0.0
        };
        let start = (ctx.step_time + swing + jitter).max(0.0);
        let ratchet = cell.ratchet.clamp(1, MAX_RATCHET);
        let sub_step = step_duration / f64::from(ratchet);
        let duration = (sub_step * f64::from(cell.gate)).max(MIN_NOTE_SECONDS);
        let velocity = clamp_unit(cell.velocity * row.volume());
        let note = row.sounding_note();

        for ratchet_index in 0..ratchet {
            intents.push(TriggerIntent {
                row: index,
                target: row.target(),
                note,
                time: start + f64::from(ratchet_index) * sub_step,
                duration,
                velocity,
                pan: row.pan(),
                delay_send: row.delay_send(),
                reverb_send: row.reverb_send(),
                ratchet_index,
            });
        }
    }
    intents
}
