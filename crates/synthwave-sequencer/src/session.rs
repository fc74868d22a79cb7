use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};

use crate::clock::ClockAdapter;
use crate::dispatch::{Dispatcher, ScheduledEvent};
use crate::random::RandomSource;
use crate::resolve::{resolve, StepContext};
use crate::slots::SlotLabel;
use crate::store::PatternStore;
use crate::time::{Seconds, Subdivision, TempoHandle, TimeSignature};

/// Minimum gap enforced between two events on the same row.
pub const MIN_EVENT_SPACING: Seconds = 0.001;

/// Capacity of the UI outbox. Updates are dropped while it is full.
pub const UI_QUEUE_CAPACITY: usize = 256;

/// State changes the render side applies on its own schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiUpdate {
    StepPlayed { step: u32, time: Seconds },
    SlotChanged { slot: SlotLabel, time: Seconds },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionOptions {
    pub song_mode: bool,
    pub time_signature: TimeSignature,
    /// How far tick times run ahead of the transport playhead.
    pub lookahead: Seconds,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub step: u32,
    pub time: Seconds,
    pub scheduled: usize,
    pub failed: usize,
    pub slot_change: Option<SlotLabel>,
}

/// Runtime state of one playback run. Created on start, consumed by `stop`.
pub struct SchedulerSession {
    store: Arc<PatternStore>,
    dispatcher: Dispatcher,
    tempo: TempoHandle,
    rng: Box<dyn RandomSource + Send>,
    options: SessionOptions,
    subdivision: Subdivision,
    clock: ClockAdapter,
    watermarks: Vec<Option<Seconds>>,
    pending: Vec<ScheduledEvent>,
    ui: Sender<UiUpdate>,
    sixteenths_elapsed: u64,
    last_slot: SlotLabel,
}

impl SchedulerSession {
    pub fn start(
        store: Arc<PatternStore>,
        dispatcher: Dispatcher,
        tempo: TempoHandle,
        rng: Box<dyn RandomSource + Send>,
        options: SessionOptions,
        ui: Sender<UiUpdate>,
    ) -> Self {
        let subdivision = store.snapshot().resolution();
        let last_slot = store.slots().current;
        tracing::debug!(
            %subdivision,
            bpm = tempo.bpm(),
            song_mode = options.song_mode,
            "scheduler session started"
        );
        Self {
            store,
            dispatcher,
            tempo,
            rng,
            options,
            subdivision,
            clock: ClockAdapter::new(),
            watermarks: Vec::new(),
            pending: Vec::new(),
            ui,
            sixteenths_elapsed: 0,
            last_slot,
        }
    }

    /// Rate the transport should tick this session at.
    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    pub fn current_slot(&self) -> SlotLabel {
        self.last_slot
    }

    pub fn pending(&self) -> &[ScheduledEvent] {
        &self.pending
    }

    pub fn on_tick(&mut self, step_time: Seconds) -> TickReport {
        // Only events already behind the playhead have sounded.
        let playhead = step_time - self.options.lookahead;
        self.pending.retain(|event| event.time >= playhead);

        let mut slot_change = None;
        if self.options.song_mode {
            slot_change = self.enter_song_block_at_boundary(step_time);
        }

        let pattern = self.store.snapshot();
        let groove = self.store.groove();
        let tick = self.clock.on_tick(step_time, pattern.steps());
        let ctx = StepContext {
            step_index: tick.step,
            step_time,
            bpm: self.tempo.bpm(),
            swing_pct: groove.swing_pct(),
            humanize_ms: groove.humanize_ms(),
        };
        let mut intents = resolve(&pattern, &ctx, self.rng.as_mut());

        if self.watermarks.len() < pattern.row_count() {
            self.watermarks.resize(pattern.row_count(), None);
        }
        for intent in &mut intents {
            let mark = &mut self.watermarks[intent.row];
            if let Some(last) = *mark {
                if intent.time <= last {
                    intent.time = last + MIN_EVENT_SPACING;
                }
            }
            *mark = Some(intent.time);
        }

        let dispatched = self.dispatcher.dispatch(&intents);
        let report = TickReport {
            step: tick.step,
            time: step_time,
            scheduled: dispatched.scheduled.len(),
            failed: dispatched.failed.len(),
            slot_change,
        };
        self.pending.extend(dispatched.scheduled);
        self.publish(UiUpdate::StepPlayed {
            step: tick.step,
            time: step_time,
        });
        self.sixteenths_elapsed += u64::from(self.subdivision.sixteenths());

        if tick.cycle_complete && !self.options.song_mode {
            if let Some(transition) = self.store.advance_slot_automation() {
                if transition.to != self.last_slot {
                    self.publish(UiUpdate::SlotChanged {
                        slot: transition.to,
                        time: step_time,
                    });
                }
                self.last_slot = transition.to;
                return TickReport {
                    slot_change: Some(transition.to),
                    ..report
                };
            }
        }
        report
    }

    fn enter_song_block_at_boundary(&mut self, step_time: Seconds) -> Option<SlotLabel> {
        let per_bar = u64::from(self.options.time_signature.sixteenths_per_bar());
        if self.sixteenths_elapsed % per_bar != 0 {
            return None;
        }
        let bar = self.sixteenths_elapsed / per_bar;
        let slot = self.store.song().block_starting_at(bar)?.slot;
        if !self.store.enter_song_block(slot) {
            tracing::trace!(bar, %slot, "song block slot is empty");
            return None;
        }
        tracing::debug!(bar, %slot, "song block entered");
        self.last_slot = slot;
        self.publish(UiUpdate::SlotChanged {
            slot,
            time: step_time,
        });
        Some(slot)
    }

    fn publish(&self, update: UiUpdate) {
        match self.ui.try_send(update) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(update)) => {
                tracing::trace!(?update, "ui outbox full, update dropped");
            }
        }
    }

    /// Cancel everything still pending and end the run. Returns the number
    /// of events cancelled.
    pub fn stop(self) -> usize {
        for event in &self.pending {
            self.dispatcher.cancel(event);
        }
        let cancelled = self.pending.len();
        tracing::debug!(cancelled, "scheduler session stopped");
        cancelled
    }
}

impl std::fmt::Debug for SchedulerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerSession")
            .field("position", &self.clock.position())
            .field("pending", &self.pending.len())
            .field("last_slot", &self.last_slot)
            .finish_non_exhaustive()
    }
}
