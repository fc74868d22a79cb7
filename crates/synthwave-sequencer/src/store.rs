use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::error::SequencerError;
use crate::groove::Groove;
use crate::pattern::Pattern;
use crate::slots::{plan_transition, SlotBank, SlotLabel, SlotTransition};
use crate::song::SongArrangement;

/// Shared editor state.
///
/// Readers take lock-free snapshots; every write clones the current value,
/// mutates the clone and publishes it, so the scheduler never observes a
/// half-applied edit. Writers are serialized by `writer`.
pub struct PatternStore {
    live: ArcSwap<Pattern>,
    groove: ArcSwap<Groove>,
    slots: ArcSwap<SlotBank>,
    song: ArcSwap<SongArrangement>,
    writer: Mutex<()>,
}

impl PatternStore {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            live: ArcSwap::from_pointee(pattern),
            groove: ArcSwap::from_pointee(Groove::default()),
            slots: ArcSwap::from_pointee(SlotBank::default()),
            song: ArcSwap::from_pointee(SongArrangement::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn with_groove(self, groove: Groove) -> Self {
        self.groove.store(Arc::new(groove));
        self
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<Pattern> {
        self.live.load_full()
    }

    pub fn edit<T>(&self, f: impl FnOnce(&mut Pattern) -> T) -> T {
        let _guard = self.writer.lock();
        let mut next = Pattern::clone(&self.live.load());
        let out = f(&mut next);
        self.live.store(Arc::new(next));
        out
    }

    pub fn replace(&self, pattern: Pattern) {
        let _guard = self.writer.lock();
        self.live.store(Arc::new(pattern));
    }

    #[inline]
    pub fn groove(&self) -> Groove {
        **self.groove.load()
    }

    pub fn edit_groove<T>(&self, f: impl FnOnce(&mut Groove) -> T) -> T {
        let _guard = self.writer.lock();
        let mut next = self.groove();
        let out = f(&mut next);
        self.groove.store(Arc::new(next));
        out
    }

    pub fn slots(&self) -> Arc<SlotBank> {
        self.slots.load_full()
    }

    pub fn edit_slots<T>(&self, f: impl FnOnce(&mut SlotBank) -> T) -> T {
        let _guard = self.writer.lock();
        let mut next = SlotBank::clone(&self.slots.load());
        let out = f(&mut next);
        self.slots.store(Arc::new(next));
        out
    }

    pub fn song(&self) -> Arc<SongArrangement> {
        self.song.load_full()
    }

    pub fn edit_song<T>(&self, f: impl FnOnce(&mut SongArrangement) -> T) -> T {
        let _guard = self.writer.lock();
        let mut next = SongArrangement::clone(&self.song.load());
        let out = f(&mut next);
        self.song.store(Arc::new(next));
        out
    }

    /// Snapshot the live pattern into the current slot.
    pub fn save_to_slot(&self, name: &str) -> SlotLabel {
        let _guard = self.writer.lock();
        let record = self.live.load().to_record(name);
        let mut bank = SlotBank::clone(&self.slots.load());
        let label = bank.current;
        bank.store(label, record);
        self.slots.store(Arc::new(bank));
        label
    }

    /// Point at `label` without touching the live pattern.
    pub fn set_slot(&self, label: SlotLabel) {
        self.edit_slots(|bank| bank.current = label);
    }

    pub fn toggle_slot_auto(&self, label: SlotLabel) {
        self.edit_slots(|bank| bank.toggle_auto(label));
    }

    pub fn set_slot_auto(&self, auto: [bool; 4]) {
        self.edit_slots(|bank| bank.set_auto_map(auto));
    }

    /// Point at `label` and load its snapshot. The pointer moves even when
    /// the slot is empty; the live pattern then stays as it was.
    pub fn load_slot(&self, label: SlotLabel) -> Result<(), SequencerError> {
        let _guard = self.writer.lock();
        let mut bank = SlotBank::clone(&self.slots.load());
        bank.current = label;
        let record = bank.pattern(label).cloned();
        self.slots.store(Arc::new(bank));
        let record = record.ok_or(SequencerError::MalformedSlotReference(label))?;
        self.load_record_locked(&record)
    }

    /// Run slot automation for one completed cycle.
    pub fn advance_slot_automation(&self) -> Option<SlotTransition> {
        let _guard = self.writer.lock();
        let mut bank = SlotBank::clone(&self.slots.load());
        let transition = plan_transition(&bank)?;
        bank.current = transition.to;
        self.slots.store(Arc::new(bank));
        match &transition.pattern {
            Some(record) => {
                if let Err(err) = self.load_record_locked(record) {
                    tracing::warn!(?err, slot = %transition.to, "slot snapshot rejected; keeping pattern");
                }
            }
            None => {
                tracing::debug!(slot = %transition.to, "automation moved to an empty slot");
            }
        }
        tracing::debug!(from = %transition.from, to = %transition.to, "slot automation advanced");
        Some(transition)
    }

    /// Switch to a song block's slot. Slots without a stored pattern are
    /// skipped and leave everything untouched.
    pub fn enter_song_block(&self, label: SlotLabel) -> bool {
        let _guard = self.writer.lock();
        let Some(record) = self.slots.load().pattern(label).cloned() else {
            return false;
        };
        if let Err(err) = self.load_record_locked(&record) {
            tracing::warn!(?err, slot = %label, "song block snapshot rejected");
            return false;
        }
        self.slots.rcu(|bank| {
            let mut next = SlotBank::clone(bank);
            next.current = label;
            next
        });
        true
    }

    fn load_record_locked(&self, record: &crate::record::PatternRecord) -> Result<(), SequencerError> {
        let mut next = Pattern::clone(&self.live.load());
        next.load_record(record)?;
        self.live.store(Arc::new(next));
        Ok(())
    }
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new(Pattern::default())
    }
}

impl std::fmt::Debug for PatternStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternStore")
            .field("steps", &self.live.load().steps())
            .field("current_slot", &self.slots.load().current)
            .finish()
    }
}
