use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::slots::SlotLabel;

pub const MIN_BLOCK_BARS: u32 = 1;
pub const MAX_BLOCK_BARS: u32 = 32;
pub const DEFAULT_BLOCK_BARS: u32 = 4;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

fn next_block_id() -> String {
    format!("block-{}", NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
}

fn sanitize_bars(bars: u32) -> u32 {
    bars.clamp(MIN_BLOCK_BARS, MAX_BLOCK_BARS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongBlock {
    pub id: String,
    pub slot: SlotLabel,
    pub bars: u32,
    pub name: String,
}

impl SongBlock {
    pub fn new(slot: SlotLabel, bars: u32, name: impl Into<String>) -> Self {
        Self {
            id: next_block_id(),
            slot,
            bars: sanitize_bars(bars),
            name: name.into(),
        }
    }
}

/// Ordered list of slot blocks played back to back in song mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongArrangement {
    blocks: Vec<SongBlock>,
}

impl SongArrangement {
    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn blocks(&self) -> &[SongBlock] {
        &self.blocks
    }

    pub fn add_block(&mut self, slot: SlotLabel, bars: u32) -> &SongBlock {
        let index = self.blocks.len();
        self.blocks.push(SongBlock::new(slot, bars, format!("Slot {slot}")));
        &self.blocks[index]
    }

    pub fn remove_block(&mut self, id: &str) -> Result<SongBlock, SequencerError> {
        let index = self.index_of(id)?;
        Ok(self.blocks.remove(index))
    }

    /// Move the block at `source` so it ends up at index `target`.
    /// Out-of-range indices leave the arrangement untouched.
    pub fn move_block(&mut self, source: usize, target: usize) {
        if source >= self.blocks.len() || target >= self.blocks.len() || source == target {
            return;
        }
        let block = self.blocks.remove(source);
        self.blocks.insert(target, block);
    }

    pub fn set_block_bars(&mut self, id: &str, bars: u32) -> Result<(), SequencerError> {
        let index = self.index_of(id)?;
        self.blocks[index].bars = sanitize_bars(bars);
        Ok(())
    }

    pub fn set_block_name(&mut self, id: &str, name: impl Into<String>) -> Result<(), SequencerError> {
        let index = self.index_of(id)?;
        self.blocks[index].name = name.into();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn total_bars(&self) -> u32 {
        self.blocks.iter().map(|block| block.bars).sum()
    }

    /// Block whose first bar is `bar`, counting from 0. The arrangement plays
    /// once; bars past `total_bars` start nothing.
    pub fn block_starting_at(&self, bar: u64) -> Option<&SongBlock> {
        let mut start = 0u64;
        for block in &self.blocks {
            if start == bar {
                return Some(block);
            }
            start += u64::from(block.bars);
            if start > bar {
                break;
            }
        }
        None
    }

    fn index_of(&self, id: &str) -> Result<usize, SequencerError> {
        self.blocks
            .iter()
            .position(|block| block.id == id)
            .ok_or_else(|| SequencerError::UnknownBlock(id.to_string()))
    }
}

impl Default for SongArrangement {
    fn default() -> Self {
        Self {
            blocks: vec![
                SongBlock::new(SlotLabel::A, 2, "Intro"),
                SongBlock::new(SlotLabel::B, 4, "Groove"),
                SongBlock::new(SlotLabel::C, 4, "Hook"),
            ],
        }
    }
}
