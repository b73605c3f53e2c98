use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::{Chunk, ChunkId, ChunkKey, ChunkSource, DrawSlot, SlotArray};
use crate::renderer::program::Program;
use crate::state::StateSlots;

/// `(slot, program, state)` → shared chunk.
///
/// Same ownership model as the program cache: render objects hold
/// `Rc<Chunk>`, the cache holds `Weak`, and a chunk is gone once the last
/// object using it is rebuilt or removed.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: FxHashMap<ChunkKey, Weak<Chunk>>,
    next_id: u32,
}

impl ChunkCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key of `source` at `slot` for `program`.
    pub(crate) fn key(slot: DrawSlot, program: &Program, source: &ChunkSource) -> ChunkKey {
        ChunkKey {
            slot,
            program: (!slot.is_program_independent()).then(|| program.id()),
            state: source.state_id(),
        }
    }

    pub(crate) fn get(&mut self, key: ChunkKey, source: ChunkSource) -> Rc<Chunk> {
        if let Some(chunk) = self.chunks.get(&key).and_then(Weak::upgrade) {
            return chunk;
        }
        self.next_id += 1;
        let chunk = Rc::new(Chunk::new(ChunkId(self.next_id), key, source));
        self.chunks.insert(key, Rc::downgrade(&chunk));
        chunk
    }

    /// Chunk array of a render object built from `slots` with `program`.
    ///
    /// Every slot is filled for visual snapshots; a missing geometry leaves
    /// the geometry and draw slots empty.
    pub(crate) fn chunks_for(
        &mut self,
        program: &Program,
        slots: &StateSlots,
    ) -> SlotArray<Option<Rc<Chunk>>> {
        let mut chunks = SlotArray::default();
        for slot in DrawSlot::ALL {
            if let Some(source) = ChunkSource::from_slots(slot, slots) {
                let key = Self::key(slot, program, &source);
                chunks[slot] = Some(self.get(key, source));
            }
        }
        chunks
    }

    /// Drops entries whose chunk has been released.
    pub fn prune(&mut self) {
        self.chunks.retain(|_, c| c.strong_count() > 0);
    }

    /// Number of live chunks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.chunks.values().filter(|c| c.strong_count() > 0).count()
    }

    /// Number of render objects sharing the chunk at `key`.
    #[must_use]
    pub fn use_count(&self, key: &ChunkKey) -> usize {
        self.chunks.get(key).map_or(0, Weak::strong_count)
    }
}
