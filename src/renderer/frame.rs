//! Frame Context
//!
//! Transient state shared by every chunk callback during one pass. A fresh
//! pass segment starts with [`FrameContext::begin_pass`], which forgets the
//! last applied chunk per slot so nothing leaks from the previous segment
//! (different program variant, different target, different bucket).

use glam::{Mat4, UVec2, Vec4};
use rustc_hash::FxHashMap;

use super::chunk::{ChunkId, DrawSlot, SlotArray};
use super::object::ObjectId;
use super::pick::encode_pick_index;
use super::program::ProgramStage;
use crate::gpu::GpuTexture;
use crate::state::StateId;

/// Texture units below this are reserved for material maps.
pub(crate) const MATERIAL_TEXTURE_UNITS: u32 = 8;

/// Shadow map produced earlier in the frame, looked up by light state id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShadowMapBinding {
    pub texture: GpuTexture,
    /// `proj * view` of the light.
    pub matrix: Mat4,
    pub bias: f32,
}

#[derive(Debug)]
pub(crate) struct FrameContext {
    pub stage: ProgramStage,
    pub target_size: UVec2,

    pub max_lights: usize,
    pub max_clips: usize,

    /// Set while drawing the transparent bucket.
    pub transparent: bool,

    /// Replaces every view/projection slot (ray picks, shadow passes).
    pub view_override: Option<Mat4>,
    pub proj_override: Option<Mat4>,

    pub shadow_maps: FxHashMap<StateId, ShadowMapBinding>,

    /// Encoded colour of the object currently being picked.
    pub pick_color: Vec4,
    /// Decoded pick index `i` maps to `picked[i]`.
    pub picked: Vec<ObjectId>,

    last_applied: SlotArray<Option<ChunkId>>,
    pub chunks_invoked: u64,
    pub chunks_suppressed: u64,
}

impl FrameContext {
    pub fn new(target_size: UVec2, max_lights: usize, max_clips: usize) -> Self {
        Self {
            stage: ProgramStage::Draw,
            target_size,
            max_lights,
            max_clips,
            transparent: false,
            view_override: None,
            proj_override: None,
            shadow_maps: FxHashMap::default(),
            pick_color: Vec4::ZERO,
            picked: Vec::new(),
            last_applied: SlotArray::default(),
            chunks_invoked: 0,
            chunks_suppressed: 0,
        }
    }

    /// Starts a pass segment running the `stage` variant.
    pub fn begin_pass(&mut self, stage: ProgramStage) {
        self.stage = stage;
        self.transparent = false;
        self.last_applied = SlotArray::default();
    }

    /// Records `chunk` as applied at `slot`. Returns `false` if it already was.
    pub fn mark_applied(&mut self, slot: DrawSlot, chunk: ChunkId, unique: bool) -> bool {
        if !unique && self.last_applied[slot] == Some(chunk) {
            self.chunks_suppressed += 1;
            return false;
        }
        self.last_applied[slot] = Some(chunk);
        self.chunks_invoked += 1;
        true
    }

    /// Assigns the next pick index to `object` and makes it current.
    pub fn next_pick(&mut self, object: ObjectId) {
        self.picked.push(object);
        self.pick_color = encode_pick_index(self.picked.len() as u32 - 1);
    }

    /// Object for a decoded pick index.
    pub fn picked_object(&self, index: u32) -> Option<ObjectId> {
        self.picked.get(index as usize).copied()
    }
}
