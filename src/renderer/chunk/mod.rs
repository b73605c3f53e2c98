//! Draw Chunks
//!
//! A chunk is "apply one state object for one program": set some uniforms,
//! bind some buffers, or issue the draw call. Every render object owns one
//! chunk per [`DrawSlot`], and the executor walks the slots in declaration
//! order:
//!
//! ```text
//! Program → ModelTransform → ViewTransform → ProjTransform → Modes → Lights
//!         → Material → Clips → Viewport → Outline → Geometry → Draw
//! ```
//!
//! Chunks are shared through the [`ChunkCache`], keyed by `(slot, program,
//! state)`. Objects sorted by program/material/geometry therefore present the
//! same chunk ids back to back, and the executor skips a chunk whose id
//! matches the one last applied at that slot. The draw chunk is `unique` and
//! is never skipped.
//!
//! Each chunk reacts to the current [`ProgramStage`](super::program::ProgramStage); a chunk that has nothing
//! to do for a stage (e.g. material in the pick pass) returns immediately.

mod cache;
mod kinds;

pub use cache::ChunkCache;

use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use super::frame::FrameContext;
use super::program::{Program, ProgramId};
use crate::gpu::GpuDevice;
use crate::state::{
    ClipsState, GeometryState, LightsState, MaterialState, ModesState, OutlineState, StateId,
    StateSlots, TransformState, ViewportState,
};

// ─── DrawSlot ────────────────────────────────────────────────────────────────

/// Fixed application order of the chunks of one render object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawSlot {
    Program,
    ModelTransform,
    ViewTransform,
    ProjTransform,
    Modes,
    Lights,
    Material,
    Clips,
    Viewport,
    Outline,
    Geometry,
    Draw,
}

impl DrawSlot {
    pub const COUNT: usize = 12;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Program,
        Self::ModelTransform,
        Self::ViewTransform,
        Self::ProjTransform,
        Self::Modes,
        Self::Lights,
        Self::Material,
        Self::Clips,
        Self::Viewport,
        Self::Outline,
        Self::Geometry,
        Self::Draw,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Slots whose chunks do not depend on the program.
    #[inline]
    #[must_use]
    pub fn is_program_independent(self) -> bool {
        matches!(self, Self::Viewport)
    }
}

/// One value per [`DrawSlot`], indexed by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArray<T>([T; DrawSlot::COUNT]);

impl<T: Default> Default for SlotArray<T> {
    fn default() -> Self {
        Self(std::array::from_fn(|_| T::default()))
    }
}

impl<T> SlotArray<T> {
    pub fn iter(&self) -> impl Iterator<Item = (DrawSlot, &T)> {
        DrawSlot::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<DrawSlot> for SlotArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, slot: DrawSlot) -> &T {
        &self.0[slot.index()]
    }
}

impl<T> IndexMut<DrawSlot> for SlotArray<T> {
    #[inline]
    fn index_mut(&mut self, slot: DrawSlot) -> &mut T {
        &mut self.0[slot.index()]
    }
}

// ─── Chunk ───────────────────────────────────────────────────────────────────

/// Cache-local chunk identity, compared by the duplicate suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u32);

/// Chunk cache key.
///
/// The program chunk is keyed by program only, program-independent slots by
/// state only; everything else by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub slot: DrawSlot,
    pub program: Option<ProgramId>,
    pub state: Option<StateId>,
}

/// State object a chunk applies.
#[derive(Debug, Clone)]
pub(crate) enum ChunkSource {
    Program,
    ModelTransform(Rc<TransformState>),
    ViewTransform(Rc<TransformState>),
    ProjTransform(Rc<TransformState>),
    Modes(Rc<ModesState>),
    Lights(Rc<LightsState>),
    Material(Rc<MaterialState>),
    Clips(Rc<ClipsState>),
    Viewport(Rc<ViewportState>),
    Outline(Rc<OutlineState>),
    Geometry(Rc<GeometryState>),
    Draw(Rc<GeometryState>),
}

impl ChunkSource {
    /// Source for `slot`, or `None` for non-visual snapshots.
    pub(crate) fn from_slots(slot: DrawSlot, slots: &StateSlots) -> Option<Self> {
        Some(match slot {
            DrawSlot::Program => Self::Program,
            DrawSlot::ModelTransform => Self::ModelTransform(Rc::clone(&slots.model_transform)),
            DrawSlot::ViewTransform => Self::ViewTransform(Rc::clone(&slots.view_transform)),
            DrawSlot::ProjTransform => Self::ProjTransform(Rc::clone(&slots.proj_transform)),
            DrawSlot::Modes => Self::Modes(Rc::clone(&slots.modes)),
            DrawSlot::Lights => Self::Lights(Rc::clone(&slots.lights)),
            DrawSlot::Material => Self::Material(Rc::clone(&slots.material)),
            DrawSlot::Clips => Self::Clips(Rc::clone(&slots.clips)),
            DrawSlot::Viewport => Self::Viewport(Rc::clone(&slots.viewport)),
            DrawSlot::Outline => Self::Outline(Rc::clone(&slots.outline)),
            DrawSlot::Geometry => Self::Geometry(Rc::clone(slots.geometry.as_ref()?)),
            DrawSlot::Draw => Self::Draw(Rc::clone(slots.geometry.as_ref()?)),
        })
    }

    pub(crate) fn state_id(&self) -> Option<StateId> {
        match self {
            Self::Program => None,
            Self::ModelTransform(s) | Self::ViewTransform(s) | Self::ProjTransform(s) => {
                Some(s.id())
            }
            Self::Modes(s) => Some(s.id()),
            Self::Lights(s) => Some(s.id()),
            Self::Material(s) => Some(s.id()),
            Self::Clips(s) => Some(s.id()),
            Self::Viewport(s) => Some(s.id()),
            Self::Outline(s) => Some(s.id()),
            Self::Geometry(s) | Self::Draw(s) => Some(s.id()),
        }
    }
}

/// Reusable state application for one `(slot, program, state)`.
pub struct Chunk {
    id: ChunkId,
    key: ChunkKey,
    unique: bool,
    source: ChunkSource,
}

impl Chunk {
    pub(crate) fn new(id: ChunkId, key: ChunkKey, source: ChunkSource) -> Self {
        Self {
            id,
            key,
            unique: key.slot == DrawSlot::Draw,
            source,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ChunkKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn slot(&self) -> DrawSlot {
        self.key.slot
    }

    /// Unique chunks are invoked even when consecutively identical.
    #[inline]
    #[must_use]
    pub fn unique(&self) -> bool {
        self.unique
    }

    /// Runs this chunk's callback for the current stage of `frame`.
    pub(crate) fn invoke(
        &self,
        device: &mut dyn GpuDevice,
        frame: &mut FrameContext,
        program: &Program,
    ) {
        match &self.source {
            ChunkSource::Program => kinds::program::apply(program, device, frame),
            ChunkSource::ModelTransform(state) => kinds::transform::apply_model(state, device, frame),
            ChunkSource::ViewTransform(state) => kinds::transform::apply_view(state, device, frame),
            ChunkSource::ProjTransform(state) => kinds::transform::apply_proj(state, device, frame),
            ChunkSource::Modes(state) => kinds::modes::apply(state, device, frame),
            ChunkSource::Lights(state) => kinds::lights::apply(state, device, frame),
            ChunkSource::Material(state) => kinds::material::apply(state, device, frame),
            ChunkSource::Clips(state) => kinds::clips::apply(state, device, frame),
            ChunkSource::Viewport(state) => kinds::viewport::apply(state, device, frame),
            ChunkSource::Outline(state) => kinds::outline::apply(state, device, frame),
            ChunkSource::Geometry(state) => kinds::geometry::apply_buffers(state, device, frame),
            ChunkSource::Draw(state) => kinds::geometry::apply_draw(state, device, frame),
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("unique", &self.unique)
            .finish_non_exhaustive()
    }
}
