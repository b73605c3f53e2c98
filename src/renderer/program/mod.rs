//! Programs
//!
//! A [`Program`] is the set of GPU program variants compiled for one composed
//! state hash. Render objects share programs through `Rc<Program>`; the
//! [`ProgramCache`] only keeps `Weak` references, so a program is evicted the
//! moment the last render object using it lets go.
//!
//! | Variant                       | Used by                                  |
//! |-------------------------------|------------------------------------------|
//! | [`ProgramStage::Draw`]        | main pass, render-target pre-pass        |
//! | [`ProgramStage::Outline`]     | outline sub-pass of outlined objects     |
//! | [`ProgramStage::PickObject`]  | object-level pick pass                   |
//! | [`ProgramStage::PickPrimitive`] | triangle-level pick pass               |
//! | [`ProgramStage::Shadow`]      | shadow-map pass                          |
//!
//! Device handles of dropped programs are parked in a graveyard and deleted by
//! [`ProgramCache::collect_garbage`], because `Drop` has no device access.

mod cache;
mod shader_gen;

pub use cache::ProgramCache;
pub use shader_gen::{ShaderSynthesizer, TemplateSynthesizer};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::gpu::GpuProgram;

/// Which program variant a pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    Draw,
    Outline,
    PickObject,
    PickPrimitive,
    Shadow,
}

impl ProgramStage {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Draw,
        Self::Outline,
        Self::PickObject,
        Self::PickPrimitive,
        Self::Shadow,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Base name of the template pair (`{name}.vert` / `{name}.frag`).
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::Outline => "outline",
            Self::PickObject => "pick_object",
            Self::PickPrimitive => "pick_primitive",
            Self::Shadow => "shadow",
        }
    }

    #[must_use]
    pub fn is_pick(self) -> bool {
        matches!(self, Self::PickObject | Self::PickPrimitive)
    }
}

impl fmt::Display for ProgramStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

/// Vertex + fragment source of one variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageSources {
    pub vertex: String,
    pub fragment: String,
}

/// Sources of every variant, indexed by [`ProgramStage::index`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramSources {
    pub stages: [StageSources; ProgramStage::COUNT],
}

impl ProgramSources {
    #[inline]
    #[must_use]
    pub fn stage(&self, stage: ProgramStage) -> &StageSources {
        &self.stages[stage.index()]
    }
}

/// Cache-local identity of a program; also the program term of sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

impl ProgramId {
    #[inline]
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

pub(crate) type Graveyard = Rc<RefCell<Vec<GpuProgram>>>;

/// Compiled variants for one state hash.
pub struct Program {
    id: ProgramId,
    hash: String,
    sources: ProgramSources,
    handles: Cell<[GpuProgram; ProgramStage::COUNT]>,
    graveyard: Graveyard,
}

impl Program {
    pub(crate) fn new(
        id: ProgramId,
        hash: String,
        sources: ProgramSources,
        handles: [GpuProgram; ProgramStage::COUNT],
        graveyard: Graveyard,
    ) -> Self {
        Self {
            id,
            hash,
            sources,
            handles: Cell::new(handles),
            graveyard,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn handle(&self, stage: ProgramStage) -> GpuProgram {
        self.handles.get()[stage.index()]
    }

    #[must_use]
    pub fn sources(&self) -> &ProgramSources {
        &self.sources
    }

    pub(crate) fn replace_handles(&self, handles: [GpuProgram; ProgramStage::COUNT]) {
        self.handles.set(handles);
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("hash", &self.hash)
            .field("handles", &self.handles.get())
            .finish_non_exhaustive()
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        log::debug!("Evicting program {} ({})", self.id.0, self.hash);
        self.graveyard.borrow_mut().extend(self.handles.get());
    }
}
