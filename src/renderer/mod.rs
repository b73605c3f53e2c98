//! Retained-Mode Renderer
//!
//! [`Renderer`] owns the object registry, the program and chunk caches and
//! the staged pipeline. Callers describe each entity with a [`StateSlots`]
//! snapshot and call [`Renderer::build_object`]; [`Renderer::render`] then
//! resumes the pipeline at its earliest dirty stage.
//!
//! ```text
//! build_object ──▶ ProgramCache (hash → Rc<Program>)
//!              └─▶ ChunkCache   ((slot, program, state) → Rc<Chunk>)
//! render ──▶ object list → state order → sort → image
//! pick   ──▶ object list → state order → sort → pick passes
//! ```

pub mod chunk;
pub mod object;
pub mod program;
pub mod settings;
pub mod stats;

mod draw;
mod frame;
mod pick;
mod stages;

pub use chunk::{Chunk, ChunkCache, ChunkId, ChunkKey, DrawSlot};
pub use object::{ObjectId, RenderObject, SortKey};
pub use pick::{PickHit, PickParams, PickQuery, decode_pick_color, encode_pick_index};
pub use program::{
    Program, ProgramCache, ProgramId, ProgramSources, ProgramStage, ShaderSynthesizer,
    StageSources, TemplateSynthesizer,
};
pub use settings::RendererSettings;
pub use stages::DirtyFlags;
pub use stats::RenderStats;

use std::rc::Rc;

use glam::Vec2;
use rustc_hash::FxHashMap;

use self::object::ObjectRegistry;
use self::stages::Pipeline;
use crate::errors::Result;
use crate::gpu::{GpuDevice, GpuRenderTarget};
use crate::state::{LightState, Slot, StateId, StateSlots};

/// Parameters of one [`Renderer::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    /// Clear the canvas before the main pass.
    pub clear: bool,
    /// Draw even when the image is clean.
    pub force: bool,
    /// Caller-defined pass index (e.g. eye index of a stereo frame).
    pub pass: u32,
    /// Skip the transparent bucket.
    pub opaque_only: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            clear: true,
            force: false,
            pass: 0,
            opaque_only: false,
        }
    }
}

/// Retained-mode renderer core.
///
/// Single-threaded: the caches hand out `Rc` handles and state objects use
/// interior mutability, so a renderer never crosses threads.
pub struct Renderer {
    settings: RendererSettings,
    programs: ProgramCache,
    chunks: ChunkCache,
    registry: ObjectRegistry,
    pipeline: Pipeline,

    /// Slot snapshot edited through [`Renderer::set_slot`].
    current: StateSlots,

    ambient_light: Option<Rc<LightState>>,
    shadow_light: Option<Rc<LightState>>,

    shadow_targets: FxHashMap<StateId, GpuRenderTarget>,
    pick_target: Option<GpuRenderTarget>,

    stats: RenderStats,
}

impl Renderer {
    /// Creates a renderer using the built-in GLSL templates.
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        let synthesizer = Box::new(TemplateSynthesizer::from_settings(&settings));
        Self::with_synthesizer(settings, synthesizer)
    }

    /// Creates a renderer whose programs come from `synthesizer`.
    #[must_use]
    pub fn with_synthesizer(
        settings: RendererSettings,
        synthesizer: Box<dyn ShaderSynthesizer>,
    ) -> Self {
        Self {
            settings,
            programs: ProgramCache::new(synthesizer),
            chunks: ChunkCache::new(),
            registry: ObjectRegistry::default(),
            pipeline: Pipeline::new(),
            current: StateSlots::default(),
            ambient_light: None,
            shadow_light: None,
            shadow_targets: FxHashMap::default(),
            pick_target: None,
            stats: RenderStats::default(),
        }
    }

    // ========================================================================
    // Object building
    // ========================================================================

    /// Assigns one slot of the current compilation snapshot.
    pub fn set_slot(&mut self, slot: Slot) -> &mut Self {
        self.current.set(slot);
        self
    }

    /// The current compilation snapshot.
    #[must_use]
    pub fn current_slots(&self) -> &StateSlots {
        &self.current
    }

    pub fn current_slots_mut(&mut self) -> &mut StateSlots {
        &mut self.current
    }

    /// Builds `id` from the current compilation snapshot.
    pub fn build_current(&mut self, device: &mut dyn GpuDevice, id: ObjectId) -> Result<()> {
        let slots = self.current.clone();
        self.build_object(device, id, &slots)
    }

    /// Creates or updates the render object `id` from `slots`.
    ///
    /// On a program build failure the object is removed from the registry
    /// and the error is returned; every other object is unaffected.
    pub fn build_object(
        &mut self,
        device: &mut dyn GpuDevice,
        id: ObjectId,
        slots: &StateSlots,
    ) -> Result<()> {
        let hash = slots.shader_hash();

        let (key, created) = match self.registry.key(id) {
            Some(key) => (key, false),
            None => (
                self.registry
                    .insert(RenderObject::new(id, slots.clone())),
                true,
            ),
        };
        let Some(object) = self.registry.by_key_mut(key) else {
            return Ok(());
        };
        object.slots = slots.clone();

        let result = match &hash {
            None => {
                object.program = None;
                object.hash = None;
                Ok(())
            }
            Some(hash) if object.hash.as_ref() == Some(hash) && object.program.is_some() => Ok(()),
            Some(hash) => {
                object.program = None;
                object.hash = None;
                match self.programs.get(device, hash, slots) {
                    Ok(program) => {
                        object.program = Some(program);
                        object.hash = Some(hash.clone());
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
        };

        if let Err(err) = result {
            self.registry.remove(id);
            self.programs.collect_garbage(device);
            self.chunks.prune();
            if !created {
                self.pipeline.mark(DirtyFlags::OBJECT_LIST);
            }
            log::warn!("Render object {id} removed after failed build");
            return Err(err);
        }

        object.chunks = match &object.program {
            Some(program) => self.chunks.chunks_for(program, slots),
            None => Default::default(),
        };
        object.compiled = true;

        self.pipeline.mark(if created {
            DirtyFlags::OBJECT_LIST
        } else {
            DirtyFlags::STATE_ORDER
        });

        self.ambient_light = slots.lights.ambient().cloned();
        self.shadow_light = slots.lights.shadow_spot().cloned();

        self.programs.collect_garbage(device);
        self.chunks.prune();
        Ok(())
    }

    /// Releases the render object `id`. Unknown ids are logged and ignored.
    pub fn remove_object(&mut self, device: &mut dyn GpuDevice, id: ObjectId) {
        if self.registry.remove(id).is_none() {
            log::warn!("Ignoring removal of unknown render object {id}");
            return;
        }
        self.pipeline.mark(DirtyFlags::OBJECT_LIST);
        self.programs.collect_garbage(device);
        self.chunks.prune();
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Runs stages 1–3, then draws if the image is dirty or `params.force`.
    pub fn render(&mut self, device: &mut dyn GpuDevice, params: RenderParams) {
        self.prepare_display();
        if self.pipeline.dirty.contains(DirtyFlags::IMAGE) || params.force {
            self.draw_image(device, &params);
        }
    }

    /// Forces a render and samples `coords` (canvas pixels, origin top-left).
    ///
    /// The image is marked dirty afterwards so the next `render` redraws.
    pub fn read_pixels(
        &mut self,
        device: &mut dyn GpuDevice,
        coords: &[Vec2],
        opaque_only: bool,
    ) -> Vec<[u8; 4]> {
        self.render(
            device,
            RenderParams {
                clear: true,
                force: true,
                pass: 0,
                opaque_only,
            },
        );
        let size = device.canvas_size();
        let colors = coords
            .iter()
            .map(|p| match canvas_to_pixel(*p, size) {
                Some((x, y)) => device.read_pixel(x, y),
                None => [0; 4],
            })
            .collect();
        self.pipeline.mark(DirtyFlags::IMAGE);
        colors
    }

    /// Re-creates device resources after a context loss.
    ///
    /// Programs are recompiled in place; pick and shadow targets are
    /// re-allocated lazily on next use.
    pub fn context_restored(&mut self, device: &mut dyn GpuDevice) {
        self.programs.context_restored(device);
        self.shadow_targets.clear();
        self.pick_target = None;
        self.pipeline.mark(DirtyFlags::IMAGE);
        log::info!("Renderer restored after context loss");
    }

    /// Requests a redraw without re-sorting.
    pub fn set_image_dirty(&mut self) {
        self.pipeline.mark(DirtyFlags::IMAGE);
    }

    /// Requests a re-rank, e.g. after a layer or stage priority change.
    pub fn set_state_order_dirty(&mut self) {
        self.pipeline.mark(DirtyFlags::STATE_ORDER);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[must_use]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    #[must_use]
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.pipeline.dirty
    }

    #[must_use]
    pub fn program_cache(&self) -> &ProgramCache {
        &self.programs
    }

    #[must_use]
    pub fn chunk_cache(&self) -> &ChunkCache {
        &self.chunks
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&RenderObject> {
        self.registry.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.registry.key(id).is_some()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    /// Ambient light of the last built object, if any.
    #[must_use]
    pub fn ambient_light(&self) -> Option<&Rc<LightState>> {
        self.ambient_light.as_ref()
    }

    /// Shadow-casting spot light of the last built object, if any.
    #[must_use]
    pub fn shadow_light(&self) -> Option<&Rc<LightState>> {
        self.shadow_light.as_ref()
    }

    /// Object ids in the order of the last sort.
    #[must_use]
    pub fn draw_order(&self) -> Vec<ObjectId> {
        self.pipeline
            .objects
            .iter()
            .filter_map(|&key| self.registry.by_key(key).map(RenderObject::id))
            .collect()
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("objects", &self.registry.len())
            .field("programs", &self.programs)
            .field("dirty", &self.pipeline.dirty)
            .finish_non_exhaustive()
    }
}

/// Top-left canvas position → bottom-left framebuffer pixel.
pub(crate) fn canvas_to_pixel(pos: Vec2, size: glam::UVec2) -> Option<(u32, u32)> {
    if pos.x < 0.0 || pos.y < 0.0 {
        return None;
    }
    let x = pos.x as u32;
    let y = pos.y as u32;
    if x >= size.x || y >= size.y {
        return None;
    }
    Some((x, size.y - y - 1))
}
