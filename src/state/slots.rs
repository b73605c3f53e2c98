use std::rc::Rc;

use glam::Vec3;

use super::{
    Billboard, BillboardState, ClipsState, CullState, GeometryState, LayerState, LightsState, MaterialDesc,
    MaterialState, ModesDesc, ModesState, OutlineState, RenderTargetState, StageState,
    StationaryState, TransformState, ViewportState, VisibilityState,
};

/// Separator between the per-category hashes of a composed program hash.
pub const HASH_DELIMITER: &str = ";";

/// Snapshot of every state object a render object is built from.
///
/// `Default` creates fresh default state objects; clone an existing snapshot
/// to share state objects (and therefore chunks) between objects.
#[derive(Debug, Clone)]
pub struct StateSlots {
    /// `None` makes the object non-visual: no program, no chunks.
    pub geometry: Option<Rc<GeometryState>>,
    pub material: Rc<MaterialState>,
    pub modes: Rc<ModesState>,
    pub lights: Rc<LightsState>,
    pub clips: Rc<ClipsState>,
    pub model_transform: Rc<TransformState>,
    pub view_transform: Rc<TransformState>,
    pub proj_transform: Rc<TransformState>,
    pub viewport: Rc<ViewportState>,
    pub visibility: Rc<VisibilityState>,
    pub cull: Rc<CullState>,
    pub layer: Rc<LayerState>,
    pub stage: Rc<StageState>,
    pub billboard: Rc<BillboardState>,
    pub stationary: Rc<StationaryState>,
    pub outline: Rc<OutlineState>,
    pub render_target: Option<Rc<RenderTargetState>>,
}

impl Default for StateSlots {
    fn default() -> Self {
        Self {
            geometry: None,
            material: MaterialState::new(MaterialDesc::default()),
            modes: ModesState::new(ModesDesc::default()),
            lights: LightsState::new([]),
            clips: ClipsState::empty(),
            model_transform: TransformState::identity(),
            view_transform: TransformState::identity(),
            proj_transform: TransformState::identity(),
            viewport: ViewportState::new(None),
            visibility: VisibilityState::new(true),
            cull: CullState::new(false),
            layer: LayerState::new(0),
            stage: StageState::new(0),
            billboard: BillboardState::new(Billboard::None),
            stationary: StationaryState::new(false),
            outline: OutlineState::new(Vec3::new(1.0, 1.0, 0.0), 4.0),
            render_target: None,
        }
    }
}

/// One slot assignment, for callers that drive the snapshot generically.
#[derive(Debug, Clone)]
pub enum Slot {
    Geometry(Option<Rc<GeometryState>>),
    Material(Rc<MaterialState>),
    Modes(Rc<ModesState>),
    Lights(Rc<LightsState>),
    Clips(Rc<ClipsState>),
    ModelTransform(Rc<TransformState>),
    ViewTransform(Rc<TransformState>),
    ProjTransform(Rc<TransformState>),
    Viewport(Rc<ViewportState>),
    Visibility(Rc<VisibilityState>),
    Cull(Rc<CullState>),
    Layer(Rc<LayerState>),
    Stage(Rc<StageState>),
    Billboard(Rc<BillboardState>),
    Stationary(Rc<StationaryState>),
    Outline(Rc<OutlineState>),
    RenderTarget(Option<Rc<RenderTargetState>>),
}

impl StateSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the state object of one slot.
    pub fn set(&mut self, slot: Slot) -> &mut Self {
        match slot {
            Slot::Geometry(s) => self.geometry = s,
            Slot::Material(s) => self.material = s,
            Slot::Modes(s) => self.modes = s,
            Slot::Lights(s) => self.lights = s,
            Slot::Clips(s) => self.clips = s,
            Slot::ModelTransform(s) => self.model_transform = s,
            Slot::ViewTransform(s) => self.view_transform = s,
            Slot::ProjTransform(s) => self.proj_transform = s,
            Slot::Viewport(s) => self.viewport = s,
            Slot::Visibility(s) => self.visibility = s,
            Slot::Cull(s) => self.cull = s,
            Slot::Layer(s) => self.layer = s,
            Slot::Stage(s) => self.stage = s,
            Slot::Billboard(s) => self.billboard = s,
            Slot::Stationary(s) => self.stationary = s,
            Slot::Outline(s) => self.outline = s,
            Slot::RenderTarget(s) => self.render_target = s,
        }
        self
    }

    /// Composed program hash, or `None` for non-visual objects.
    ///
    /// Order: geometry, clips, material, lights, modes, billboard, stationary.
    #[must_use]
    pub fn shader_hash(&self) -> Option<String> {
        let geometry = self.geometry.as_ref()?;
        let parts = [
            geometry.hash(),
            self.clips.hash(),
            self.material.hash(),
            self.lights.hash(),
            self.modes.hash(),
            self.billboard.hash(),
            self.stationary.hash(),
        ];
        Some(parts.join(HASH_DELIMITER))
    }
}
