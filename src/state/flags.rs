//! Small per-object state objects that do not carry geometry or shading data.

use std::cell::Cell;
use std::rc::Rc;

use glam::{UVec2, Vec3};

use super::{StateId, StateKind, impl_state_object};
use crate::gpu::{GpuDevice, GpuRenderTarget, GpuTexture, Viewport};

// ─── Viewport ────────────────────────────────────────────────────────────────

/// Optional sub-rectangle of the canvas; `None` covers the whole canvas.
#[derive(Debug)]
pub struct ViewportState {
    id: StateId,
    boundary: Cell<Option<Viewport>>,
}

impl_state_object!(ViewportState, StateKind::Viewport);

impl ViewportState {
    #[must_use]
    pub fn new(boundary: Option<Viewport>) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            boundary: Cell::new(boundary),
        })
    }

    #[must_use]
    pub fn boundary(&self) -> Option<Viewport> {
        self.boundary.get()
    }

    pub fn set_boundary(&self, boundary: Option<Viewport>) {
        self.boundary.set(boundary);
    }
}

// ─── Visibility / Cull ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct VisibilityState {
    id: StateId,
    visible: Cell<bool>,
}

impl_state_object!(VisibilityState, StateKind::Visibility);

impl VisibilityState {
    #[must_use]
    pub fn new(visible: bool) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            visible: Cell::new(visible),
        })
    }

    #[inline]
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

/// Result of frustum culling done by the scene layer.
#[derive(Debug)]
pub struct CullState {
    id: StateId,
    culled: Cell<bool>,
}

impl_state_object!(CullState, StateKind::Cull);

impl CullState {
    #[must_use]
    pub fn new(culled: bool) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            culled: Cell::new(culled),
        })
    }

    #[inline]
    #[must_use]
    pub fn culled(&self) -> bool {
        self.culled.get()
    }

    pub fn set_culled(&self, culled: bool) {
        self.culled.set(culled);
    }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Draw priority inside a stage. Clamped to `[-499, 499]` by the sort key.
#[derive(Debug)]
pub struct LayerState {
    id: StateId,
    priority: i32,
}

impl_state_object!(LayerState, StateKind::Layer);

impl LayerState {
    #[must_use]
    pub fn new(priority: i32) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            priority,
        })
    }

    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// Coarsest ordering group, e.g. background / scene / overlay.
#[derive(Debug)]
pub struct StageState {
    id: StateId,
    priority: i32,
}

impl_state_object!(StageState, StateKind::Stage);

impl StageState {
    #[must_use]
    pub fn new(priority: i32) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            priority,
        })
    }

    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

// ─── Shader variants ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Billboard {
    #[default]
    None,
    Spherical,
    Cylindrical,
}

#[derive(Debug)]
pub struct BillboardState {
    id: StateId,
    mode: Billboard,
}

impl_state_object!(BillboardState, StateKind::Billboard);

impl BillboardState {
    #[must_use]
    pub fn new(mode: Billboard) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            mode,
        })
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> Billboard {
        self.mode
    }

    #[must_use]
    pub fn hash(&self) -> &'static str {
        match self.mode {
            Billboard::None => "b:-",
            Billboard::Spherical => "b:s",
            Billboard::Cylindrical => "b:c",
        }
    }
}

/// Pins an object to the camera (skybox style): view translation is ignored.
#[derive(Debug)]
pub struct StationaryState {
    id: StateId,
    active: bool,
}

impl_state_object!(StationaryState, StateKind::Stationary);

impl StationaryState {
    #[must_use]
    pub fn new(active: bool) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            active,
        })
    }

    #[inline]
    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn hash(&self) -> &'static str {
        if self.active { "s:1" } else { "s:0" }
    }
}

// ─── Outline ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct OutlineState {
    id: StateId,
    color: Cell<Vec3>,
    width: Cell<f32>,
}

impl_state_object!(OutlineState, StateKind::Outline);

impl OutlineState {
    #[must_use]
    pub fn new(color: Vec3, width: f32) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            color: Cell::new(color),
            width: Cell::new(width),
        })
    }

    #[inline]
    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color.get()
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width.get()
    }

    pub fn set_color(&self, color: Vec3) {
        self.color.set(color);
    }

    pub fn set_width(&self, width: f32) {
        self.width.set(width);
    }
}

// ─── Render target ───────────────────────────────────────────────────────────

/// Off-screen destination of an object. The device target is allocated by
/// the renderer on first use; `size == None` means "same as canvas".
#[derive(Debug)]
pub struct RenderTargetState {
    id: StateId,
    size: Cell<Option<UVec2>>,
    target: Cell<Option<GpuRenderTarget>>,
}

impl_state_object!(RenderTargetState, StateKind::RenderTarget);

impl RenderTargetState {
    #[must_use]
    pub fn new(size: Option<UVec2>) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            size: Cell::new(size),
            target: Cell::new(None),
        })
    }

    #[must_use]
    pub fn size(&self) -> Option<UVec2> {
        self.size.get()
    }

    pub fn set_size(&self, size: Option<UVec2>) {
        self.size.set(size);
    }

    /// Device target, if already allocated.
    #[must_use]
    pub fn target(&self) -> Option<GpuRenderTarget> {
        self.target.get()
    }

    /// Returns the device target, creating or resizing it as needed.
    pub fn ensure_target(&self, device: &mut dyn GpuDevice) -> GpuRenderTarget {
        let size = self.size.get().unwrap_or_else(|| device.canvas_size());
        if let Some(target) = self.target.get()
            && let Some(current) = device.render_target_size(target)
        {
            if current != size {
                device.resize_render_target(target, size);
            }
            return target;
        }
        let target = device.create_render_target(size);
        self.target.set(Some(target));
        target
    }

    /// Colour attachment for sampling by other objects.
    #[must_use]
    pub fn texture(&self, device: &dyn GpuDevice) -> Option<GpuTexture> {
        device.render_target_texture(self.target.get()?)
    }

    pub fn release(&self, device: &mut dyn GpuDevice) {
        if let Some(target) = self.target.take() {
            device.delete_render_target(target);
        }
    }
}
