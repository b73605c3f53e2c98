//! GPU Backend Abstraction
//!
//! The renderer never talks to a graphics API directly. Every GPU call made by
//! the program cache, the chunk callbacks and the pass executor goes through
//! the object-safe [`GpuDevice`] trait, which mirrors an immediate-mode,
//! GL-style context:
//!
//! | Concern              | Methods                                                        |
//! |----------------------|----------------------------------------------------------------|
//! | Resources            | `create_buffer`, `create_texture`, `compile_program`, `delete_*` |
//! | Program state        | `use_program`, `set_uniform`, `bind_attribute`, `bind_texture`  |
//! | Fixed-function state | `set_depth`, `set_cull_face`, `set_blend`, `set_stencil`, …     |
//! | Targets              | `create_render_target`, `bind_render_target`, `read_pixel`      |
//! | Draw                 | `draw`, `clear`                                                 |
//!
//! [`HeadlessDevice`] is a CPU implementation used for tests and off-screen
//! tooling.

mod headless;
mod raster;

pub use headless::{DeviceCommand, DeviceStats, HeadlessDevice};

use bitflags::bitflags;
use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};

// ─── Handles ─────────────────────────────────────────────────────────────────

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            #[must_use]
            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

gpu_handle!(
    /// Vertex or index buffer owned by the device.
    GpuBuffer
);
gpu_handle!(
    /// Sampled texture owned by the device.
    GpuTexture
);
gpu_handle!(
    /// Linked shader program owned by the device.
    GpuProgram
);
gpu_handle!(
    /// Off-screen colour + depth + stencil framebuffer.
    GpuRenderTarget
);

// ─── Fixed-Function State ────────────────────────────────────────────────────

/// Binding point of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data (`f32` components).
    Array,
    /// Index data (`u32` indices).
    ElementArray,
}

/// Primitive assembly mode of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl Primitive {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineStrip => "line-strip",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle-strip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Blend function; the equation is always `src * src_factor + dst * dst_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendState {
    /// Additive blend equation with standard alpha weighting.
    pub const ALPHA: Self = Self {
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };
}

/// Stencil configuration used by the outline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilMode {
    #[default]
    Disabled,
    /// Always pass, replace the stencil value with `reference`.
    Write { reference: u8 },
    /// Pass only where the stencil value differs from `reference`; no writes.
    NotEqual { reference: u8 },
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ClearFlags: u8 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Viewport rectangle in window coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn from_size(size: UVec2) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.x,
            height: size.y,
        }
    }
}

// ─── Uniforms ────────────────────────────────────────────────────────────────

/// Value written to a named uniform of the current program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Texture unit index for a sampler uniform.
    Sampler(u32),
}

impl UniformValue {
    #[must_use]
    pub fn as_mat4(&self) -> Option<Mat4> {
        match self {
            Self::Mat4(m) => Some(*m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vec4(&self) -> Option<Vec4> {
        match self {
            Self::Vec4(v) => Some(*v),
            Self::Vec3(v) => Some(v.extend(1.0)),
            _ => None,
        }
    }
}

// ─── Device Trait ────────────────────────────────────────────────────────────

/// Immediate-mode GPU context driven by the renderer.
///
/// Uniforms are program state: values written through [`set_uniform`] stick to
/// the program that was current at the time and survive program switches.
///
/// [`set_uniform`]: GpuDevice::set_uniform
pub trait GpuDevice {
    /// Size of the default framebuffer in pixels.
    fn canvas_size(&self) -> UVec2;

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> GpuBuffer;
    fn delete_buffer(&mut self, buffer: GpuBuffer);

    /// Creates an RGBA8 texture.
    fn create_texture(&mut self, size: UVec2, rgba: &[u8]) -> GpuTexture;
    fn delete_texture(&mut self, texture: GpuTexture);

    /// Compiles, links and validates a program. On failure returns the log.
    fn compile_program(
        &mut self,
        label: &str,
        vertex: &str,
        fragment: &str,
    ) -> std::result::Result<GpuProgram, String>;
    fn delete_program(&mut self, program: GpuProgram);

    fn use_program(&mut self, program: GpuProgram);
    fn set_uniform(&mut self, name: &str, value: UniformValue);
    fn bind_attribute(&mut self, name: &str, buffer: GpuBuffer, components: u32);
    /// Disables an attribute array previously enabled by `bind_attribute`.
    fn disable_attribute(&mut self, name: &str);
    fn bind_texture(&mut self, unit: u32, texture: GpuTexture);

    fn set_depth(&mut self, test: bool, write: bool);
    fn set_cull_face(&mut self, face: Option<Face>);
    fn set_front_face(&mut self, front_face: FrontFace);
    fn set_blend(&mut self, blend: Option<BlendState>);
    fn set_stencil(&mut self, stencil: StencilMode);
    fn set_line_width(&mut self, width: f32);
    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]);

    /// Issues a draw call. With `indices` the call is indexed.
    fn draw(&mut self, primitive: Primitive, indices: Option<GpuBuffer>, count: u32);

    fn create_render_target(&mut self, size: UVec2) -> GpuRenderTarget;
    fn resize_render_target(&mut self, target: GpuRenderTarget, size: UVec2);
    fn delete_render_target(&mut self, target: GpuRenderTarget);
    /// Binds an off-screen target, or the default framebuffer with `None`.
    fn bind_render_target(&mut self, target: Option<GpuRenderTarget>);
    /// Colour attachment of a render target, for sampling.
    fn render_target_texture(&self, target: GpuRenderTarget) -> Option<GpuTexture>;
    fn render_target_size(&self, target: GpuRenderTarget) -> Option<UVec2>;

    /// Reads one RGBA8 pixel of the bound framebuffer (origin bottom-left).
    fn read_pixel(&mut self, x: u32, y: u32) -> [u8; 4];
}
