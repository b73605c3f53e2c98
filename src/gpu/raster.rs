//! Minimal triangle rasterizer backing [`HeadlessDevice`](super::HeadlessDevice).
//!
//! Fragment shading is flat: each triangle is filled with one RGBA colour.
//! Depth test (`LESS`), stencil, back-face culling and alpha blending follow
//! the fixed-function state captured at draw time.

use glam::{UVec2, Vec3, Vec4};

use super::{BlendFactor, BlendState, ClearFlags, Face, FrontFace, StencilMode, Viewport};

/// Fixed-function state snapshot used while filling a triangle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RasterState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_face: Option<Face>,
    pub front_face: FrontFace,
    pub blend: Option<BlendState>,
    pub stencil: StencilMode,
    pub viewport: Viewport,
}

/// Colour + depth + stencil planes.
#[derive(Debug, Clone)]
pub(crate) struct Surface {
    size: UVec2,
    color: Vec<[u8; 4]>,
    depth: Vec<f32>,
    stencil: Vec<u8>,
}

impl Surface {
    pub fn new(size: UVec2) -> Self {
        let len = (size.x * size.y) as usize;
        Self {
            size,
            color: vec![[0; 4]; len],
            depth: vec![1.0; len],
            stencil: vec![0; len],
        }
    }

    #[inline]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn resize(&mut self, size: UVec2) {
        if size != self.size {
            *self = Self::new(size);
        }
    }

    pub fn clear(&mut self, flags: ClearFlags, color: [f32; 4]) {
        if flags.contains(ClearFlags::COLOR) {
            self.color.fill(to_rgba8(Vec4::from(color)));
        }
        if flags.contains(ClearFlags::DEPTH) {
            self.depth.fill(1.0);
        }
        if flags.contains(ClearFlags::STENCIL) {
            self.stencil.fill(0);
        }
    }

    pub fn read(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.size.x || y >= self.size.y {
            return [0; 4];
        }
        self.color[(y * self.size.x + x) as usize]
    }

    pub fn color_data(&self) -> &[[u8; 4]] {
        &self.color
    }

    /// Fills one clip-space triangle. Returns `true` if any fragment was written.
    pub fn fill_triangle(&mut self, clip: [Vec4; 3], color: Vec4, state: &RasterState) -> bool {
        // No near-plane clipping: triangles crossing w <= 0 are dropped.
        if clip.iter().any(|v| v.w <= f32::EPSILON) {
            return false;
        }

        let vp = state.viewport;
        let window: [Vec3; 3] = clip.map(|v| {
            let ndc = v.truncate() / v.w;
            Vec3::new(
                vp.x as f32 + (ndc.x + 1.0) * 0.5 * vp.width as f32,
                vp.y as f32 + (ndc.y + 1.0) * 0.5 * vp.height as f32,
                (ndc.z + 1.0) * 0.5,
            )
        });

        let area = edge(window[0], window[1], window[2]);
        if area.abs() <= f32::EPSILON {
            return false;
        }

        let ccw = area > 0.0;
        let front = match state.front_face {
            FrontFace::Ccw => ccw,
            FrontFace::Cw => !ccw,
        };
        match state.cull_face {
            Some(Face::Back) if !front => return false,
            Some(Face::Front) if front => return false,
            _ => {}
        }

        let min_x = window.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
        let max_x = window.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = window.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
        let max_y = window.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max);

        let clip_x0 = vp.x.max(0) as f32;
        let clip_y0 = vp.y.max(0) as f32;
        let clip_x1 = ((vp.x + vp.width as i32) as f32).min(self.size.x as f32);
        let clip_y1 = ((vp.y + vp.height as i32) as f32).min(self.size.y as f32);

        let x0 = min_x.max(clip_x0).floor() as i64;
        let x1 = max_x.min(clip_x1 - 1.0).ceil() as i64;
        let y0 = min_y.max(clip_y0).floor() as i64;
        let y1 = max_y.min(clip_y1 - 1.0).ceil() as i64;

        let mut written = false;
        for py in y0.max(0)..=y1 {
            for px in x0.max(0)..=x1 {
                if px as u32 >= self.size.x || py as u32 >= self.size.y {
                    continue;
                }
                let p = Vec3::new(px as f32 + 0.5, py as f32 + 0.5, 0.0);
                let w0 = edge(window[1], window[2], p) / area;
                let w1 = edge(window[2], window[0], p) / area;
                let w2 = edge(window[0], window[1], p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * window[0].z + w1 * window[1].z + w2 * window[2].z;
                let index = (py as u32 * self.size.x + px as u32) as usize;
                if self.shade(index, z, color, state) {
                    written = true;
                }
            }
        }
        written
    }

    fn shade(&mut self, index: usize, z: f32, color: Vec4, state: &RasterState) -> bool {
        match state.stencil {
            StencilMode::NotEqual { reference } if self.stencil[index] == reference => {
                return false;
            }
            _ => {}
        }
        if state.depth_test && z >= self.depth[index] {
            return false;
        }

        let src = color.clamp(Vec4::ZERO, Vec4::ONE);
        let out = match state.blend {
            Some(blend) => {
                let dst = from_rgba8(self.color[index]);
                src * factor(blend.src, src) + dst * factor(blend.dst, src)
            }
            None => src,
        };
        self.color[index] = to_rgba8(out);

        if state.depth_write {
            self.depth[index] = z;
        }
        if let StencilMode::Write { reference } = state.stencil {
            self.stencil[index] = reference;
        }
        true
    }
}

#[inline]
fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn factor(factor: BlendFactor, src: Vec4) -> f32 {
    match factor {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcAlpha => src.w,
        BlendFactor::OneMinusSrcAlpha => 1.0 - src.w,
    }
}

pub(crate) fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

fn from_rgba8(rgba: [u8; 4]) -> Vec4 {
    Vec4::new(
        f32::from(rgba[0]),
        f32::from(rgba[1]),
        f32::from(rgba[2]),
        f32::from(rgba[3]),
    ) / 255.0
}
