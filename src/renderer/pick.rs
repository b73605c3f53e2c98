//! Colour-Index Picking
//!
//! Each pickable object is drawn with a flat colour encoding `index + 1` as
//! little-endian RGBA bytes; a cleared pixel (`0`) means "nothing". A surface
//! pick then redraws only the hit object with one colour per triangle and
//! intersects the view ray with that triangle on the CPU.
//!
//! Ray picks render through a synthetic camera placed at the ray origin and
//! looking along it, and sample the centre pixel.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};

use super::draw::run_object;
use super::object::ObjectId;
use super::program::ProgramStage;
use super::{Renderer, canvas_to_pixel};
use crate::gpu::{ClearFlags, GpuDevice, GpuRenderTarget, StencilMode};

const RAY_NEAR: f32 = 0.01;
const RAY_FAR: f32 = 10_000.0;

/// Colour of pick index `index`.
#[must_use]
pub fn encode_pick_index(index: u32) -> Vec4 {
    let [r, g, b, a] = index.wrapping_add(1).to_le_bytes();
    Vec4::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        f32::from(a) / 255.0,
    )
}

/// Pick index of a read-back pixel, `None` for the clear colour.
#[must_use]
pub fn decode_pick_color(rgba: [u8; 4]) -> Option<u32> {
    u32::from_le_bytes(rgba).checked_sub(1)
}

/// Where to pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickQuery {
    /// Canvas position in pixels, origin top-left.
    Canvas(Vec2),
    /// World-space ray.
    Ray { origin: Vec3, direction: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickParams {
    pub query: PickQuery,
    /// Also resolve the triangle, world position and barycentrics.
    pub pick_surface: bool,
}

impl PickParams {
    #[must_use]
    pub fn canvas(pos: Vec2) -> Self {
        Self {
            query: PickQuery::Canvas(pos),
            pick_surface: false,
        }
    }

    #[must_use]
    pub fn ray(origin: Vec3, direction: Vec3) -> Self {
        Self {
            query: PickQuery::Ray { origin, direction },
            pick_surface: false,
        }
    }

    #[must_use]
    pub fn with_surface(mut self) -> Self {
        self.pick_surface = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub object: ObjectId,
    pub primitive_index: Option<u32>,
    pub world_pos: Option<Vec3>,
    pub barycentric: Option<Vec3>,
    /// Canvas position the hit was read at (the centre pixel for ray picks).
    pub canvas_pos: Vec2,
}

/// World-space ray.
#[derive(Debug, Clone, Copy)]
struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Ray through `pos` (top-left canvas pixels) for the camera `proj * view`.
    fn through_canvas(pos: Vec2, size: UVec2, proj_view: Mat4) -> Option<Self> {
        let inverse = proj_view.inverse();
        let ndc = Vec2::new(
            2.0 * (pos.x + 0.5) / size.x as f32 - 1.0,
            1.0 - 2.0 * (pos.y + 0.5) / size.y as f32,
        );
        let near = inverse.project_point3(ndc.extend(-1.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let direction = (far - near).try_normalize()?;
        Some(Self {
            origin: near,
            direction,
        })
    }

    /// Möller–Trumbore. Returns distance and `(u, v)` of the hit.
    fn intersect(&self, [a, b, c]: [Vec3; 3]) -> Option<(f32, f32, f32)> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some((t, u, v))
    }
}

/// Camera looking down `ray`, and its projection.
fn ray_camera(ray: Ray, fov: f32, aspect: f32) -> Option<(Mat4, Mat4)> {
    let direction = ray.direction.try_normalize()?;
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(ray.origin, ray.origin + direction, up);
    let proj = Mat4::perspective_rh_gl(fov, aspect, RAY_NEAR, RAY_FAR);
    Some((view, proj))
}

impl Renderer {
    /// Picks the object under a canvas position or along a ray.
    ///
    /// Returns `None` when nothing pickable is hit.
    pub fn pick(&mut self, device: &mut dyn GpuDevice, params: &PickParams) -> Option<PickHit> {
        self.prepare_display();

        let size = device.canvas_size();
        if size.x == 0 || size.y == 0 {
            return None;
        }
        let target = self.ensure_pick_target(device, size);
        device.bind_render_target(Some(target));
        device.set_blend(None);
        device.set_stencil(StencilMode::Disabled);
        device.set_depth(true, true);

        let hit = self.pick_passes(device, params, size);

        device.bind_render_target(None);
        self.stats.pick_passes += 1;
        hit
    }

    fn pick_passes(
        &self,
        device: &mut dyn GpuDevice,
        params: &PickParams,
        size: UVec2,
    ) -> Option<PickHit> {
        let mut frame = self.new_frame(size);

        let (canvas_pos, ray) = match params.query {
            PickQuery::Canvas(pos) => (pos, None),
            PickQuery::Ray { origin, direction } => {
                let ray = Ray { origin, direction };
                let (view, proj) =
                    ray_camera(ray, self.settings.pick_ray_fov, size.x as f32 / size.y as f32)?;
                frame.view_override = Some(view);
                frame.proj_override = Some(proj);
                let center = Vec2::new((size.x / 2) as f32, (size.y / 2) as f32);
                (center, Some(ray))
            }
        };
        let (x, y) = canvas_to_pixel(canvas_pos, size)?;

        device.clear(ClearFlags::all(), [0.0; 4]);
        frame.begin_pass(ProgramStage::PickObject);
        for &key in &self.pipeline.objects {
            let Some(object) = self.registry.by_key(key) else {
                continue;
            };
            if !object.is_drawable()
                || !object.slots.modes.pickable()
                || object.slots.render_target.is_some()
            {
                continue;
            }
            frame.next_pick(object.id());
            run_object(object, device, &mut frame);
        }

        let index = decode_pick_color(device.read_pixel(x, y))?;
        let Some(id) = frame.picked_object(index) else {
            log::debug!("Pick index {index} out of range");
            return None;
        };
        let mut hit = PickHit {
            object: id,
            primitive_index: None,
            world_pos: None,
            barycentric: None,
            canvas_pos,
        };
        log::trace!("Picked {id} at {canvas_pos}");

        if !params.pick_surface {
            return Some(hit);
        }

        let object = self.registry.get(id)?;
        device.clear(ClearFlags::all(), [0.0; 4]);
        frame.begin_pass(ProgramStage::PickPrimitive);
        run_object(object, device, &mut frame);

        let Some(primitive) = decode_pick_color(device.read_pixel(x, y)) else {
            return Some(hit);
        };
        hit.primitive_index = Some(primitive);

        let ray = match ray {
            Some(ray) => Some(ray),
            None => {
                let proj_view =
                    object.slots.proj_transform.matrix() * object.slots.view_transform.matrix();
                Ray::through_canvas(canvas_pos, size, proj_view)
            }
        };
        let model = object.slots.model_transform.matrix();
        let triangle = object
            .slots
            .geometry
            .as_ref()
            .and_then(|g| g.triangle(primitive))
            .map(|corners| corners.map(|c| model.transform_point3(c)));

        if let (Some(ray), Some(triangle)) = (ray, triangle)
            && let Some((t, u, v)) = ray.intersect(triangle)
        {
            hit.world_pos = Some(ray.origin + ray.direction * t);
            hit.barycentric = Some(Vec3::new(1.0 - u - v, u, v));
        }
        Some(hit)
    }

    fn ensure_pick_target(&mut self, device: &mut dyn GpuDevice, size: UVec2) -> GpuRenderTarget {
        if let Some(target) = self.pick_target
            && let Some(current) = device.render_target_size(target)
        {
            if current != size {
                device.resize_render_target(target, size);
            }
            return target;
        }
        let target = device.create_render_target(size);
        self.pick_target = Some(target);
        target
    }
}
