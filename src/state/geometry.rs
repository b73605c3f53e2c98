use std::cell::OnceCell;
use std::rc::Rc;

use glam::Vec3;

use super::{StateId, StateKind, impl_state_object};
use crate::gpu::{BufferTarget, GpuBuffer, GpuDevice, Primitive};
use crate::renderer::encode_pick_index;

/// CPU-side description used to create a [`GeometryState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryDesc<'a> {
    pub primitive: Primitive,
    /// xyz triplets
    pub positions: &'a [f32],
    /// xyz triplets
    pub normals: Option<&'a [f32]>,
    /// uv pairs
    pub uvs: Option<&'a [f32]>,
    /// rgba quadruplets
    pub colors: Option<&'a [f32]>,
    pub indices: Option<&'a [u32]>,
}

/// De-indexed buffers used by the primitive pick pass.
///
/// Every triangle gets its own three vertices, all coloured with the encoded
/// triangle index.
#[derive(Debug, Clone, Copy)]
pub struct PickGeometry {
    pub positions: GpuBuffer,
    pub colors: GpuBuffer,
    pub count: u32,
}

/// Uploaded vertex/index buffers plus the CPU positions needed for surface picks.
#[derive(Debug)]
pub struct GeometryState {
    id: StateId,
    hash: String,
    primitive: Primitive,

    positions: Vec<f32>,
    indices: Option<Vec<u32>>,

    position_buffer: GpuBuffer,
    normal_buffer: Option<GpuBuffer>,
    uv_buffer: Option<GpuBuffer>,
    color_buffer: Option<GpuBuffer>,
    index_buffer: Option<GpuBuffer>,
    count: u32,

    pick: OnceCell<PickGeometry>,
}

impl_state_object!(GeometryState, StateKind::Geometry);

impl GeometryState {
    pub fn new(device: &mut dyn GpuDevice, desc: &GeometryDesc<'_>) -> Rc<Self> {
        let position_buffer = upload_floats(device, desc.positions);
        let normal_buffer = desc.normals.map(|d| upload_floats(device, d));
        let uv_buffer = desc.uvs.map(|d| upload_floats(device, d));
        let color_buffer = desc.colors.map(|d| upload_floats(device, d));
        let index_buffer = desc
            .indices
            .map(|d| device.create_buffer(BufferTarget::ElementArray, bytemuck::cast_slice(d)));

        let count = match desc.indices {
            Some(indices) => indices.len() as u32,
            None => (desc.positions.len() / 3) as u32,
        };

        let mut hash = format!("g:{}", desc.primitive.as_str());
        if desc.normals.is_some() {
            hash.push_str(",n");
        }
        if desc.uvs.is_some() {
            hash.push_str(",u");
        }
        if desc.colors.is_some() {
            hash.push_str(",c");
        }

        Rc::new(Self {
            id: StateId::next(),
            hash,
            primitive: desc.primitive,
            positions: desc.positions.to_vec(),
            indices: desc.indices.map(<[u32]>::to_vec),
            position_buffer,
            normal_buffer,
            uv_buffer,
            color_buffer,
            index_buffer,
            count,
            pick: OnceCell::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    /// Number of vertices (or indices) submitted by the draw call.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn position_buffer(&self) -> GpuBuffer {
        self.position_buffer
    }

    #[must_use]
    pub fn normal_buffer(&self) -> Option<GpuBuffer> {
        self.normal_buffer
    }

    #[must_use]
    pub fn uv_buffer(&self) -> Option<GpuBuffer> {
        self.uv_buffer
    }

    #[must_use]
    pub fn color_buffer(&self) -> Option<GpuBuffer> {
        self.color_buffer
    }

    #[must_use]
    pub fn index_buffer(&self) -> Option<GpuBuffer> {
        self.index_buffer
    }

    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.normal_buffer.is_some()
    }

    /// Number of triangles, zero for non-triangle primitives.
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        if self.primitive == Primitive::Triangles {
            self.count / 3
        } else {
            0
        }
    }

    /// Object-space corners of triangle `index`.
    #[must_use]
    pub fn triangle(&self, index: u32) -> Option<[Vec3; 3]> {
        if index >= self.triangle_count() {
            return None;
        }
        let base = index as usize * 3;
        let vertex = |i: usize| -> Option<Vec3> {
            let v = match &self.indices {
                Some(indices) => *indices.get(base + i)? as usize,
                None => base + i,
            };
            let p = self.positions.get(v * 3..v * 3 + 3)?;
            Some(Vec3::new(p[0], p[1], p[2]))
        };
        Some([vertex(0)?, vertex(1)?, vertex(2)?])
    }

    /// Lazily builds the primitive-pick buffers.
    pub fn pick_geometry(&self, device: &mut dyn GpuDevice) -> &PickGeometry {
        self.pick.get_or_init(|| {
            let triangles = self.triangle_count();
            let mut positions = Vec::with_capacity(triangles as usize * 9);
            let mut colors = Vec::with_capacity(triangles as usize * 12);
            for index in 0..triangles {
                let Some(corners) = self.triangle(index) else {
                    continue;
                };
                let color = encode_pick_index(index);
                for corner in corners {
                    positions.extend_from_slice(&corner.to_array());
                    colors.extend_from_slice(&color.to_array());
                }
            }
            PickGeometry {
                positions: upload_floats(device, &positions),
                colors: upload_floats(device, &colors),
                count: (positions.len() / 3) as u32,
            }
        })
    }

    /// Frees every device buffer owned by this geometry.
    pub fn release(&self, device: &mut dyn GpuDevice) {
        device.delete_buffer(self.position_buffer);
        for buffer in [
            self.normal_buffer,
            self.uv_buffer,
            self.color_buffer,
            self.index_buffer,
        ]
        .into_iter()
        .flatten()
        {
            device.delete_buffer(buffer);
        }
        if let Some(pick) = self.pick.get() {
            device.delete_buffer(pick.positions);
            device.delete_buffer(pick.colors);
        }
    }
}

fn upload_floats(device: &mut dyn GpuDevice, data: &[f32]) -> GpuBuffer {
    device.create_buffer(BufferTarget::Array, bytemuck::cast_slice(data))
}
