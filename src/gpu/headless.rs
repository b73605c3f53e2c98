//! Headless Device
//!
//! CPU implementation of [`GpuDevice`]. Resources live in hash maps, uniforms
//! are tracked per program, and triangle draws are rasterised with a flat
//! colour into the bound colour/depth/stencil planes so that colour-index
//! picking and pixel readback behave like they would on a GPU.
//!
//! Flat colour selection for a draw, first match wins:
//! 1. per-vertex `pickColor` attribute (4 components, provoking vertex)
//! 2. `pickColor` uniform
//! 3. `outlineColor` uniform
//! 4. `materialColor` uniform
//! 5. opaque white
//!
//! Vertex positions come from the 3-component `position` attribute and are
//! transformed by the `projMatrix * viewMatrix * modelMatrix` uniforms
//! (identity when unset). Only [`Primitive::Triangles`] draws are rasterised;
//! every draw call is counted.

use glam::{Mat4, UVec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use super::raster::{RasterState, Surface};
use super::{
    BlendState, BufferTarget, ClearFlags, Face, FrontFace, GpuBuffer, GpuDevice, GpuProgram,
    GpuRenderTarget, GpuTexture, Primitive, StencilMode, UniformValue, Viewport,
};

/// Call counters, reset with [`HeadlessDevice::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub draw_calls: u32,
    pub triangles_rasterized: u32,
    pub use_program_calls: u32,
    pub uniform_writes: u32,
    pub attribute_binds: u32,
    pub texture_binds: u32,
    pub clears: u32,
    pub state_changes: u32,
    pub target_binds: u32,
    pub programs_compiled: u32,
    pub programs_deleted: u32,
    pub pixels_read: u32,
}

/// One recorded device call, kept when recording is enabled.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    UseProgram(GpuProgram),
    SetUniform(String, UniformValue),
    BindAttribute(String, GpuBuffer),
    BindTexture(u32, GpuTexture),
    Draw {
        program: Option<GpuProgram>,
        primitive: Primitive,
        count: u32,
    },
    Clear(ClearFlags),
    BindRenderTarget(Option<GpuRenderTarget>),
    SetStencil(StencilMode),
    SetBlend(Option<BlendState>),
    SetCullFace(Option<Face>),
}

#[derive(Debug)]
struct ProgramRecord {
    label: String,
    uniforms: FxHashMap<String, UniformValue>,
}

#[derive(Debug, Clone, Copy)]
struct AttributeBinding {
    buffer: GpuBuffer,
    components: u32,
}

#[derive(Debug)]
struct TargetRecord {
    surface: Surface,
    texture: GpuTexture,
}

/// CPU-backed [`GpuDevice`].
pub struct HeadlessDevice {
    canvas: Surface,
    targets: FxHashMap<GpuRenderTarget, TargetRecord>,
    bound_target: Option<GpuRenderTarget>,

    buffers: FxHashMap<GpuBuffer, (BufferTarget, Vec<u8>)>,
    textures: FxHashMap<GpuTexture, UVec2>,
    programs: FxHashMap<GpuProgram, ProgramRecord>,

    current_program: Option<GpuProgram>,
    attributes: FxHashMap<String, AttributeBinding>,
    texture_units: FxHashMap<u32, GpuTexture>,
    raster: RasterState,
    line_width: f32,

    next_handle: u32,
    stats: DeviceStats,
    commands: Option<Vec<DeviceCommand>>,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let size = UVec2::new(width.max(1), height.max(1));
        Self {
            canvas: Surface::new(size),
            targets: FxHashMap::default(),
            bound_target: None,
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            programs: FxHashMap::default(),
            current_program: None,
            attributes: FxHashMap::default(),
            texture_units: FxHashMap::default(),
            raster: RasterState {
                depth_test: true,
                depth_write: true,
                cull_face: None,
                front_face: FrontFace::Ccw,
                blend: None,
                stencil: StencilMode::Disabled,
                viewport: Viewport::from_size(size),
            },
            line_width: 1.0,
            next_handle: 1,
            stats: DeviceStats::default(),
            commands: None,
        }
    }

    /// Starts keeping a log of device calls (see [`DeviceCommand`]).
    pub fn record_commands(&mut self, enabled: bool) {
        self.commands = enabled.then(Vec::new);
    }

    /// Returns and clears the recorded call log.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        self.commands.as_mut().map(std::mem::take).unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DeviceStats::default();
    }

    #[must_use]
    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn program_label(&self, program: GpuProgram) -> Option<&str> {
        self.programs.get(&program).map(|p| p.label.as_str())
    }

    /// Reads back a uniform value as seen by `program`.
    #[must_use]
    pub fn uniform(&self, program: GpuProgram, name: &str) -> Option<UniformValue> {
        self.programs.get(&program)?.uniforms.get(name).copied()
    }

    #[must_use]
    pub fn current_program(&self) -> Option<GpuProgram> {
        self.current_program
    }

    /// Pixel of the default framebuffer, regardless of the bound target.
    #[must_use]
    pub fn canvas_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.canvas.read(x, y)
    }

    #[must_use]
    pub fn canvas_pixels(&self) -> &[[u8; 4]] {
        self.canvas.color_data()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.resize(UVec2::new(width.max(1), height.max(1)));
    }

    /// Simulates a context loss: every program, buffer, texture and target
    /// handle becomes invalid.
    pub fn lose_context(&mut self) {
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        self.targets.clear();
        self.bound_target = None;
        self.current_program = None;
        self.attributes.clear();
        self.texture_units.clear();
    }

    fn alloc_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn record(&mut self, command: DeviceCommand) {
        if let Some(commands) = self.commands.as_mut() {
            commands.push(command);
        }
    }

    fn bound_surface(&mut self) -> &mut Surface {
        match self.bound_target.and_then(|t| self.targets.get_mut(&t)) {
            Some(record) => &mut record.surface,
            None => &mut self.canvas,
        }
    }

    fn program_uniform(&self, name: &str) -> Option<UniformValue> {
        let program = self.current_program?;
        self.programs.get(&program)?.uniforms.get(name).copied()
    }

    fn read_floats(&self, buffer: GpuBuffer) -> Option<&[f32]> {
        let (_, bytes) = self.buffers.get(&buffer)?;
        bytemuck::try_cast_slice(bytes).ok()
    }

    fn read_indices(&self, buffer: GpuBuffer) -> Option<&[u32]> {
        let (_, bytes) = self.buffers.get(&buffer)?;
        bytemuck::try_cast_slice(bytes).ok()
    }

    fn attribute_vec4(&self, name: &str, vertex: u32) -> Option<Vec4> {
        let binding = self.attributes.get(name)?;
        let data = self.read_floats(binding.buffer)?;
        let c = binding.components as usize;
        let start = vertex as usize * c;
        let slice = data.get(start..start + c)?;
        let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
        for (i, v) in slice.iter().take(4).enumerate() {
            out[i] = *v;
        }
        Some(out)
    }

    fn flat_color(&self, provoking_vertex: u32) -> Vec4 {
        if let Some(color) = self.attribute_vec4("pickColor", provoking_vertex) {
            return color;
        }
        ["pickColor", "outlineColor", "materialColor"]
            .iter()
            .find_map(|name| self.program_uniform(name).and_then(|v| v.as_vec4()))
            .unwrap_or(Vec4::ONE)
    }

    fn rasterize(&mut self, indices: Option<GpuBuffer>, count: u32) {
        let Some(position) = self.attributes.get("position").copied() else {
            return;
        };
        if position.components < 3 {
            return;
        }
        let Some(positions) = self.read_floats(position.buffer).map(<[f32]>::to_vec) else {
            return;
        };

        let vertex_ids: Vec<u32> = match indices {
            Some(buffer) => match self.read_indices(buffer) {
                Some(data) => data.iter().take(count as usize).copied().collect(),
                None => return,
            },
            None => (0..count).collect(),
        };

        let matrix = |name: &str| {
            self.program_uniform(name)
                .and_then(|v| v.as_mat4())
                .unwrap_or(Mat4::IDENTITY)
        };
        let mvp = matrix("projMatrix") * matrix("viewMatrix") * matrix("modelMatrix");

        let stride = position.components as usize;
        let fetch = |vertex: u32| -> Option<Vec4> {
            let start = vertex as usize * stride;
            let p = positions.get(start..start + 3)?;
            Some(mvp * Vec3::new(p[0], p[1], p[2]).extend(1.0))
        };

        let state = self.raster;
        let mut rasterized = 0;
        for tri in vertex_ids.chunks_exact(3) {
            let (Some(a), Some(b), Some(c)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2])) else {
                continue;
            };
            let color = self.flat_color(tri[0]);
            if self.bound_surface().fill_triangle([a, b, c], color, &state) {
                rasterized += 1;
            }
        }
        self.stats.triangles_rasterized += rasterized;
    }
}

impl GpuDevice for HeadlessDevice {
    fn canvas_size(&self) -> UVec2 {
        self.canvas.size()
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> GpuBuffer {
        let buffer = GpuBuffer(self.alloc_handle());
        self.buffers.insert(buffer, (target, data.to_vec()));
        buffer
    }

    fn delete_buffer(&mut self, buffer: GpuBuffer) {
        self.buffers.remove(&buffer);
    }

    fn create_texture(&mut self, size: UVec2, _rgba: &[u8]) -> GpuTexture {
        let texture = GpuTexture(self.alloc_handle());
        self.textures.insert(texture, size);
        texture
    }

    fn delete_texture(&mut self, texture: GpuTexture) {
        self.textures.remove(&texture);
    }

    fn compile_program(
        &mut self,
        label: &str,
        vertex: &str,
        fragment: &str,
    ) -> std::result::Result<GpuProgram, String> {
        for (stage, source) in [("VERTEX", vertex), ("FRAGMENT", fragment)] {
            if let Some((line, text)) = source
                .lines()
                .enumerate()
                .find(|(_, l)| l.trim_start().starts_with("#error"))
            {
                let message = text.trim_start().trim_start_matches("#error").trim();
                return Err(format!(
                    "{stage} ERROR: 0:{}: '#error' : {message}",
                    line + 1
                ));
            }
        }
        let program = GpuProgram(self.alloc_handle());
        self.programs.insert(
            program,
            ProgramRecord {
                label: label.to_owned(),
                uniforms: FxHashMap::default(),
            },
        );
        self.stats.programs_compiled += 1;
        Ok(program)
    }

    fn delete_program(&mut self, program: GpuProgram) {
        if self.programs.remove(&program).is_some() {
            self.stats.programs_deleted += 1;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: GpuProgram) {
        self.stats.use_program_calls += 1;
        self.current_program = self.programs.contains_key(&program).then_some(program);
        self.record(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.stats.uniform_writes += 1;
        if let Some(record) = self
            .current_program
            .and_then(|p| self.programs.get_mut(&p))
        {
            record.uniforms.insert(name.to_owned(), value);
        }
        self.record(DeviceCommand::SetUniform(name.to_owned(), value));
    }

    fn bind_attribute(&mut self, name: &str, buffer: GpuBuffer, components: u32) {
        self.stats.attribute_binds += 1;
        self.attributes
            .insert(name.to_owned(), AttributeBinding { buffer, components });
        self.record(DeviceCommand::BindAttribute(name.to_owned(), buffer));
    }

    fn disable_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    fn bind_texture(&mut self, unit: u32, texture: GpuTexture) {
        self.stats.texture_binds += 1;
        self.texture_units.insert(unit, texture);
        self.record(DeviceCommand::BindTexture(unit, texture));
    }

    fn set_depth(&mut self, test: bool, write: bool) {
        self.stats.state_changes += 1;
        self.raster.depth_test = test;
        self.raster.depth_write = write;
    }

    fn set_cull_face(&mut self, face: Option<Face>) {
        self.stats.state_changes += 1;
        self.raster.cull_face = face;
        self.record(DeviceCommand::SetCullFace(face));
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        self.stats.state_changes += 1;
        self.raster.front_face = front_face;
    }

    fn set_blend(&mut self, blend: Option<BlendState>) {
        self.stats.state_changes += 1;
        self.raster.blend = blend;
        self.record(DeviceCommand::SetBlend(blend));
    }

    fn set_stencil(&mut self, stencil: StencilMode) {
        self.stats.state_changes += 1;
        self.raster.stencil = stencil;
        self.record(DeviceCommand::SetStencil(stencil));
    }

    fn set_line_width(&mut self, width: f32) {
        self.stats.state_changes += 1;
        self.line_width = width;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.stats.state_changes += 1;
        self.raster.viewport = viewport;
    }

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]) {
        self.stats.clears += 1;
        self.bound_surface().clear(flags, color);
        self.record(DeviceCommand::Clear(flags));
    }

    fn draw(&mut self, primitive: Primitive, indices: Option<GpuBuffer>, count: u32) {
        self.stats.draw_calls += 1;
        self.record(DeviceCommand::Draw {
            program: self.current_program,
            primitive,
            count,
        });
        if primitive == Primitive::Triangles && self.current_program.is_some() {
            self.rasterize(indices, count);
        }
    }

    fn create_render_target(&mut self, size: UVec2) -> GpuRenderTarget {
        let target = GpuRenderTarget(self.alloc_handle());
        let texture = GpuTexture(self.alloc_handle());
        let size = size.max(UVec2::ONE);
        self.textures.insert(texture, size);
        self.targets.insert(
            target,
            TargetRecord {
                surface: Surface::new(size),
                texture,
            },
        );
        target
    }

    fn resize_render_target(&mut self, target: GpuRenderTarget, size: UVec2) {
        if let Some(record) = self.targets.get_mut(&target) {
            record.surface.resize(size.max(UVec2::ONE));
        }
    }

    fn delete_render_target(&mut self, target: GpuRenderTarget) {
        if let Some(record) = self.targets.remove(&target) {
            self.textures.remove(&record.texture);
        }
        if self.bound_target == Some(target) {
            self.bound_target = None;
        }
    }

    fn bind_render_target(&mut self, target: Option<GpuRenderTarget>) {
        self.stats.target_binds += 1;
        self.bound_target = target.filter(|t| self.targets.contains_key(t));
        self.record(DeviceCommand::BindRenderTarget(target));
    }

    fn render_target_texture(&self, target: GpuRenderTarget) -> Option<GpuTexture> {
        self.targets.get(&target).map(|r| r.texture)
    }

    fn render_target_size(&self, target: GpuRenderTarget) -> Option<UVec2> {
        self.targets.get(&target).map(|r| r.surface.size())
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> [u8; 4] {
        self.stats.pixels_read += 1;
        self.bound_surface().read(x, y)
    }
}
