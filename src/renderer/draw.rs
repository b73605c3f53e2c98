//! Draw Executor
//!
//! Order inside one image:
//!
//! 1. shadow maps, one per light that has shadow-casting objects
//! 2. render-target objects into their off-screen targets
//! 3. main pass: opaque → outlined (stencil fill, then outline) → transparent
//!
//! Objects are visited in sorted order and every chunk goes through the
//! per-slot duplicate suppression of [`FrameContext::mark_applied`].
//!
//! Outlined objects that are also transparent are drawn in the transparent
//! bucket without their outline.

use glam::UVec2;

use super::frame::{FrameContext, ShadowMapBinding};
use super::object::{ObjectKey, ObjectRegistry, RenderObject};
use super::program::ProgramStage;
use super::stages::DirtyFlags;
use super::{RenderParams, Renderer};
use crate::gpu::{BlendState, ClearFlags, GpuDevice, GpuRenderTarget, StencilMode};
use crate::state::StateId;

/// Runs every chunk of `object` for the current stage of `frame`.
pub(crate) fn run_object(object: &RenderObject, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    let Some(program) = object.program.as_deref() else {
        return;
    };
    for (slot, chunk) in object.chunks.iter() {
        let Some(chunk) = chunk else {
            continue;
        };
        if frame.mark_applied(slot, chunk.id(), chunk.unique()) {
            chunk.invoke(device, frame, program);
        }
    }
}

fn run_objects(
    registry: &ObjectRegistry,
    keys: &[ObjectKey],
    device: &mut dyn GpuDevice,
    frame: &mut FrameContext,
) {
    for &key in keys {
        if let Some(object) = registry.by_key(key) {
            run_object(object, device, frame);
        }
    }
}

/// Main-pass buckets of one image.
#[derive(Debug, Default)]
struct Buckets {
    opaque: Vec<ObjectKey>,
    outlined: Vec<ObjectKey>,
    transparent: Vec<ObjectKey>,
}

impl Buckets {
    fn split(registry: &ObjectRegistry, keys: &[ObjectKey]) -> Self {
        let mut buckets = Self::default();
        for &key in keys {
            let Some(object) = registry.by_key(key) else {
                continue;
            };
            if !object.is_drawable() || object.slots.render_target.is_some() {
                continue;
            }
            if object.is_transparent() {
                buckets.transparent.push(key);
            } else if object.is_outlined() {
                buckets.outlined.push(key);
            } else {
                buckets.opaque.push(key);
            }
        }
        buckets
    }
}

impl Renderer {
    pub(crate) fn new_frame(&self, target_size: UVec2) -> FrameContext {
        FrameContext::new(target_size, self.settings.max_lights, self.settings.max_clips)
    }

    /// Stage 4. Clears the image flag.
    pub(crate) fn draw_image(&mut self, device: &mut dyn GpuDevice, params: &RenderParams) {
        let mut frame = self.new_frame(device.canvas_size());

        self.render_shadow_maps(device, &mut frame);
        self.render_target_objects(device, &mut frame, params);

        device.bind_render_target(None);
        frame.target_size = device.canvas_size();
        if params.clear {
            let ambient = self
                .ambient_light
                .as_ref()
                .map(|l| (l.color * l.intensity).to_array());
            device.clear(ClearFlags::all(), self.settings.clear_color(ambient));
        }

        let buckets = Buckets::split(&self.registry, &self.pipeline.objects);
        self.draw_buckets(device, &mut frame, &buckets, params.opaque_only);

        self.stats.chunks_invoked += frame.chunks_invoked;
        self.stats.chunks_suppressed += frame.chunks_suppressed;
        self.stats.image_renders += 1;
        self.stats.last_pass = params.pass;
        self.pipeline.dirty.remove(DirtyFlags::IMAGE);
    }

    fn draw_buckets(
        &self,
        device: &mut dyn GpuDevice,
        frame: &mut FrameContext,
        buckets: &Buckets,
        opaque_only: bool,
    ) {
        frame.begin_pass(ProgramStage::Draw);
        run_objects(&self.registry, &buckets.opaque, device, frame);

        if !buckets.outlined.is_empty() {
            device.clear(ClearFlags::STENCIL, [0.0; 4]);

            frame.begin_pass(ProgramStage::Draw);
            device.set_stencil(StencilMode::Write { reference: 1 });
            run_objects(&self.registry, &buckets.outlined, device, frame);

            frame.begin_pass(ProgramStage::Outline);
            device.set_stencil(StencilMode::NotEqual { reference: 1 });
            run_objects(&self.registry, &buckets.outlined, device, frame);

            device.set_stencil(StencilMode::Disabled);
        }

        if !opaque_only && !buckets.transparent.is_empty() {
            frame.begin_pass(ProgramStage::Draw);
            frame.transparent = true;
            device.set_blend(Some(BlendState::ALPHA));
            run_objects(&self.registry, &buckets.transparent, device, frame);
            device.set_blend(None);
            device.set_depth(true, true);
        }
    }

    fn render_shadow_maps(&mut self, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
        let live: Vec<StateId> = self
            .pipeline
            .shadow_lists
            .iter()
            .map(|l| l.light.id())
            .collect();
        self.shadow_targets.retain(|light, target| {
            let keep = live.contains(light);
            if !keep {
                device.delete_render_target(*target);
            }
            keep
        });

        for list in &self.pipeline.shadow_lists {
            let Some(shadow) = list.light.shadow else {
                continue;
            };
            let size = UVec2::splat(shadow.resolution.unwrap_or(self.settings.shadow_map_size).max(1));
            let target = ensure_target(device, &mut self.shadow_targets, list.light.id(), size);
            let Some(texture) = device.render_target_texture(target) else {
                log::trace!("Shadow map of light {} not ready, skipped", list.light.id());
                continue;
            };

            device.bind_render_target(Some(target));
            device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, [1.0; 4]);

            frame.begin_pass(ProgramStage::Shadow);
            frame.target_size = size;
            frame.view_override = Some(shadow.view_matrix);
            frame.proj_override = Some(shadow.proj_matrix);
            for &key in &list.objects {
                if let Some(object) = self.registry.by_key(key)
                    && object.slots.visibility.visible()
                {
                    run_object(object, device, frame);
                }
            }
            frame.view_override = None;
            frame.proj_override = None;

            frame.shadow_maps.insert(
                list.light.id(),
                ShadowMapBinding {
                    texture,
                    matrix: shadow.proj_matrix * shadow.view_matrix,
                    bias: shadow.bias,
                },
            );
            self.stats.shadow_renders += 1;
        }
    }

    fn render_target_objects(
        &self,
        device: &mut dyn GpuDevice,
        frame: &mut FrameContext,
        params: &RenderParams,
    ) {
        let ambient = self
            .ambient_light
            .as_ref()
            .map(|l| (l.color * l.intensity).to_array());
        for list in &self.pipeline.target_lists {
            let target = list.target.ensure_target(device);
            let Some(size) = device.render_target_size(target) else {
                log::trace!("Render target {} not ready, skipped", list.target.id());
                continue;
            };
            device.bind_render_target(Some(target));
            frame.target_size = size;
            device.clear(ClearFlags::all(), self.settings.clear_color(ambient));

            let mut buckets = Buckets::default();
            for &key in &list.objects {
                let Some(object) = self.registry.by_key(key) else {
                    continue;
                };
                if !object.is_drawable() {
                    continue;
                }
                if object.is_transparent() {
                    buckets.transparent.push(key);
                } else {
                    buckets.opaque.push(key);
                }
            }
            self.draw_buckets(device, frame, &buckets, params.opaque_only);
        }
    }
}

/// Returns the target for `light`, creating or resizing it as needed.
fn ensure_target(
    device: &mut dyn GpuDevice,
    targets: &mut rustc_hash::FxHashMap<StateId, GpuRenderTarget>,
    light: StateId,
    size: UVec2,
) -> GpuRenderTarget {
    if let Some(&target) = targets.get(&light)
        && let Some(current) = device.render_target_size(target)
    {
        if current != size {
            device.resize_render_target(target, size);
        }
        return target;
    }
    let target = device.create_render_target(size);
    targets.insert(light, target);
    target
}
