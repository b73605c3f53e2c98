use crate::gpu::{GpuDevice, UniformValue};
use crate::renderer::frame::FrameContext;
use crate::state::ClipsState;

pub(crate) fn apply(state: &ClipsState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    for (i, clip) in state.iter().enumerate().take(frame.max_clips) {
        device.set_uniform(&format!("clipActive{i}"), UniformValue::Bool(clip.active));
        device.set_uniform(&format!("clipPos{i}"), UniformValue::Vec3(clip.position));
        device.set_uniform(&format!("clipDir{i}"), UniformValue::Vec3(clip.direction));
    }
}
