use glam::Mat3;

use crate::gpu::{GpuDevice, UniformValue};
use crate::renderer::frame::FrameContext;
use crate::renderer::program::ProgramStage;
use crate::state::TransformState;

fn wants_normals(stage: ProgramStage) -> bool {
    matches!(stage, ProgramStage::Draw | ProgramStage::Outline)
}

pub(crate) fn apply_model(state: &TransformState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    device.set_uniform("modelMatrix", UniformValue::Mat4(state.matrix()));
    if wants_normals(frame.stage) {
        device.set_uniform("modelNormalMatrix", UniformValue::Mat3(state.normal_matrix()));
    }
}

pub(crate) fn apply_view(state: &TransformState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    let view = frame.view_override.unwrap_or_else(|| state.matrix());
    device.set_uniform("viewMatrix", UniformValue::Mat4(view));
    if frame.stage == ProgramStage::Draw {
        let normal = Mat3::from_mat4(view).inverse().transpose();
        device.set_uniform("viewNormalMatrix", UniformValue::Mat3(normal));
    }
}

pub(crate) fn apply_proj(state: &TransformState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    let proj = frame.proj_override.unwrap_or_else(|| state.matrix());
    device.set_uniform("projMatrix", UniformValue::Mat4(proj));
}
