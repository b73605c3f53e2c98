use crate::gpu::{GpuDevice, UniformValue};
use crate::renderer::frame::FrameContext;
use crate::renderer::program::ProgramStage;
use crate::state::OutlineState;

pub(crate) fn apply(state: &OutlineState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    if frame.stage != ProgramStage::Outline {
        return;
    }
    device.set_uniform("outlineColor", UniformValue::Vec4(state.color().extend(1.0)));
    device.set_uniform("outlineWidth", UniformValue::Float(state.width()));
}
