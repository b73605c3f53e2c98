use crate::gpu::{GpuDevice, Viewport};
use crate::renderer::frame::FrameContext;
use crate::renderer::program::ProgramStage;
use crate::state::ViewportState;

/// Shadow passes and overridden cameras always cover the whole target.
pub(crate) fn apply(state: &ViewportState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    let full = Viewport::from_size(frame.target_size);
    let viewport = if frame.stage == ProgramStage::Shadow || frame.view_override.is_some() {
        full
    } else {
        state.boundary().unwrap_or(full)
    };
    device.set_viewport(viewport);
}
