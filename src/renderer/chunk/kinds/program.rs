use crate::gpu::GpuDevice;
use crate::renderer::frame::FrameContext;
use crate::renderer::program::Program;

/// Binds the variant of `program` for the current stage.
pub(crate) fn apply(program: &Program, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    device.use_program(program.handle(frame.stage));
}
