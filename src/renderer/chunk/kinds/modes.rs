use crate::gpu::{Face, GpuDevice};
use crate::renderer::frame::FrameContext;
use crate::renderer::program::ProgramStage;
use crate::state::ModesState;

/// Face culling and depth writes.
///
/// The outline sub-pass never culls; the transparent bucket always culls
/// back faces and keeps the depth buffer read-only.
pub(crate) fn apply(state: &ModesState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    let desc = state.desc();
    let cull = match frame.stage {
        ProgramStage::Outline => None,
        _ if frame.transparent => Some(Face::Back),
        _ if desc.back_faces => None,
        _ => Some(Face::Back),
    };
    device.set_cull_face(cull);
    device.set_front_face(desc.front_face);
    if frame.stage == ProgramStage::Draw {
        device.set_depth(true, !frame.transparent);
    }
}
