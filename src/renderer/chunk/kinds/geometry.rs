use crate::gpu::{GpuDevice, Primitive, UniformValue};
use crate::renderer::frame::FrameContext;
use crate::renderer::program::ProgramStage;
use crate::state::GeometryState;

/// Attribute arrays for the current stage; arrays the stage does not read are
/// disabled so they cannot leak into the next draw.
pub(crate) fn apply_buffers(state: &GeometryState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    if frame.stage == ProgramStage::PickPrimitive {
        let pick = *state.pick_geometry(device);
        device.bind_attribute("position", pick.positions, 3);
        device.bind_attribute("pickColor", pick.colors, 4);
        for name in ["normal", "uv", "color"] {
            device.disable_attribute(name);
        }
        return;
    }

    device.bind_attribute("position", state.position_buffer(), 3);
    device.disable_attribute("pickColor");

    let shaded = matches!(frame.stage, ProgramStage::Draw | ProgramStage::Outline);
    match state.normal_buffer() {
        Some(buffer) if shaded => device.bind_attribute("normal", buffer, 3),
        _ => device.disable_attribute("normal"),
    }

    let colored = frame.stage == ProgramStage::Draw;
    match state.uv_buffer() {
        Some(buffer) if colored => device.bind_attribute("uv", buffer, 2),
        _ => device.disable_attribute("uv"),
    }
    match state.color_buffer() {
        Some(buffer) if colored => device.bind_attribute("color", buffer, 4),
        _ => device.disable_attribute("color"),
    }
}

/// The draw call itself. The pick-object stage also writes the object's
/// pick colour here, since it differs for every object.
pub(crate) fn apply_draw(state: &GeometryState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    match frame.stage {
        ProgramStage::PickPrimitive => {
            let count = state.pick_geometry(device).count;
            if count > 0 {
                device.draw(Primitive::Triangles, None, count);
            }
        }
        ProgramStage::PickObject => {
            device.set_uniform("pickColor", UniformValue::Vec4(frame.pick_color));
            device.draw(state.primitive(), state.index_buffer(), state.count());
        }
        _ => device.draw(state.primitive(), state.index_buffer(), state.count()),
    }
}
