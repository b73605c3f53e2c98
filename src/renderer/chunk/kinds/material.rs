use crate::gpu::{GpuDevice, UniformValue};
use crate::renderer::frame::FrameContext;
use crate::renderer::program::ProgramStage;
use crate::state::MaterialState;

/// Material constants and maps. Map `k` is bound to texture unit `k as u32`.
pub(crate) fn apply(state: &MaterialState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    if frame.stage != ProgramStage::Draw {
        return;
    }
    let desc = state.desc();
    device.set_uniform("materialColor", UniformValue::Vec4(desc.color.extend(desc.alpha)));
    device.set_uniform("materialEmissive", UniformValue::Vec3(desc.emissive));
    device.set_uniform("materialSpecular", UniformValue::Vec3(desc.specular));
    device.set_uniform("materialShininess", UniformValue::Float(desc.shininess));
    device.set_uniform("materialMetallic", UniformValue::Float(desc.metallic));
    device.set_uniform("materialRoughness", UniformValue::Float(desc.roughness));
    device.set_uniform("pointSize", UniformValue::Float(desc.point_size));
    device.set_line_width(desc.line_width);

    for map in &desc.maps {
        let unit = map.kind as u32;
        device.bind_texture(unit, map.texture);
        device.set_uniform(map.kind.uniform(), UniformValue::Sampler(unit));
    }
}
