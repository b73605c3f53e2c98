use crate::gpu::{GpuDevice, UniformValue};
use crate::renderer::frame::{FrameContext, MATERIAL_TEXTURE_UNITS};
use crate::renderer::program::ProgramStage;
use crate::state::{LightKind, LightsState};

/// Light uniforms plus the shadow maps of shadow-casting lights.
///
/// Ambient lights feed `ambientColor`; every other light takes the next
/// index, matching the declaration order of the shader templates. Vectors
/// go out in the light's own space and the templates resolve view-space
/// lights against `viewMatrix`. Shadow map `i` always sits on unit
/// `MATERIAL_TEXTURE_UNITS + i`.
pub(crate) fn apply(state: &LightsState, device: &mut dyn GpuDevice, frame: &mut FrameContext) {
    if frame.stage != ProgramStage::Draw {
        return;
    }

    let mut index = 0;
    for light in state.lights() {
        let color = light.color * light.intensity;
        if light.is_ambient() {
            device.set_uniform("ambientColor", UniformValue::Vec3(color));
            continue;
        }
        if index >= frame.max_lights {
            break;
        }

        device.set_uniform(&format!("lightColor{index}"), UniformValue::Vec3(color));
        match light.kind {
            LightKind::Ambient => {}
            LightKind::Directional { direction, .. } => {
                let dir = direction.normalize_or_zero();
                device.set_uniform(&format!("lightDir{index}"), UniformValue::Vec3(dir));
            }
            LightKind::Point { position, attenuation, .. } => {
                device.set_uniform(&format!("lightPos{index}"), UniformValue::Vec3(position));
                device.set_uniform(&format!("lightAtten{index}"), UniformValue::Vec3(attenuation));
            }
            LightKind::Spot { position, direction, attenuation, .. } => {
                let dir = direction.normalize_or_zero();
                device.set_uniform(&format!("lightPos{index}"), UniformValue::Vec3(position));
                device.set_uniform(&format!("lightDir{index}"), UniformValue::Vec3(dir));
                device.set_uniform(&format!("lightAtten{index}"), UniformValue::Vec3(attenuation));
            }
        }

        if let Some(shadow) = frame.shadow_maps.get(&light.id()).copied() {
            let unit = MATERIAL_TEXTURE_UNITS + index as u32;
            device.bind_texture(unit, shadow.texture);
            device.set_uniform(&format!("shadowMap{index}"), UniformValue::Sampler(unit));
            device.set_uniform(&format!("shadowMatrix{index}"), UniformValue::Mat4(shadow.matrix));
            device.set_uniform(&format!("shadowBias{index}"), UniformValue::Float(shadow.bias));
        }
        index += 1;
    }
}
