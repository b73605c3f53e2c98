//! Shadow Pass Tests
//!
//! Tests for:
//! - Shadow maps rendered before the main pass, once per casting light
//! - Shadow map binding on receiving programs
//! - Objects that do not cast shadows
//! - Stable shadow texture units across many light sets

mod common;

use std::rc::Rc;

use glam::{Mat4, Vec3};

use myth_retained::gpu::{DeviceCommand, UniformValue};
use myth_retained::renderer::ProgramStage;
use myth_retained::state::{
    LightKind, LightSpace, LightState, LightsState, ModesDesc, ShadowDesc,
};
use myth_retained::{ObjectId, RenderParams, StateSlots};

use common::{quad, setup, slots, with_modes};

fn spot_light() -> Rc<LightState> {
    let position = Vec3::new(0.0, 0.0, 4.0);
    LightState::with_shadow(
        LightKind::Spot {
            position,
            direction: Vec3::NEG_Z,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            space: LightSpace::World,
        },
        Vec3::ONE,
        1.0,
        ShadowDesc {
            view_matrix: Mat4::look_at_rh(position, Vec3::ZERO, Vec3::Y),
            proj_matrix: Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 20.0),
            resolution: Some(32),
            ..Default::default()
        },
    )
}

fn lit(slots: StateSlots, light: &Rc<LightState>) -> StateSlots {
    StateSlots {
        lights: LightsState::new([Rc::clone(light)]),
        ..slots
    }
}

// ============================================================================
// Shadow maps
// ============================================================================

#[test]
fn shadow_map_renders_before_main_pass() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let light = spot_light();
    renderer
        .build_object(&mut device, ObjectId(1), &lit(slots(&geometry), &light))
        .unwrap();

    device.record_commands(true);
    renderer.render(&mut device, RenderParams::default());
    let commands = device.take_commands();

    let program = renderer.object(ObjectId(1)).unwrap().program().unwrap().clone();
    let draw_index = |stage: ProgramStage| {
        commands.iter().position(|c| {
            matches!(c, DeviceCommand::Draw { program: Some(p), .. } if *p == program.handle(stage))
        })
    };
    let shadow = draw_index(ProgramStage::Shadow).expect("shadow draw");
    let main = draw_index(ProgramStage::Draw).expect("main draw");

    assert!(shadow < main);
    assert_eq!(renderer.stats().shadow_renders, 1);
    assert!(renderer.shadow_light().is_some_and(|l| Rc::ptr_eq(l, &light)));
}

#[test]
fn receiver_samples_shadow_map() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let light = spot_light();
    renderer
        .build_object(&mut device, ObjectId(1), &lit(slots(&geometry), &light))
        .unwrap();
    renderer.render(&mut device, RenderParams::default());

    let program = renderer.object(ObjectId(1)).unwrap().program().unwrap().clone();
    let draw = program.handle(ProgramStage::Draw);

    assert_eq!(device.uniform(draw, "shadowMap0"), Some(UniformValue::Sampler(8)));
    assert!(matches!(device.uniform(draw, "shadowMatrix0"), Some(UniformValue::Mat4(_))));
    assert_eq!(device.uniform(draw, "shadowBias0"), Some(UniformValue::Float(0.005)));
}

#[test]
fn shadow_maps_rerender_every_image() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let light = spot_light();
    let s = lit(slots(&geometry), &light);
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();
    renderer.build_object(&mut device, ObjectId(2), &s).unwrap();

    renderer.render(&mut device, RenderParams::default());
    renderer.set_image_dirty();
    renderer.render(&mut device, RenderParams::default());

    // One map per light per image, however many casters it has.
    assert_eq!(renderer.stats().shadow_renders, 2);
}

#[test]
fn non_casting_objects_skip_shadow_pass() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let light = spot_light();
    let s = with_modes(
        lit(slots(&geometry), &light),
        ModesDesc {
            cast_shadow: false,
            ..Default::default()
        },
    );
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(renderer.stats().shadow_renders, 0);
    assert_eq!(device.stats().draw_calls, 1);
}

#[test]
fn lights_without_shadow_need_no_map() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let light = LightState::new(
        LightKind::Directional {
            direction: Vec3::NEG_Z,
            space: LightSpace::World,
        },
        Vec3::ONE,
        1.0,
    );
    renderer
        .build_object(&mut device, ObjectId(1), &lit(slots(&geometry), &light))
        .unwrap();

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(renderer.stats().shadow_renders, 0);
    assert_eq!(device.stats().target_binds, 1);
}

#[test]
fn shadow_units_stay_fixed_across_light_sets() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let light = spot_light();
    for id in 0..20 {
        // A separate light set per object, all sharing one program.
        renderer
            .build_object(&mut device, ObjectId(id), &lit(slots(&geometry), &light))
            .unwrap();
    }
    assert_eq!(renderer.program_cache().len(), 1);

    device.record_commands(true);
    renderer.render(&mut device, RenderParams::default());

    let units: Vec<u32> = device
        .take_commands()
        .into_iter()
        .filter_map(|c| match c {
            DeviceCommand::BindTexture(unit, _) => Some(unit),
            _ => None,
        })
        .collect();
    assert_eq!(units.len(), 20);
    assert!(units.iter().all(|&unit| unit == 8), "{units:?}");

    let program = renderer.object(ObjectId(0)).unwrap().program().unwrap().clone();
    let draw = program.handle(ProgramStage::Draw);
    assert_eq!(device.uniform(draw, "shadowMap0"), Some(UniformValue::Sampler(8)));
}
