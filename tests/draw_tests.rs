//! Draw Executor Tests
//!
//! Tests for:
//! - Consecutive-duplicate chunk suppression
//! - Opaque → outlined → transparent pass order
//! - Clear colour selection and pixel readback
//! - Viewport boundaries and render-target objects
//! - View-space lights under different cameras
//! - Context restore

mod common;

use glam::{Mat4, UVec2, Vec2, Vec3};

use myth_retained::gpu::{BlendState, DeviceCommand, StencilMode, UniformValue, Viewport};
use myth_retained::renderer::{DrawSlot, ProgramStage};
use myth_retained::state::{
    LightKind, LightSpace, LightState, LightsState, MaterialDesc, MaterialState, ModesDesc,
    RenderTargetState, TransformState, ViewportState,
};
use myth_retained::{ObjectId, RenderParams, RendererSettings, StateSlots};

use common::{CANVAS, canvas_pixel, colored, quad, setup, setup_with, slots, translated, with_modes};

// ============================================================================
// Duplicate suppression
// ============================================================================

#[test]
fn shared_chunks_run_once_but_draws_run_per_object() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let s = slots(&geometry);
    for id in 0..4 {
        renderer.build_object(&mut device, ObjectId(id), &s).unwrap();
    }

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(device.stats().use_program_calls, 1);
    assert_eq!(device.stats().draw_calls, 4);

    let slots_per_object = DrawSlot::COUNT as u64;
    let stats = renderer.stats();
    assert_eq!(stats.chunks_invoked, slots_per_object + 3);
    assert_eq!(stats.chunks_suppressed, 3 * (slots_per_object - 1));
}

#[test]
fn differing_material_reapplies_only_material() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &colored(&geometry, Vec3::X))
        .unwrap();
    renderer
        .build_object(&mut device, ObjectId(2), &colored(&geometry, Vec3::Y))
        .unwrap();

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(device.stats().use_program_calls, 1);
    assert_eq!(device.stats().draw_calls, 2);
    // Material (+ draw) for the second object; everything else suppressed.
    let slots_per_object = DrawSlot::COUNT as u64;
    assert_eq!(renderer.stats().chunks_invoked, slots_per_object + 2);
}

#[test]
fn chunks_are_shared_between_objects_with_same_state() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let s = slots(&geometry);
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();
    let live = renderer.chunk_cache().live_count();

    renderer.build_object(&mut device, ObjectId(2), &s).unwrap();

    assert_eq!(live, DrawSlot::COUNT);
    assert_eq!(renderer.chunk_cache().live_count(), live);
    let a = renderer.object(ObjectId(1)).unwrap().chunks()[DrawSlot::Material].clone();
    let b = renderer.object(ObjectId(2)).unwrap().chunks()[DrawSlot::Material].clone();
    assert_eq!(a.unwrap().id(), b.unwrap().id());
}

// ============================================================================
// Pass order
// ============================================================================

fn position(commands: &[DeviceCommand], wanted: &DeviceCommand) -> usize {
    commands
        .iter()
        .position(|c| c == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} not recorded"))
}

#[test]
fn opaque_then_outlined_then_transparent() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let opaque = slots(&geometry);
    let outlined = with_modes(
        slots(&geometry),
        ModesDesc {
            outlined: true,
            ..Default::default()
        },
    );
    let transparent = with_modes(
        slots(&geometry),
        ModesDesc {
            transparent: true,
            ..Default::default()
        },
    );
    renderer.build_object(&mut device, ObjectId(3), &transparent).unwrap();
    renderer.build_object(&mut device, ObjectId(2), &outlined).unwrap();
    renderer.build_object(&mut device, ObjectId(1), &opaque).unwrap();

    device.record_commands(true);
    renderer.render(&mut device, RenderParams::default());
    let commands = device.take_commands();

    let draws: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, DeviceCommand::Draw { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(draws.len(), 4);

    let stencil_write = position(&commands, &DeviceCommand::SetStencil(StencilMode::Write { reference: 1 }));
    let stencil_test = position(&commands, &DeviceCommand::SetStencil(StencilMode::NotEqual { reference: 1 }));
    let stencil_off = position(&commands, &DeviceCommand::SetStencil(StencilMode::Disabled));
    let blend_on = position(&commands, &DeviceCommand::SetBlend(Some(BlendState::ALPHA)));

    assert!(draws[0] < stencil_write);
    assert!(stencil_write < draws[1] && draws[1] < stencil_test);
    assert!(stencil_test < draws[2] && draws[2] < stencil_off);
    assert!(stencil_off < blend_on && blend_on < draws[3]);

    let outline_program = renderer
        .object(ObjectId(2))
        .unwrap()
        .program()
        .unwrap()
        .handle(ProgramStage::Outline);
    assert!(matches!(
        commands[draws[2]],
        DeviceCommand::Draw { program: Some(p), .. } if p == outline_program
    ));
}

#[test]
fn outlined_transparent_objects_draw_without_outline() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let s = with_modes(
        slots(&geometry),
        ModesDesc {
            transparent: true,
            outlined: true,
            ..Default::default()
        },
    );
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();

    device.reset_stats();
    device.record_commands(true);
    renderer.render(&mut device, RenderParams::default());
    let commands = device.take_commands();

    assert!(!commands.iter().any(|c| matches!(c, DeviceCommand::SetStencil(StencilMode::Write { .. }))));
    assert_eq!(device.stats().draw_calls, 1);
}

#[test]
fn opaque_only_skips_transparent_bucket() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    let glass = with_modes(
        slots(&geometry),
        ModesDesc {
            transparent: true,
            ..Default::default()
        },
    );
    renderer.build_object(&mut device, ObjectId(2), &glass).unwrap();

    device.reset_stats();
    renderer.render(
        &mut device,
        RenderParams {
            opaque_only: true,
            ..Default::default()
        },
    );

    assert_eq!(device.stats().draw_calls, 1);
}

// ============================================================================
// Pixels
// ============================================================================

#[test]
fn read_pixels_samples_rendered_colours() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &colored(&geometry, Vec3::X))
        .unwrap();

    let colors = renderer.read_pixels(
        &mut device,
        &[Vec2::new(32.0, 32.0), Vec2::new(1.0, 1.0), Vec2::new(-4.0, 0.0)],
        false,
    );

    assert_eq!(colors, vec![[255, 0, 0, 255], [0, 0, 0, 255], [0, 0, 0, 0]]);
    assert!(renderer.dirty_flags().contains(myth_retained::DirtyFlags::IMAGE));
}

#[test]
fn ambient_light_sets_clear_colour() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let s = StateSlots {
        lights: LightsState::new([LightState::new(LightKind::Ambient, Vec3::Z, 0.5)]),
        ..slots(&geometry)
    };
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();
    renderer.render(&mut device, RenderParams::default());

    assert!(renderer.ambient_light().is_some());
    assert_eq!(canvas_pixel(&device, 1, 1), [0, 0, 128, 255]);
}

#[test]
fn transparent_canvas_clears_to_zero() {
    let (mut device, mut renderer) = setup_with(
        RendererSettings::default()
            .with_transparent_canvas(true)
            .with_background_color([1.0, 1.0, 1.0, 1.0]),
    );
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(canvas_pixel(&device, 1, 1), [0, 0, 0, 0]);
    assert_eq!(canvas_pixel(&device, 32, 32), [255, 255, 255, 255]);
}

#[test]
fn transparent_objects_blend_over_opaque() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &colored(&geometry, Vec3::X))
        .unwrap();
    let glass = StateSlots {
        material: MaterialState::new(MaterialDesc {
            color: Vec3::Z,
            alpha: 0.5,
            ..Default::default()
        }),
        ..with_modes(
            translated(slots(&geometry), Vec3::new(0.0, 0.0, -0.5)),
            ModesDesc {
                transparent: true,
                ..Default::default()
            },
        )
    };
    renderer.build_object(&mut device, ObjectId(2), &glass).unwrap();
    renderer.render(&mut device, RenderParams::default());

    let [r, g, b, _] = canvas_pixel(&device, 32, 32);
    assert!(r.abs_diff(128) <= 1, "red {r}");
    assert_eq!(g, 0);
    assert!(b.abs_diff(128) <= 1, "blue {b}");
}

#[test]
fn viewport_boundary_limits_drawing() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 1.0);
    let half = CANVAS / 2;
    let s = StateSlots {
        viewport: ViewportState::new(Some(Viewport {
            x: 0,
            y: 0,
            width: half,
            height: half,
        })),
        ..colored(&geometry, Vec3::Y)
    };
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();
    renderer.render(&mut device, RenderParams::default());

    // Bottom-left quadrant only.
    assert_eq!(canvas_pixel(&device, 8, CANVAS - 8), [0, 255, 0, 255]);
    assert_eq!(canvas_pixel(&device, CANVAS - 8, 8), [0, 0, 0, 255]);
}

// ============================================================================
// Render targets
// ============================================================================

#[test]
fn render_target_objects_stay_off_canvas() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let target = RenderTargetState::new(Some(UVec2::splat(16)));
    let s = StateSlots {
        render_target: Some(target.clone()),
        ..colored(&geometry, Vec3::X)
    };
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(device.stats().draw_calls, 1);
    assert!(target.texture(&device).is_some());
    assert_eq!(canvas_pixel(&device, 32, 32), [0, 0, 0, 255]);
}

// ============================================================================
// Context loss
// ============================================================================

#[test]
fn context_restore_recompiles_live_programs() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    renderer.render(&mut device, RenderParams::default());

    device.lose_context();
    assert_eq!(device.live_program_count(), 0);

    renderer.context_restored(&mut device);

    assert_eq!(device.live_program_count(), ProgramStage::COUNT);
    let program = renderer.object(ObjectId(1)).unwrap().program().unwrap().clone();
    for stage in ProgramStage::ALL {
        assert!(device.program_label(program.handle(stage)).is_some());
    }
    assert!(renderer.dirty_flags().contains(myth_retained::DirtyFlags::IMAGE));

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());
    assert_eq!(device.stats().draw_calls, 1);
}

// ============================================================================
// View-space lights
// ============================================================================

#[test]
fn view_space_lights_follow_each_object_camera() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let lights = LightsState::new([LightState::new(
        LightKind::Directional {
            direction: Vec3::NEG_Z,
            space: LightSpace::View,
        },
        Vec3::ONE,
        1.0,
    )]);
    let turned = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
    for (id, view) in [(1, Mat4::IDENTITY), (2, turned)] {
        let s = StateSlots {
            lights: lights.clone(),
            view_transform: TransformState::new(view),
            ..slots(&geometry)
        };
        renderer.build_object(&mut device, ObjectId(id), &s).unwrap();
    }
    let program = renderer.object(ObjectId(1)).unwrap().program().unwrap().clone();
    assert!(program.sources().stage(ProgramStage::Draw).fragment.contains("viewToWorldDir(lightDir0)"));

    device.record_commands(true);
    renderer.render(&mut device, RenderParams::default());

    // Uniform state each draw call sees.
    let mut light_dir = None;
    let mut view = None;
    let mut seen = Vec::new();
    for command in device.take_commands() {
        match command {
            DeviceCommand::SetUniform(name, UniformValue::Vec3(v)) if name == "lightDir0" => light_dir = Some(v),
            DeviceCommand::SetUniform(name, UniformValue::Mat4(m)) if name == "viewMatrix" => view = Some(m),
            DeviceCommand::Draw { .. } => seen.push((light_dir, view)),
            _ => {}
        }
    }

    assert_eq!(seen.len(), 2);
    for (dir, _) in &seen {
        assert_eq!(*dir, Some(Vec3::NEG_Z));
    }
    let views: Vec<_> = seen.iter().filter_map(|(_, v)| *v).collect();
    assert!(views.contains(&Mat4::IDENTITY));
    assert!(views.contains(&turned));
}
