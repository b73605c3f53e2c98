//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use glam::{Mat4, Vec3};

use myth_retained::state::{
    GeometryDesc, GeometryState, MaterialDesc, MaterialState, ModesDesc, ModesState,
    TransformState,
};
use myth_retained::{HeadlessDevice, Renderer, RendererSettings, StateSlots};

pub const CANVAS: u32 = 64;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn setup() -> (HeadlessDevice, Renderer) {
    setup_with(RendererSettings::default())
}

pub fn setup_with(settings: RendererSettings) -> (HeadlessDevice, Renderer) {
    init_logger();
    (HeadlessDevice::new(CANVAS, CANVAS), Renderer::new(settings))
}

/// Indexed two-triangle quad in the z = 0 plane, counter-clockwise.
pub fn quad(device: &mut HeadlessDevice, half: f32) -> Rc<GeometryState> {
    let positions = [
        -half, -half, 0.0, //
        half, -half, 0.0, //
        half, half, 0.0, //
        -half, half, 0.0,
    ];
    let indices = [0, 1, 2, 0, 2, 3];
    GeometryState::new(
        device,
        &GeometryDesc {
            positions: &positions,
            indices: Some(&indices),
            ..Default::default()
        },
    )
}

/// Default snapshot drawing `geometry` with identity transforms.
pub fn slots(geometry: &Rc<GeometryState>) -> StateSlots {
    StateSlots {
        geometry: Some(Rc::clone(geometry)),
        ..Default::default()
    }
}

pub fn colored(geometry: &Rc<GeometryState>, color: Vec3) -> StateSlots {
    StateSlots {
        material: MaterialState::new(MaterialDesc {
            color,
            ..Default::default()
        }),
        ..slots(geometry)
    }
}

pub fn with_modes(mut slots: StateSlots, modes: ModesDesc) -> StateSlots {
    slots.modes = ModesState::new(modes);
    slots
}

pub fn translated(mut slots: StateSlots, offset: Vec3) -> StateSlots {
    slots.model_transform = TransformState::new(Mat4::from_translation(offset));
    slots
}

/// Bottom-left framebuffer pixel of a top-left canvas position.
pub fn canvas_pixel(device: &HeadlessDevice, x: u32, y: u32) -> [u8; 4] {
    device.canvas_pixel(x, CANVAS - 1 - y)
}
