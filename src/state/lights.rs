use std::rc::Rc;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use super::{StateId, StateKind, impl_state_object};

/// Coordinate space a light's position/direction is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightSpace {
    #[default]
    World,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional {
        direction: Vec3,
        space: LightSpace,
    },
    Point {
        position: Vec3,
        /// constant, linear, quadratic
        attenuation: Vec3,
        space: LightSpace,
    },
    Spot {
        position: Vec3,
        direction: Vec3,
        /// constant, linear, quadratic
        attenuation: Vec3,
        space: LightSpace,
    },
}

/// Shadow-map configuration of a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowDesc {
    pub view_matrix: Mat4,
    pub proj_matrix: Mat4,
    /// Overrides the renderer's default shadow-map size.
    pub resolution: Option<u32>,
    pub bias: f32,
}

impl Default for ShadowDesc {
    fn default() -> Self {
        Self {
            view_matrix: Mat4::IDENTITY,
            proj_matrix: Mat4::IDENTITY,
            resolution: None,
            bias: 0.005,
        }
    }
}

/// A single light source.
#[derive(Debug)]
pub struct LightState {
    id: StateId,
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub shadow: Option<ShadowDesc>,
}

impl_state_object!(LightState, StateKind::Light);

impl LightState {
    #[must_use]
    pub fn new(kind: LightKind, color: Vec3, intensity: f32) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            kind,
            color,
            intensity,
            shadow: None,
        })
    }

    #[must_use]
    pub fn with_shadow(kind: LightKind, color: Vec3, intensity: f32, shadow: ShadowDesc) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            kind,
            color,
            intensity,
            shadow: (!matches!(kind, LightKind::Ambient)).then_some(shadow),
        })
    }

    #[must_use]
    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient)
    }

    #[must_use]
    pub fn casts_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    fn code(&self) -> String {
        let (kind, space) = match self.kind {
            LightKind::Ambient => ("a", LightSpace::World),
            LightKind::Directional { space, .. } => ("d", space),
            LightKind::Point { space, .. } => ("p", space),
            LightKind::Spot { space, .. } => ("s", space),
        };
        let mut code = kind.to_owned();
        if space == LightSpace::View {
            code.push('v');
        }
        if self.casts_shadow() {
            code.push('S');
        }
        code
    }
}

/// Ordered set of lights affecting an object.
#[derive(Debug)]
pub struct LightsState {
    id: StateId,
    hash: String,
    lights: SmallVec<[Rc<LightState>; 4]>,
}

impl_state_object!(LightsState, StateKind::Lights);

impl LightsState {
    #[must_use]
    pub fn new(lights: impl IntoIterator<Item = Rc<LightState>>) -> Rc<Self> {
        let lights: SmallVec<[Rc<LightState>; 4]> = lights.into_iter().collect();
        let codes: Vec<String> = lights.iter().map(|l| l.code()).collect();
        Rc::new(Self {
            id: StateId::next(),
            hash: format!("l:{}", codes.join(",")),
            lights,
        })
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn lights(&self) -> &[Rc<LightState>] {
        &self.lights
    }

    /// First ambient light, used for the clear colour.
    #[must_use]
    pub fn ambient(&self) -> Option<&Rc<LightState>> {
        self.lights.iter().find(|l| l.is_ambient())
    }

    /// First shadow-casting spot light.
    #[must_use]
    pub fn shadow_spot(&self) -> Option<&Rc<LightState>> {
        self.lights
            .iter()
            .find(|l| l.casts_shadow() && matches!(l.kind, LightKind::Spot { .. }))
    }

    pub fn shadow_casters(&self) -> impl Iterator<Item = &Rc<LightState>> {
        self.lights.iter().filter(|l| l.casts_shadow())
    }
}
