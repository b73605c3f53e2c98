//! State Objects
//!
//! Versioned, typed configuration blobs produced by the component layer and
//! referenced (never mutated) by render objects. Each state object carries a
//! stable [`StateId`]; the categories that change the shape of the generated
//! shader additionally expose a `hash()` string.
//!
//! | Category      | Type                    | Shader hash |
//! |---------------|-------------------------|-------------|
//! | Geometry      | [`GeometryState`]       | ✅          |
//! | Material      | [`MaterialState`]       | ✅          |
//! | Lights        | [`LightsState`]         | ✅          |
//! | Modes         | [`ModesState`]          | ✅          |
//! | Clips         | [`ClipsState`]          | ✅          |
//! | Billboard     | [`BillboardState`]      | ✅          |
//! | Stationary    | [`StationaryState`]     | ✅          |
//! | Transforms    | [`TransformState`]      | ❌          |
//! | Viewport      | [`ViewportState`]       | ❌          |
//! | Visibility    | [`VisibilityState`]     | ❌          |
//! | Cull          | [`CullState`]           | ❌          |
//! | Layer / Stage | [`LayerState`], [`StageState`] | ❌   |
//! | Outline       | [`OutlineState`]        | ❌          |
//! | Render target | [`RenderTargetState`]   | ❌          |
//!
//! Values that legitimately change every frame without re-compilation
//! (matrices, visibility, clip plane positions, outline colour) live in
//! `Cell`s; changing them only requires [`Renderer::set_image_dirty`].
//!
//! [`Renderer::set_image_dirty`]: crate::Renderer::set_image_dirty

mod clips;
mod flags;
mod geometry;
mod lights;
mod material;
mod modes;
mod slots;
mod transform;

pub use clips::{Clip, ClipsState};
pub use flags::{
    Billboard, BillboardState, CullState, LayerState, OutlineState, RenderTargetState,
    StageState, StationaryState, ViewportState, VisibilityState,
};
pub use geometry::{GeometryDesc, GeometryState, PickGeometry};
pub use lights::{LightKind, LightSpace, LightState, LightsState, ShadowDesc};
pub use material::{MapKind, MaterialDesc, MaterialMap, MaterialModel, MaterialState};
pub use modes::{ModesDesc, ModesState};
pub use slots::{HASH_DELIMITER, Slot, StateSlots};
pub use transform::TransformState;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_STATE_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identity of a state object, unique across all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn next() -> Self {
        Self(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminator of a state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Geometry,
    Material,
    Lights,
    Light,
    Modes,
    Clips,
    Transform,
    Viewport,
    Visibility,
    Cull,
    Layer,
    Stage,
    Billboard,
    Stationary,
    Outline,
    RenderTarget,
}

/// Common accessors of every state object.
pub trait StateObject {
    fn id(&self) -> StateId;
    fn kind(&self) -> StateKind;
}

macro_rules! impl_state_object {
    ($ty:ty, $kind:expr) => {
        impl $ty {
            #[inline]
            #[must_use]
            pub fn id(&self) -> $crate::state::StateId {
                self.id
            }
        }

        impl $crate::state::StateObject for $ty {
            #[inline]
            fn id(&self) -> $crate::state::StateId {
                self.id
            }

            #[inline]
            fn kind(&self) -> $crate::state::StateKind {
                $kind
            }
        }
    };
}

pub(crate) use impl_state_object;
