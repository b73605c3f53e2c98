use std::rc::Rc;

use super::{StateId, StateKind, impl_state_object};
use crate::gpu::FrontFace;

/// Rendering mode switches of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModesDesc {
    pub transparent: bool,
    /// Draw back faces too (disables face culling).
    pub back_faces: bool,
    pub front_face: FrontFace,
    pub pickable: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub clippable: bool,
    pub outlined: bool,
}

impl Default for ModesDesc {
    fn default() -> Self {
        Self {
            transparent: false,
            back_faces: false,
            front_face: FrontFace::Ccw,
            pickable: true,
            cast_shadow: true,
            receive_shadow: true,
            clippable: true,
            outlined: false,
        }
    }
}

#[derive(Debug)]
pub struct ModesState {
    id: StateId,
    hash: String,
    desc: ModesDesc,
}

impl_state_object!(ModesState, StateKind::Modes);

impl ModesState {
    #[must_use]
    pub fn new(desc: ModesDesc) -> Rc<Self> {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        let hash = format!(
            "o:{}{}{}",
            flag(desc.transparent, 't'),
            flag(desc.receive_shadow, 'r'),
            flag(desc.clippable, 'c'),
        );
        Rc::new(Self {
            id: StateId::next(),
            hash,
            desc,
        })
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &ModesDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn transparent(&self) -> bool {
        self.desc.transparent
    }

    #[inline]
    #[must_use]
    pub fn outlined(&self) -> bool {
        self.desc.outlined
    }

    #[inline]
    #[must_use]
    pub fn pickable(&self) -> bool {
        self.desc.pickable
    }

    #[inline]
    #[must_use]
    pub fn cast_shadow(&self) -> bool {
        self.desc.cast_shadow
    }
}
