use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use smallvec::SmallVec;

use super::{StateId, StateKind, impl_state_object};

/// A user clipping plane; fragments on the `direction` side are discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub active: bool,
    pub position: Vec3,
    pub direction: Vec3,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            active: true,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        }
    }
}

/// Clipping planes. Only the count shapes the shader; plane values can be
/// moved in place.
#[derive(Debug)]
pub struct ClipsState {
    id: StateId,
    hash: String,
    clips: SmallVec<[Cell<Clip>; 4]>,
}

impl_state_object!(ClipsState, StateKind::Clips);

impl ClipsState {
    #[must_use]
    pub fn new(clips: impl IntoIterator<Item = Clip>) -> Rc<Self> {
        let clips: SmallVec<[Cell<Clip>; 4]> = clips.into_iter().map(Cell::new).collect();
        Rc::new(Self {
            id: StateId::next(),
            hash: format!("c:{}", clips.len()),
            clips,
        })
    }

    #[must_use]
    pub fn empty() -> Rc<Self> {
        Self::new([])
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Clip> {
        self.clips.get(index).map(Cell::get)
    }

    /// Moves a plane. Returns `false` if `index` is out of range.
    pub fn set(&self, index: usize, clip: Clip) -> bool {
        match self.clips.get(index) {
            Some(cell) => {
                cell.set(clip);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Clip> + '_ {
        self.clips.iter().map(Cell::get)
    }
}
