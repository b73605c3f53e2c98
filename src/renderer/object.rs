//! Render Objects
//!
//! One [`RenderObject`] per built entity: the slot snapshot it was built
//! from, its composed hash, the shared program, the chunk array and the
//! derived [`SortKey`].

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use super::chunk::{Chunk, SlotArray};
use super::program::Program;
use crate::state::StateSlots;

/// Stable identifier of a render object, chosen by the owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl From<u64> for ObjectId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ─── SortKey ─────────────────────────────────────────────────────────────────

/// Ascending draw order of render objects.
///
/// Weighted sum, most significant first:
///
/// | Term          | Range              | Weight   |
/// |---------------|--------------------|----------|
/// | stage         | `[-999, 999] + 1000` | `10^34` |
/// | layer         | `[-499, 499] + 500`  | `10^31` |
/// | transparency  | `1` opaque, `2` transparent | `10^30` |
/// | program id    | `< 10^10`          | `10^20`  |
/// | material id   | `< 10^10`          | `10^10`  |
/// | geometry id   | `< 10^10`          | `1`      |
///
/// Every term stays below the weight of the next one, so no term can carry
/// into a more significant position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortKey(pub i128);

impl SortKey {
    /// Objects without a program sort first and are never drawn.
    pub const NON_VISUAL: Self = Self(-1);

    const STAGE_WEIGHT: i128 = 10i128.pow(34);
    const LAYER_WEIGHT: i128 = 10i128.pow(31);
    const TRANSPARENCY_WEIGHT: i128 = 10i128.pow(30);
    const PROGRAM_WEIGHT: i128 = 10i128.pow(20);
    const MATERIAL_WEIGHT: i128 = 10i128.pow(10);

    #[must_use]
    pub fn compose(
        stage: i32,
        layer: i32,
        transparent: bool,
        program: u32,
        material: u32,
        geometry: u32,
    ) -> Self {
        let stage = i128::from(stage.clamp(-999, 999) + 1000);
        let layer = i128::from(layer.clamp(-499, 499) + 500);
        let transparency = if transparent { 2 } else { 1 };
        Self(
            stage * Self::STAGE_WEIGHT
                + layer * Self::LAYER_WEIGHT
                + transparency * Self::TRANSPARENCY_WEIGHT
                + i128::from(program) * Self::PROGRAM_WEIGHT
                + i128::from(material) * Self::MATERIAL_WEIGHT
                + i128::from(geometry),
        )
    }

    /// Key of a built object.
    #[must_use]
    pub fn for_object(object: &RenderObject) -> Self {
        let (Some(program), Some(geometry)) = (&object.program, &object.slots.geometry) else {
            return Self::NON_VISUAL;
        };
        let slots = &object.slots;
        Self::compose(
            slots.stage.priority(),
            slots.layer.priority(),
            slots.modes.transparent(),
            program.id().get(),
            slots.material.id().get(),
            geometry.id().get(),
        )
    }
}

// ─── RenderObject ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RenderObject {
    pub(crate) id: ObjectId,
    pub(crate) slots: StateSlots,
    pub(crate) hash: Option<String>,
    pub(crate) program: Option<Rc<Program>>,
    pub(crate) chunks: SlotArray<Option<Rc<Chunk>>>,
    pub(crate) sort_key: SortKey,
    pub(crate) compiled: bool,
}

impl RenderObject {
    pub(crate) fn new(id: ObjectId, slots: StateSlots) -> Self {
        Self {
            id,
            slots,
            hash: None,
            program: None,
            chunks: SlotArray::default(),
            sort_key: SortKey::NON_VISUAL,
            compiled: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn slots(&self) -> &StateSlots {
        &self.slots
    }

    /// Composed program hash; `None` for non-visual objects.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    #[must_use]
    pub fn program(&self) -> Option<&Rc<Program>> {
        self.program.as_ref()
    }

    #[must_use]
    pub fn chunks(&self) -> &SlotArray<Option<Rc<Chunk>>> {
        &self.chunks
    }

    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    #[inline]
    #[must_use]
    pub fn compiled(&self) -> bool {
        self.compiled
    }

    /// Has a program and chunks to run.
    #[must_use]
    pub fn is_visual(&self) -> bool {
        self.program.is_some()
    }

    /// Would be drawn by the main pass this frame.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.compiled
            && self.is_visual()
            && self.slots.visibility.visible()
            && !self.slots.cull.culled()
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.slots.modes.transparent()
    }

    #[must_use]
    pub fn is_outlined(&self) -> bool {
        self.slots.modes.outlined()
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

new_key_type! {
    /// Dense handle of a registered render object.
    pub(crate) struct ObjectKey;
}

/// `ObjectId` → render object map with stable dense keys for the draw list.
#[derive(Debug, Default)]
pub(crate) struct ObjectRegistry {
    objects: SlotMap<ObjectKey, RenderObject>,
    index: FxHashMap<ObjectId, ObjectKey>,
}

impl ObjectRegistry {
    pub fn key(&self, id: ObjectId) -> Option<ObjectKey> {
        self.index.get(&id).copied()
    }

    pub fn insert(&mut self, object: RenderObject) -> ObjectKey {
        let id = object.id;
        let key = self.objects.insert(object);
        self.index.insert(id, key);
        key
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<RenderObject> {
        let key = self.index.remove(&id)?;
        self.objects.remove(key)
    }

    pub fn get(&self, id: ObjectId) -> Option<&RenderObject> {
        self.objects.get(self.key(id)?)
    }

    #[inline]
    pub fn by_key(&self, key: ObjectKey) -> Option<&RenderObject> {
        self.objects.get(key)
    }

    #[inline]
    pub fn by_key_mut(&mut self, key: ObjectKey) -> Option<&mut RenderObject> {
        self.objects.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.objects.keys()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_dominates_every_other_term() {
        let low = SortKey::compose(0, 499, true, u32::MAX, u32::MAX, u32::MAX);
        let high = SortKey::compose(1, -499, false, 0, 0, 0);
        assert!(low < high);
    }

    #[test]
    fn layer_dominates_transparency_and_ids() {
        let low = SortKey::compose(0, 0, true, u32::MAX, u32::MAX, u32::MAX);
        let high = SortKey::compose(0, 1, false, 0, 0, 0);
        assert!(low < high);
    }

    #[test]
    fn transparent_sorts_after_opaque() {
        let opaque = SortKey::compose(0, 0, false, u32::MAX, u32::MAX, u32::MAX);
        let transparent = SortKey::compose(0, 0, true, 0, 0, 0);
        assert!(opaque < transparent);
    }

    #[test]
    fn ids_are_ordered_program_material_geometry() {
        let a = SortKey::compose(0, 0, false, 1, u32::MAX, u32::MAX);
        let b = SortKey::compose(0, 0, false, 2, 0, 0);
        assert!(a < b);
        let c = SortKey::compose(0, 0, false, 1, 1, u32::MAX);
        let d = SortKey::compose(0, 0, false, 1, 2, 0);
        assert!(c < d);
    }

    #[test]
    fn layer_and_stage_are_clamped() {
        assert_eq!(
            SortKey::compose(5000, 5000, false, 0, 0, 0),
            SortKey::compose(999, 499, false, 0, 0, 0)
        );
        assert!(SortKey::compose(i32::MIN, i32::MIN, false, 0, 0, 0) > SortKey::NON_VISUAL);
    }
}
