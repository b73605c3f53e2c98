//! Pipeline Stages
//!
//! ```text
//! OBJECT_LIST → rebuild flat object array from the registry → STATE_ORDER
//! STATE_ORDER → recompute every sort key                     → STATE_SORT
//! STATE_SORT  → sort, rebuild shadow / render-target lists   → IMAGE
//! IMAGE       → shadow maps, pre-passes, main pass           → (clean)
//! ```
//!
//! A stage runs only when its flag is set and always sets the next one, so a
//! frame resumes at the earliest dirty stage. `build_object` on a new id sets
//! `OBJECT_LIST`; on an existing id only `STATE_ORDER`.

use std::rc::Rc;

use bitflags::bitflags;

use super::Renderer;
use super::object::{ObjectKey, SortKey};
use crate::state::{LightState, RenderTargetState};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        const OBJECT_LIST = 1 << 0;
        const STATE_ORDER = 1 << 1;
        const STATE_SORT  = 1 << 2;
        const IMAGE       = 1 << 3;
    }
}

/// Shadow casters of one light, in draw order.
#[derive(Debug)]
pub(crate) struct ShadowList {
    pub light: Rc<LightState>,
    pub objects: Vec<ObjectKey>,
}

/// Objects rendered into one off-screen target, in draw order.
#[derive(Debug)]
pub(crate) struct TargetList {
    pub target: Rc<RenderTargetState>,
    pub objects: Vec<ObjectKey>,
}

#[derive(Debug, Default)]
pub(crate) struct Pipeline {
    pub dirty: DirtyFlags,
    /// Sorted flat object array.
    pub objects: Vec<ObjectKey>,
    pub shadow_lists: Vec<ShadowList>,
    pub target_lists: Vec<TargetList>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            dirty: DirtyFlags::all(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn mark(&mut self, flags: DirtyFlags) {
        self.dirty.insert(flags);
    }
}

impl Renderer {
    /// Stages 1–3. Cheap when clean: each stage checks its own flag.
    pub(crate) fn prepare_display(&mut self) {
        self.build_object_list();
        self.update_state_order();
        self.sort_objects();
    }

    fn build_object_list(&mut self) {
        if !self.pipeline.dirty.contains(DirtyFlags::OBJECT_LIST) {
            return;
        }
        self.pipeline.objects.clear();
        self.pipeline.objects.extend(self.registry.keys());
        self.pipeline.dirty.remove(DirtyFlags::OBJECT_LIST);
        self.pipeline.mark(DirtyFlags::STATE_ORDER);
        self.stats.object_list_builds += 1;
    }

    fn update_state_order(&mut self) {
        if !self.pipeline.dirty.contains(DirtyFlags::STATE_ORDER) {
            return;
        }
        for &key in &self.pipeline.objects {
            if let Some(object) = self.registry.by_key_mut(key) {
                object.sort_key = SortKey::for_object(object);
            }
        }
        self.pipeline.dirty.remove(DirtyFlags::STATE_ORDER);
        self.pipeline.mark(DirtyFlags::STATE_SORT);
        self.stats.state_order_updates += 1;
    }

    fn sort_objects(&mut self) {
        if !self.pipeline.dirty.contains(DirtyFlags::STATE_SORT) {
            return;
        }
        let registry = &self.registry;
        self.pipeline.objects.sort_by_key(|&key| {
            registry
                .by_key(key)
                .map_or(SortKey::NON_VISUAL, |o| o.sort_key)
        });

        let mut shadow_lists: Vec<ShadowList> = Vec::new();
        let mut target_lists: Vec<TargetList> = Vec::new();
        for &key in &self.pipeline.objects {
            let Some(object) = registry.by_key(key) else {
                continue;
            };
            if !object.compiled || !object.is_visual() {
                continue;
            }

            if let Some(target) = &object.slots.render_target {
                match target_lists.iter_mut().find(|l| l.target.id() == target.id()) {
                    Some(list) => list.objects.push(key),
                    None => target_lists.push(TargetList {
                        target: Rc::clone(target),
                        objects: vec![key],
                    }),
                }
                continue;
            }

            if !object.slots.modes.cast_shadow() {
                continue;
            }
            for light in object.slots.lights.shadow_casters() {
                match shadow_lists.iter_mut().find(|l| l.light.id() == light.id()) {
                    Some(list) => list.objects.push(key),
                    None => shadow_lists.push(ShadowList {
                        light: Rc::clone(light),
                        objects: vec![key],
                    }),
                }
            }
        }
        self.pipeline.shadow_lists = shadow_lists;
        self.pipeline.target_lists = target_lists;

        self.pipeline.dirty.remove(DirtyFlags::STATE_SORT);
        self.pipeline.mark(DirtyFlags::IMAGE);
        self.stats.sorts += 1;
    }
}
