//! Pipeline Stage Tests
//!
//! Tests for:
//! - Dirty-flag cascade (each stage runs only when needed)
//! - No-op frames when nothing changed
//! - Sort order across stage, layer and transparency
//! - Non-visual render objects

mod common;

use std::collections::HashSet;

use glam::Vec3;

use myth_retained::renderer::SortKey;
use myth_retained::state::{LayerState, ModesDesc, StageState};
use myth_retained::{DirtyFlags, ObjectId, RenderParams, StateSlots};

use common::{colored, quad, setup, slots, with_modes};

// ============================================================================
// Dirty flags
// ============================================================================

#[test]
fn fresh_renderer_starts_fully_dirty() {
    let (_, renderer) = setup();
    assert_eq!(renderer.dirty_flags(), DirtyFlags::all());
}

#[test]
fn first_render_runs_every_stage_once() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();

    renderer.render(&mut device, RenderParams::default());

    let stats = *renderer.stats();
    assert_eq!(stats.object_list_builds, 1);
    assert_eq!(stats.state_order_updates, 1);
    assert_eq!(stats.sorts, 1);
    assert_eq!(stats.image_renders, 1);
    assert!(renderer.dirty_flags().is_empty());
}

#[test]
fn second_render_without_changes_draws_nothing() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    for id in 0..3 {
        renderer
            .build_object(&mut device, ObjectId(id), &slots(&geometry))
            .unwrap();
    }
    renderer.render(&mut device, RenderParams::default());
    assert_eq!(device.stats().draw_calls, 3);

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(device.stats().draw_calls, 0);
    assert_eq!(device.stats().clears, 0);
    assert_eq!(renderer.stats().image_renders, 1);
}

#[test]
fn force_redraws_without_rerunning_earlier_stages() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    renderer.render(&mut device, RenderParams::default());

    device.reset_stats();
    renderer.render(
        &mut device,
        RenderParams {
            force: true,
            ..Default::default()
        },
    );

    assert_eq!(device.stats().draw_calls, 1);
    let stats = renderer.stats();
    assert_eq!(stats.image_renders, 2);
    assert_eq!(stats.sorts, 1);
    assert_eq!(stats.object_list_builds, 1);
}

#[test]
fn reranking_never_rebuilds_object_list() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let s = slots(&geometry);
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();
    renderer.build_object(&mut device, ObjectId(2), &s).unwrap();
    renderer.render(&mut device, RenderParams::default());

    // Rebuilding an existing object only re-ranks.
    renderer.build_object(&mut device, ObjectId(2), &s).unwrap();
    assert_eq!(renderer.dirty_flags(), DirtyFlags::STATE_ORDER);
    renderer.render(&mut device, RenderParams::default());

    renderer.set_state_order_dirty();
    renderer.render(&mut device, RenderParams::default());

    let stats = renderer.stats();
    assert_eq!(stats.object_list_builds, 1);
    assert_eq!(stats.state_order_updates, 3);
    assert_eq!(stats.sorts, 3);
    assert_eq!(stats.image_renders, 3);
}

#[test]
fn new_object_rebuilds_object_list() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    renderer.render(&mut device, RenderParams::default());

    renderer
        .build_object(&mut device, ObjectId(2), &slots(&geometry))
        .unwrap();
    assert!(renderer.dirty_flags().contains(DirtyFlags::OBJECT_LIST));
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(renderer.stats().object_list_builds, 2);
    assert_eq!(renderer.draw_order().len(), 2);
}

#[test]
fn image_dirty_redraws_without_sorting() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    renderer.render(&mut device, RenderParams::default());

    renderer.set_image_dirty();
    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(device.stats().draw_calls, 1);
    assert_eq!(renderer.stats().sorts, 1);
    assert_eq!(renderer.stats().image_renders, 2);
}

#[test]
fn removal_rebuilds_object_list() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    for id in 0..3 {
        renderer
            .build_object(&mut device, ObjectId(id), &slots(&geometry))
            .unwrap();
    }
    renderer.render(&mut device, RenderParams::default());

    renderer.remove_object(&mut device, ObjectId(1));
    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(renderer.stats().object_list_builds, 2);
    assert_eq!(device.stats().draw_calls, 2);
    assert!(!renderer.draw_order().contains(&ObjectId(1)));
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn sort_groups_by_stage_layer_then_transparency() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);

    let front_layer = StateSlots {
        layer: LayerState::new(1),
        ..slots(&geometry)
    };
    let late_stage = StateSlots {
        stage: StageState::new(1),
        layer: LayerState::new(-5),
        ..slots(&geometry)
    };
    let glass = with_modes(
        slots(&geometry),
        ModesDesc {
            transparent: true,
            ..Default::default()
        },
    );

    renderer.build_object(&mut device, ObjectId(1), &late_stage).unwrap();
    renderer.build_object(&mut device, ObjectId(2), &front_layer).unwrap();
    renderer.build_object(&mut device, ObjectId(3), &glass).unwrap();
    renderer.build_object(&mut device, ObjectId(4), &slots(&geometry)).unwrap();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(
        renderer.draw_order(),
        vec![ObjectId(4), ObjectId(3), ObjectId(2), ObjectId(1)]
    );
}

#[test]
fn sort_clusters_shared_materials() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let red = colored(&geometry, Vec3::X);
    let green = colored(&geometry, Vec3::Y);

    for id in 0..8 {
        let s = if id % 2 == 0 { &red } else { &green };
        renderer.build_object(&mut device, ObjectId(id), s).unwrap();
    }
    renderer.render(&mut device, RenderParams::default());

    let order = renderer.draw_order();
    let materials: Vec<_> = order
        .iter()
        .map(|id| renderer.object(*id).unwrap().slots().material.id())
        .collect();
    let switches = materials.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(switches, 1);
}

#[test]
fn identical_keys_keep_every_object_exactly_once() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let s = slots(&geometry);

    for id in 0..50 {
        renderer.build_object(&mut device, ObjectId(id), &s).unwrap();
    }
    renderer.render(&mut device, RenderParams::default());
    for id in (0..50).step_by(7) {
        renderer.build_object(&mut device, ObjectId(id), &s).unwrap();
    }
    renderer.render(&mut device, RenderParams::default());

    let order = renderer.draw_order();
    assert_eq!(order.len(), 50);
    let unique: HashSet<_> = order.iter().copied().collect();
    assert_eq!(unique.len(), 50);
}

// ============================================================================
// Non-visual objects
// ============================================================================

#[test]
fn object_without_geometry_has_no_program_and_sorts_first() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);

    renderer
        .build_object(&mut device, ObjectId(1), &slots(&geometry))
        .unwrap();
    renderer
        .build_object(&mut device, ObjectId(2), &StateSlots::default())
        .unwrap();

    let silent = renderer.object(ObjectId(2)).unwrap();
    assert!(silent.hash().is_none());
    assert!(silent.program().is_none());
    assert!(silent.chunks().iter().all(|(_, c)| c.is_none()));

    device.reset_stats();
    renderer.render(&mut device, RenderParams::default());

    assert_eq!(renderer.draw_order(), vec![ObjectId(2), ObjectId(1)]);
    assert_eq!(renderer.object(ObjectId(2)).unwrap().sort_key(), SortKey::NON_VISUAL);
    assert_eq!(device.stats().draw_calls, 1);
    assert_eq!(renderer.program_cache().len(), 1);
}

#[test]
fn losing_geometry_releases_program() {
    let (mut device, mut renderer) = setup();
    let geometry = quad(&mut device, 0.5);
    let mut s = slots(&geometry);
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();

    s.geometry = None;
    renderer.build_object(&mut device, ObjectId(1), &s).unwrap();

    assert!(renderer.program_cache().is_empty());
    assert_eq!(device.live_program_count(), 0);
    assert!(renderer.contains(ObjectId(1)));
}
