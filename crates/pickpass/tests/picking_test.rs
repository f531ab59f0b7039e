//! End-to-end picking through the software backend.

mod common;

use std::sync::Arc;

use common::{lit_node, lit_node_with_id, run_until_frame, SoftwareBackend, SoftwareView};
use pickpass::*;

const VIEWPORT: UVec2 = UVec2::new(800, 600);

fn center_quad(backend: &mut SoftwareBackend, node: &SceneNode, depth: f32) {
    backend.add_quad(
        Arc::clone(&node.surfaces()[0]),
        Vec2::new(0.25, 0.25),
        Vec2::new(0.75, 0.75),
        depth,
    );
}

#[test]
fn test_pick_resolves_object_under_cursor() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let node = lit_node_with_id(42, "cube");
    let mut pickable = system.make_pickable(node.clone()).unwrap();
    assert_eq!(pickable.state(), PickableState::Active(42));

    // Id 42 is tagged onto the surface as (0, 0, 0, 42).
    let tagged = node.surfaces()[0].property_block().id_color();
    assert_eq!(tagged, Some(IdColor([0, 0, 0, 42])));

    let mut backend = SoftwareBackend::new();
    center_quad(&mut backend, &node, 0.5);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);

    let hit = surface.pick_at(Vec2::new(400.0, 300.0)).expect("cube under cursor");
    assert_eq!(hit.instance_id(), 42);
    assert_eq!(hit.name(), "cube");
    assert_eq!(surface.id_at(Vec2::new(400.0, 300.0)), Some(42));

    assert!(surface.pick_at(Vec2::new(10.0, 10.0)).is_none());
    assert!(surface.pick_at(Vec2::new(790.0, 590.0)).is_none());

    pickable.disable();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);
    assert!(surface.pick_at(Vec2::new(400.0, 300.0)).is_none());
}

#[test]
fn test_nearest_surface_wins() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let back = lit_node("back");
    let front = lit_node("front");
    let _back_pickable = system.make_pickable(back.clone()).unwrap();
    let _front_pickable = system.make_pickable(front.clone()).unwrap();

    let mut backend = SoftwareBackend::new();
    backend.add_quad(
        Arc::clone(&back.surfaces()[0]),
        Vec2::ZERO,
        Vec2::ONE,
        0.8,
    );
    center_quad(&mut backend, &front, 0.2);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);

    let center = surface.pick_at(Vec2::new(400.0, 300.0)).unwrap();
    let edge = surface.pick_at(Vec2::new(20.0, 20.0)).unwrap();
    assert_eq!(center.instance_id(), front.instance_id());
    assert_eq!(edge.instance_id(), back.instance_id());
}

#[test]
fn test_untagged_surfaces_do_not_occlude() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let target = lit_node("target");
    let decoration = lit_node("decoration");
    let _pickable = system.make_pickable(target.clone()).unwrap();

    let mut backend = SoftwareBackend::new();
    center_quad(&mut backend, &target, 0.9);
    center_quad(&mut backend, &decoration, 0.1);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);

    let hit = surface.pick_at(Vec2::new(400.0, 300.0)).unwrap();
    assert_eq!(hit.instance_id(), target.instance_id());
}

#[test]
fn test_dropping_pickable_unregisters() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let node = lit_node("temp");
    let pickable = system.make_pickable(node.clone()).unwrap();

    let mut backend = SoftwareBackend::new();
    center_quad(&mut backend, &node, 0.5);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);
    assert!(surface.pick_at(Vec2::new(400.0, 300.0)).is_some());

    drop(pickable);
    // The frame still carries the id, but it no longer resolves.
    assert_eq!(surface.id_at(Vec2::new(400.0, 300.0)), Some(node.instance_id()));
    assert!(surface.pick_at(Vec2::new(400.0, 300.0)).is_none());
}

#[test]
fn test_resize_recreates_target_and_discards_frame() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let node = lit_node("cube");
    let _pickable = system.make_pickable(node.clone()).unwrap();

    let mut backend = SoftwareBackend::new();
    center_quad(&mut backend, &node, 0.5);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();

    run_until_frame(&mut surface, &mut backend, UVec2::new(800, 600));
    assert_eq!(surface.target_size(), UVec2::new(200, 150));
    assert!(surface.pick_at(Vec2::new(400.0, 300.0)).is_some());

    surface.frame(&mut backend, UVec2::new(1600, 1200)).unwrap();
    assert_eq!(surface.target_size(), UVec2::new(400, 300));
    assert_eq!(
        backend.targets_created,
        vec![UVec2::new(200, 150), UVec2::new(400, 300)]
    );
    // The old frame was discarded and the new one has not arrived yet.
    assert!(!surface.has_frame());
    assert!(surface.pick_at(Vec2::new(800.0, 600.0)).is_none());

    run_until_frame(&mut surface, &mut backend, UVec2::new(1600, 1200));
    assert_eq!(surface.latest_frame().unwrap().size(), UVec2::new(400, 300));
    assert!(surface.pick_at(Vec2::new(800.0, 600.0)).is_some());
}

#[test]
fn test_one_transfer_in_flight_under_latency() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let mut backend = SoftwareBackend::new();
    backend.latency = 3;
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();

    for _ in 0..4 {
        surface.frame(&mut backend, VIEWPORT).unwrap();
        assert!(surface.is_transfer_pending());
        assert_eq!(backend.readbacks_requested, 1);
    }
    assert_eq!(surface.frames_received(), 0);

    // Fourth poll of the first readback completes it; the next one starts.
    surface.frame(&mut backend, VIEWPORT).unwrap();
    assert_eq!(surface.frames_received(), 1);
    assert_eq!(backend.readbacks_requested, 2);
    assert_eq!(backend.renders, 5);
}

#[test]
fn test_failed_transfer_keeps_previous_frame() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let node = lit_node("cube");
    let _pickable = system.make_pickable(node.clone()).unwrap();

    let mut backend = SoftwareBackend::new();
    center_quad(&mut backend, &node, 0.5);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);
    let received = surface.frames_received();
    let previous = surface.latest_frame().unwrap();

    // The readback already in flight completes; the one requested after it fails.
    backend.fail_next = true;
    surface.frame(&mut backend, VIEWPORT).unwrap();
    let after_success = surface.latest_frame().unwrap();
    surface.frame(&mut backend, VIEWPORT).unwrap();

    assert_eq!(surface.frames_received(), received + 1);
    assert!(Arc::ptr_eq(&after_success, &surface.latest_frame().unwrap()));
    assert!(!Arc::ptr_eq(&previous, &after_success));
    assert!(surface.is_transfer_pending());
    assert!(surface.pick_at(Vec2::new(400.0, 300.0)).is_some());
}

#[test]
fn test_view_state_is_restored_after_id_pass() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let mut backend = SoftwareBackend::new();
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();

    surface.frame(&mut backend, VIEWPORT).unwrap();

    assert_eq!(backend.renders, 1);
    assert_eq!(backend.view, SoftwareView::default());
}

#[test]
fn test_unsafe_id_pass_is_rejected() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let mut backend = SoftwareBackend::new();
    let mut surface = system
        .create_surface::<SoftwareBackend>()
        .unwrap()
        .with_id_pass_settings(IdPassSettings {
            blending: true,
            ..IdPassSettings::default()
        });

    let result = surface.frame(&mut backend, VIEWPORT);

    assert!(matches!(result, Err(PickError::UnsafeIdPass(_))));
    assert_eq!(backend.renders, 0);
    assert!(!surface.has_frame());
}

#[test]
fn test_descendant_surfaces_pick_the_root() {
    let system = PickingSystem::new(PickingOptions::default()).unwrap();
    let root = lit_node("robot");
    let arm = lit_node("arm");
    root.add_child(arm.clone());
    let _pickable = system.make_pickable(root.clone()).unwrap();

    let mut backend = SoftwareBackend::new();
    center_quad(&mut backend, &arm, 0.5);
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
    run_until_frame(&mut surface, &mut backend, VIEWPORT);

    let hit = surface.pick_at(Vec2::new(400.0, 300.0)).unwrap();
    assert_eq!(hit.instance_id(), root.instance_id());
}

#[test]
fn test_downscale_from_json() {
    let system = PickingSystem::from_json(r#"{ "downscale": 2 }"#).unwrap();
    let mut backend = SoftwareBackend::new();
    let mut surface = system.create_surface::<SoftwareBackend>().unwrap();

    surface.frame(&mut backend, VIEWPORT).unwrap();

    assert_eq!(surface.target_size(), UVec2::new(400, 300));
    assert!(matches!(
        PickingSystem::from_json(r#"{ "downscale": 0 }"#),
        Err(PickError::InvalidDownscale(0))
    ));
}

mod ids {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_instance_id_round_trips_through_the_frame(id in 1u32..) {
            let system = PickingSystem::new(PickingOptions::default().with_downscale(8)).unwrap();
            let node = lit_node_with_id(id, "any");
            let _pickable = system.make_pickable(node.clone()).unwrap();

            let mut backend = SoftwareBackend::new();
            center_quad(&mut backend, &node, 0.5);
            let mut surface = system.create_surface::<SoftwareBackend>().unwrap();
            run_until_frame(&mut surface, &mut backend, UVec2::new(64, 64));

            prop_assert_eq!(surface.id_at(Vec2::new(32.0, 32.0)), Some(id));
            let hit = surface.pick_at(Vec2::new(32.0, 32.0)).unwrap();
            prop_assert_eq!(hit.instance_id(), id);
        }
    }
}
