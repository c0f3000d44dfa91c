mod common;

use brush_ngin::{Renderer, Space, Element};

use crate::common::test_utils::{RED, clip_space_triangle, init_logger};

#[test]
fn new_scenes_track_changes_and_have_no_data() {
    init_logger();
    let mut renderer = Renderer::new();
    let scene = renderer.create_scene();
    assert!(renderer.scene(scene).unwrap().is_tracking());
    assert!(!renderer.has_scene_data(scene));
    assert_eq!(renderer.active_scene(), None);
}

#[test]
fn removing_a_never_rendered_scene_is_fine() {
    let mut renderer = Renderer::new();
    let scenes: Vec<_> = (0..4).map(|_| renderer.create_scene()).collect();
    renderer.set_active_scene(scenes[2]);
    for scene in &scenes {
        renderer.remove_scene(*scene);
        renderer.remove_scene(*scene);
    }
    assert_eq!(renderer.active_scene(), None);
    assert!(scenes.iter().all(|scene| renderer.scene(*scene).is_none()));
}

#[test]
fn setting_the_active_scene_twice_keeps_it_active() {
    let mut renderer = Renderer::new();
    let scene = renderer.create_scene();
    renderer.set_active_scene(scene);
    renderer.set_active_scene(scene);
    assert_eq!(renderer.active_scene(), Some(scene));
    assert!(!renderer.has_scene_data(scene));
}

#[test]
fn stale_handles_do_not_replace_the_active_scene() {
    let mut renderer = Renderer::new();
    let live = renderer.create_scene();
    let gone = renderer.create_scene();
    renderer.remove_scene(gone);
    renderer.set_active_scene(live);
    renderer.set_active_scene(gone);
    assert_eq!(renderer.active_scene(), Some(live));
    // A handle of a removed scene is never handed out again.
    let fresh = renderer.create_scene();
    assert_ne!(fresh, gone);
    assert!(renderer.scene_mut(gone).is_none());
}

#[test]
fn destroying_a_viewport_twice_is_fine() {
    let mut renderer = Renderer::new();
    let mut viewport = renderer.create_viewport(320, 240);
    assert!(viewport.is_attached());
    renderer.destroy_viewport(&mut viewport);
    renderer.destroy_viewport(&mut viewport);
    assert!(!viewport.is_attached());
    assert!(!renderer.has_viewport_data(viewport.handle()));
}

#[test]
fn scenes_are_edited_through_the_renderer() {
    let mut renderer = Renderer::new();
    let handle = renderer.create_scene();
    let scene = renderer.scene_mut(handle).unwrap();
    let id = scene.add(clip_space_triangle(RED));
    assert!(scene.has_changes());
    assert_eq!(renderer.scene(handle).unwrap().len(), 1);
    assert!(renderer.scene_mut(handle).unwrap().remove(id).is_some());
}

#[test]
fn viewports_keep_their_elements_until_replaced() {
    let mut renderer = Renderer::new();
    let mut viewport = renderer.create_viewport(64, 64);
    viewport.elements_mut().push(Element::Rect {
        min: [0.0, 0.0],
        max: [8.0, 8.0],
        colour: RED,
    });
    viewport.elements_mut().push(Element::Point {
        position: [1.0, 2.0, 3.0],
        colour: RED,
        space: Space::World,
    });
    assert_eq!(viewport.elements().len(), 2);
    viewport.set_size(128, 32);
    assert_eq!(viewport.size(), [128, 32]);
    renderer.destroy_viewport(&mut viewport);
}
