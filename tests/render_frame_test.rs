#![cfg(feature = "integration-tests")]

mod common;

use brush_ngin::{Element, FrameClock, Gpu, Renderer, Space, Viewport, data_structures::texture::Texture};

use crate::common::test_utils::{
    RED, clip_space_triangle, headless_gpu, init_logger, read_back, surface_stand_in,
};

fn render_to(renderer: &mut Renderer, viewport: &Viewport, gpu: &Gpu, target: &Texture) -> bool {
    let time = FrameClock::new().tick();
    viewport.frame(renderer, gpu, &time, &target.view)
}

fn render(renderer: &mut Renderer, viewport: &Viewport, gpu: &Gpu) -> bool {
    let target = surface_stand_in(gpu, viewport.size());
    render_to(renderer, viewport, gpu, &target)
}

fn red_pixels(image: &image::RgbaImage) -> usize {
    image
        .pixels()
        .filter(|pixel| pixel[0] > 200 && pixel[1] < 50 && pixel[2] < 50)
        .count()
}

#[test]
fn a_red_triangle_reaches_the_framebuffer() {
    init_logger();
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let viewport = renderer.create_viewport(64, 64);
    let scene = renderer.create_scene();
    renderer.scene_mut(scene).unwrap().add(clip_space_triangle(RED));
    renderer.set_active_scene(scene);

    assert!(render(&mut renderer, &viewport, &gpu));
    assert!(renderer.is_initialised());
    let data = renderer.viewport_data(viewport.handle()).unwrap();
    let image = futures::executor::block_on(data.framebuffer.read_pixels(&gpu)).unwrap();
    assert_eq!(image.dimensions(), (64, 64));
    assert!(red_pixels(&image) > 0);
    // Corners are outside the triangle and keep the clear colour.
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn nothing_is_drawn_without_an_active_scene() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let viewport = renderer.create_viewport(32, 32);
    assert!(render(&mut renderer, &viewport, &gpu));
    assert!(!renderer.has_viewport_data(viewport.handle()));
    assert!(!renderer.is_initialised());
}

#[test]
fn the_framebuffer_follows_the_viewport_size() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let mut viewport = renderer.create_viewport(40, 30);
    let scene = renderer.create_scene();
    renderer.scene_mut(scene).unwrap().add(clip_space_triangle(RED));
    renderer.set_active_scene(scene);

    render(&mut renderer, &viewport, &gpu);
    let framebuffer = &renderer.viewport_data(viewport.handle()).unwrap().framebuffer;
    assert_eq!(framebuffer.size(), [40, 30]);

    viewport.set_size(100, 20);
    let target = surface_stand_in(&gpu, [100, 20]);
    render_to(&mut renderer, &viewport, &gpu, &target);
    let framebuffer = &renderer.viewport_data(viewport.handle()).unwrap().framebuffer;
    assert_eq!(framebuffer.size(), [100, 20]);

    // The blit copies the resized framebuffer one to one onto the target.
    let blitted = read_back(&gpu, &target);
    let rendered = futures::executor::block_on(framebuffer.read_pixels(&gpu)).unwrap();
    assert_eq!(blitted.dimensions(), (100, 20));
    assert!(red_pixels(&blitted) > 0);
    assert_eq!(blitted, rendered);
}

#[test]
fn an_untracked_scene_is_drawn_on_its_first_render() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let viewport = renderer.create_viewport(16, 16);
    let handle = renderer.create_scene();
    {
        let scene = renderer.scene_mut(handle).unwrap();
        scene.add(clip_space_triangle(RED));
        scene.set_tracking(false);
    }
    renderer.set_active_scene(handle);
    render(&mut renderer, &viewport, &gpu);
    assert_eq!(renderer.scene_data(handle).unwrap().array.vertex_count(), 3);
}

#[test]
fn scene_data_is_created_per_scene_on_first_render() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let viewport = renderer.create_viewport(16, 16);
    let first = renderer.create_scene();
    let second = renderer.create_scene();
    renderer.scene_mut(first).unwrap().add(clip_space_triangle(RED));

    renderer.set_active_scene(first);
    render(&mut renderer, &viewport, &gpu);
    assert!(renderer.has_scene_data(first));
    assert!(!renderer.has_scene_data(second));
    assert_eq!(renderer.scene_data(first).unwrap().array.vertex_count(), 3);

    renderer.set_active_scene(second);
    render(&mut renderer, &viewport, &gpu);
    assert!(renderer.has_scene_data(second));
    assert_eq!(renderer.scene_data(second).unwrap().array.vertex_count(), 0);
    // Switching back keeps the first scene's data.
    assert_eq!(renderer.scene_data(first).unwrap().array.vertex_count(), 3);

    renderer.remove_scene(first);
    assert!(!renderer.has_scene_data(first));
}

#[test]
fn objects_added_before_the_first_render_are_committed() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let viewport = renderer.create_viewport(16, 16);
    let scene = renderer.create_scene();
    {
        let scene = renderer.scene_mut(scene).unwrap();
        scene.add(clip_space_triangle(RED));
        // Consumed before any data existed.
        scene.take_changes();
    }
    renderer.set_active_scene(scene);
    render(&mut renderer, &viewport, &gpu);
    assert_eq!(renderer.scene_data(scene).unwrap().array.vertex_count(), 3);
}

#[test]
fn overlay_elements_are_drawn_over_the_scene() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let mut viewport = renderer.create_viewport(20, 20);
    let scene = renderer.create_scene();
    renderer.set_active_scene(scene);
    viewport.elements_mut().push(Element::Rect {
        min: [0.0, 0.0],
        max: [20.0, 20.0],
        colour: RED,
    });
    viewport.elements_mut().push(Element::Line {
        start: [0.0, 0.0, 0.0],
        end: [1.0, 1.0, 0.0],
        colour: RED,
        space: Space::World,
    });

    render(&mut renderer, &viewport, &gpu);
    let data = renderer.viewport_data(viewport.handle()).unwrap();
    assert_eq!(data.elements.vertex_count(), 8);
    let image = futures::executor::block_on(data.framebuffer.read_pixels(&gpu)).unwrap();
    assert_eq!(red_pixels(&image), 400);
}

#[test]
fn destroyed_viewports_stop_rendering() {
    let gpu = headless_gpu();
    let mut renderer = Renderer::new();
    let mut viewport = renderer.create_viewport(16, 16);
    let scene = renderer.create_scene();
    renderer.set_active_scene(scene);

    assert!(render(&mut renderer, &viewport, &gpu));
    assert!(renderer.has_viewport_data(viewport.handle()));

    renderer.destroy_viewport(&mut viewport);
    assert!(!renderer.has_viewport_data(viewport.handle()));
    assert!(!render(&mut renderer, &viewport, &gpu));
    assert!(!renderer.has_viewport_data(viewport.handle()));
}
