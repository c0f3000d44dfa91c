mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use brush_ngin::{Bitmap, FrameListener, FrameTime, Renderer, resources::texture::TextureStorage};

use crate::common::test_utils::{StubProvider, init_logger};

#[test]
fn twelve_requests_drain_over_three_frames() {
    init_logger();
    let names: Vec<String> = (0..12).map(|i| format!("tex{i:02}")).collect();
    let mut renderer = Renderer::new();
    renderer.add_texture_provider(StubProvider::new(&names));
    for name in &names {
        renderer.request_texture(name);
    }

    let mut remaining = Vec::new();
    for _ in 0..3 {
        let report = renderer.process_texture_requests();
        assert!(report.drained <= 5);
        remaining.push(renderer.pending_texture_requests());
    }
    assert_eq!(remaining, vec![7, 2, 0]);
    assert_eq!(renderer.textures().len(), 12);
    assert_eq!(renderer.process_texture_requests().drained, 0);
}

#[test]
fn a_name_requested_twice_is_stored_once() {
    let mut renderer = Renderer::new();
    let provider = StubProvider::new(&["AAATRIGGER"]);
    let fetches = provider.fetches.clone();
    let fetched = provider.fetched.clone();
    renderer.add_texture_provider(provider);
    renderer.request_texture("aaatrigger");
    renderer.request_texture("AAATRIGGER");

    let report = renderer.process_texture_requests();
    assert_eq!(report.drained, 2);
    assert_eq!(report.stored, 1);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(fetched.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.textures().len(), 1);

    // Already stored: not fetched again.
    renderer.request_texture("aaatrigger");
    renderer.process_texture_requests();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn unclaimed_names_are_dropped() {
    let mut renderer = Renderer::new();
    renderer.add_texture_provider(StubProvider::new(&["brick"]));
    renderer.request_texture("brick");
    renderer.request_texture("sky");

    let report = renderer.process_texture_requests();
    assert_eq!(report.dropped, vec!["sky".to_string()]);
    assert!(renderer.textures().contains("brick"));
    assert!(!renderer.textures().contains("sky"));
    assert_eq!(renderer.pending_texture_requests(), 0);
}

#[test]
fn names_go_to_the_first_provider_that_has_them() {
    let mut renderer = Renderer::new();
    let first = StubProvider::new(&["shared"]);
    let second = StubProvider::new(&["shared", "own"]);
    let (first_fetched, second_fetched) = (first.fetched.clone(), second.fetched.clone());
    renderer.add_texture_provider(first);
    renderer.add_texture_provider(second);
    renderer.request_texture("shared");
    renderer.request_texture("own");

    renderer.process_texture_requests();
    assert_eq!(first_fetched.load(Ordering::SeqCst), 1);
    assert_eq!(second_fetched.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.textures().len(), 2);
}

#[test]
fn a_failing_provider_drops_its_names() {
    let mut renderer = Renderer::new();
    renderer.add_texture_provider(StubProvider::failing(&["broken"]));
    renderer.request_texture("broken");

    let report = renderer.process_texture_requests();
    assert_eq!(report.stored, 0);
    assert_eq!(report.dropped, vec!["broken".to_string()]);
    assert!(renderer.textures().is_empty());
}

#[test]
fn textures_can_be_requested_from_other_threads() {
    let mut renderer = Renderer::new();
    renderer.add_texture_provider(StubProvider::new(&["a", "b", "c"]));
    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let requester = renderer.texture_requester();
            std::thread::spawn(move || requester.request(name))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(renderer.pending_texture_requests(), 3);
    renderer.process_texture_requests();
    assert_eq!(renderer.textures().len(), 3);
}

#[test]
fn producers_derive_textures_on_every_frame_update() {
    let mut renderer = Renderer::new();
    let viewport = renderer.create_viewport(8, 8);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    renderer.add_texture_producer(move |time: &FrameTime, textures: &mut TextureStorage| {
        counter.fetch_add(1, Ordering::SeqCst);
        let label = format!("label{}", time.frame_index);
        textures.insert(Bitmap::solid(&label, 2, 2, [255, 255, 255, 255]));
    });

    for frame_index in 0..2 {
        let time = FrameTime {
            frame_index,
            ..Default::default()
        };
        renderer.on_update(&viewport, &time);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(renderer.textures().contains("label0"));
    assert!(renderer.textures().contains("label1"));
    // Produced textures bypass the request queue.
    assert_eq!(renderer.pending_texture_requests(), 0);
}
