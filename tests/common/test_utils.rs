#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use brush_ngin::{Bitmap, Face, TextureProvider};

pub(crate) const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A counter-clockwise triangle in the z = 0.5 plane, inside the clip volume
/// of the identity camera.
pub(crate) fn clip_space_triangle(colour: [f32; 4]) -> Face {
    Face::new(
        vec![[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.0, 0.5, 0.5]],
        colour,
    )
}

pub(crate) fn quad_at(x: f32, y: f32, size: f32) -> Face {
    Face::new(
        vec![
            [x, y, 0.0],
            [x + size, y, 0.0],
            [x + size, y + size, 0.0],
            [x, y + size, 0.0],
        ],
        RED,
    )
}

/// Claims names from a fixed list and serves solid bitmaps. Counts calls.
pub(crate) struct StubProvider {
    names: Vec<String>,
    pub(crate) fetches: Arc<AtomicUsize>,
    pub(crate) fetched: Arc<AtomicUsize>,
    fail: bool,
}

impl StubProvider {
    pub(crate) fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_ascii_lowercase()).collect(),
            fetches: Arc::new(AtomicUsize::new(0)),
            fetched: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub(crate) fn failing<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            fail: true,
            ..Self::new(names)
        }
    }
}

impl TextureProvider for StubProvider {
    fn exists(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn fetch(&mut self, names: &[String]) -> anyhow::Result<Vec<Bitmap>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("package is corrupt");
        }
        self.fetched.fetch_add(names.len(), Ordering::SeqCst);
        Ok(names
            .iter()
            .map(|name| Bitmap::solid(name, 4, 4, [0, 255, 0, 255]))
            .collect())
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) fn headless_gpu() -> brush_ngin::Gpu {
    futures::executor::block_on(brush_ngin::Gpu::headless(wgpu::TextureFormat::Rgba8UnormSrgb))
        .expect("integration tests need a GPU adapter")
}

/// A texture to render into, standing in for a window surface. It can be
/// read back, unlike a real surface.
#[cfg(feature = "integration-tests")]
pub(crate) fn surface_stand_in(
    gpu: &brush_ngin::Gpu,
    size: [u32; 2],
) -> brush_ngin::data_structures::texture::Texture {
    brush_ngin::data_structures::texture::Texture::create_render_target(
        &gpu.device,
        size,
        gpu.format,
        "surface stand-in",
    )
}

#[cfg(feature = "integration-tests")]
pub(crate) fn read_back(
    gpu: &brush_ngin::Gpu,
    texture: &brush_ngin::data_structures::texture::Texture,
) -> image::RgbaImage {
    futures::executor::block_on(texture.read_pixels(gpu)).expect("texture readback failed")
}
