//! Viewports and the per-frame callback wiring.
//!
//! A [`Viewport`] is one rendered view of the active scene: a size, a camera
//! and a list of overlay [`Element`]s. The host loop owns a [`FrameClock`]
//! and calls [`Viewport::frame`] once per frame, which forwards to a
//! [`FrameListener`] (normally the renderer) for as long as the viewport is
//! attached.

use instant::{Duration, Instant};

use crate::{arrays::elements::Element, camera::Camera, context::Gpu, renderer::ViewportHandle};

/// Frame timing snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Time since the clock started.
    pub elapsed: Duration,
    /// Time since the previous frame.
    pub dt: Duration,
    pub frame_index: u64,
}

/// Produces monotonic [`FrameTime`]s.
///
/// `dt` is clamped so a stall (debugger, minimised window) does not make
/// animations jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_max: Duration::from_millis(250),
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last).min(self.dt_max);
        self.last = now;
        let time = FrameTime {
            elapsed: now.saturating_duration_since(self.start),
            dt,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives the per-frame callbacks of a viewport.
pub trait FrameListener {
    fn on_update(&mut self, viewport: &Viewport, time: &FrameTime);
    fn on_render(&mut self, gpu: &Gpu, viewport: &Viewport, target: &wgpu::TextureView);
}

#[derive(Debug)]
pub struct Viewport {
    handle: ViewportHandle,
    size: [u32; 2],
    camera: Camera,
    elements: Vec<Element>,
    attached: bool,
}

impl Viewport {
    pub(crate) fn new(handle: ViewportHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            size: [width, height],
            camera: Camera::identity(),
            elements: Vec::new(),
            attached: true,
        }
    }

    pub fn handle(&self) -> ViewportHandle {
        self.handle
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// The framebuffer follows on the next rendered frame.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = [width, height];
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Overlay elements drawn on the next frame. Not cleared automatically.
    pub fn elements_mut(&mut self) -> &mut Vec<Element> {
        &mut self.elements
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    /// Run one frame: update, then render into `target`.
    ///
    /// Returns `false` without calling `listener` once the viewport was destroyed.
    pub fn frame(
        &self,
        listener: &mut impl FrameListener,
        gpu: &Gpu,
        time: &FrameTime,
        target: &wgpu::TextureView,
    ) -> bool {
        if !self.attached {
            return false;
        }
        listener.on_update(self, time);
        listener.on_render(gpu, self, target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let mut clock = FrameClock::new();
        let first = clock.tick();
        let second = clock.tick();
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!(second.elapsed >= first.elapsed);
        assert!(second.dt <= Duration::from_millis(250));
    }
}
