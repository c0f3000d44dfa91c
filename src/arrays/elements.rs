//! Transient overlay primitives drawn on top of the scene.
//!
//! Elements are cheap: the array is rebuilt from scratch every frame instead
//! of being diffed. World-space elements are transformed by the viewport
//! camera in the shader; screen-space elements and handles are converted to
//! clip space here and drawn with an identity camera.

use cgmath::Point3;
use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    context::Gpu,
    data_structures::vertex::SceneVertex,
    render::{Batch, BatchBuilder, DrawContext, Topology},
};

/// Coordinate space of an element. Screen space is pixels, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Space {
    #[default]
    World,
    Screen,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Line {
        start: [f32; 3],
        end: [f32; 3],
        colour: [f32; 4],
        space: Space,
    },
    /// A square of fixed pixel size centred on a world position.
    Handle {
        position: [f32; 3],
        size_px: f32,
        colour: [f32; 4],
    },
    /// A filled screen rectangle, in pixels.
    Rect {
        min: [f32; 2],
        max: [f32; 2],
        colour: [f32; 4],
    },
    Point {
        position: [f32; 3],
        colour: [f32; 4],
        space: Space,
    },
}

#[derive(Debug, Default)]
struct Layer {
    vertices: Vec<SceneVertex>,
    batches: Vec<Batch>,
    buffer: Option<wgpu::Buffer>,
}

impl Layer {
    fn set(&mut self, builder: BatchBuilder) {
        let (vertices, batches) = builder.finish();
        self.vertices = vertices;
        self.batches = batches;
        self.buffer = None;
    }

    fn upload(&mut self, gpu: &Gpu, label: &str) {
        self.buffer = (!self.vertices.is_empty()).then(|| {
            gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }
}

#[derive(Debug, Default)]
pub struct ElementArray {
    world: Layer,
    screen: Layer,
}

impl ElementArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the vertex data from `elements` for a viewport of `size` pixels.
    pub fn build(&mut self, elements: &[Element], camera: &Camera, size: [u32; 2]) {
        let mut world = BatchBuilder::new();
        let mut screen = BatchBuilder::new();
        let to_clip = |x: f32, y: f32| {
            [
                x / size[0].max(1) as f32 * 2.0 - 1.0,
                1.0 - y / size[1].max(1) as f32 * 2.0,
                0.0,
            ]
        };
        for element in elements {
            match *element {
                Element::Line {
                    start,
                    end,
                    colour,
                    space: Space::World,
                } => world.push(
                    Topology::Lines,
                    None,
                    [
                        SceneVertex::coloured(start, colour),
                        SceneVertex::coloured(end, colour),
                    ],
                ),
                Element::Line {
                    start,
                    end,
                    colour,
                    space: Space::Screen,
                } => screen.push(
                    Topology::Lines,
                    None,
                    [
                        SceneVertex::coloured(to_clip(start[0], start[1]), colour),
                        SceneVertex::coloured(to_clip(end[0], end[1]), colour),
                    ],
                ),
                Element::Point {
                    position,
                    colour,
                    space: Space::World,
                } => world.push(Topology::Points, None, [SceneVertex::coloured(position, colour)]),
                Element::Point {
                    position,
                    colour,
                    space: Space::Screen,
                } => screen.push(
                    Topology::Points,
                    None,
                    [SceneVertex::coloured(to_clip(position[0], position[1]), colour)],
                ),
                Element::Handle {
                    position,
                    size_px,
                    colour,
                } => {
                    let Some([x, y]) = camera.world_to_screen(Point3::from(position), size) else {
                        continue;
                    };
                    let half = size_px * 0.5;
                    screen.push(
                        Topology::Triangles,
                        None,
                        quad([x - half, y - half], [x + half, y + half], colour, &to_clip),
                    );
                }
                Element::Rect { min, max, colour } => {
                    screen.push(Topology::Triangles, None, quad(min, max, colour, &to_clip))
                }
            }
        }
        self.world.set(world);
        self.screen.set(screen);
    }

    /// Rebuild and upload.
    pub fn update(&mut self, gpu: &Gpu, elements: &[Element], camera: &Camera, size: [u32; 2]) {
        self.build(elements, camera, size);
        self.world.upload(gpu, "world elements");
        self.screen.upload(gpu, "screen elements");
    }

    pub fn vertex_count(&self) -> usize {
        self.world.vertices.len() + self.screen.vertices.len()
    }

    /// Vertices of screen-space elements and handles, already in clip space.
    pub fn screen_vertices(&self) -> &[SceneVertex] {
        &self.screen.vertices
    }

    pub fn world_vertices(&self) -> &[SceneVertex] {
        &self.world.vertices
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        if let Some(buffer) = &self.world.buffer {
            pass.set_bind_group(0, ctx.camera, &[]);
            ctx.draw_batches(pass, buffer, &self.world.batches, true);
        }
        if let Some(buffer) = &self.screen.buffer {
            pass.set_bind_group(0, ctx.identity_camera, &[]);
            ctx.draw_batches(pass, buffer, &self.screen.batches, true);
        }
    }
}

/// Two counter-clockwise triangles covering a pixel rectangle.
fn quad(
    min: [f32; 2],
    max: [f32; 2],
    colour: [f32; 4],
    to_clip: &impl Fn(f32, f32) -> [f32; 3],
) -> [SceneVertex; 6] {
    let top_left = SceneVertex::coloured(to_clip(min[0], min[1]), colour);
    let top_right = SceneVertex::coloured(to_clip(max[0], min[1]), colour);
    let bottom_left = SceneVertex::coloured(to_clip(min[0], max[1]), colour);
    let bottom_right = SceneVertex::coloured(to_clip(max[0], max[1]), colour);
    [
        top_left,
        bottom_left,
        bottom_right,
        top_left,
        bottom_right,
        top_right,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    #[test]
    fn screen_lines_are_converted_to_clip_space() {
        let mut array = ElementArray::new();
        array.build(
            &[Element::Line {
                start: [0.0, 0.0, 0.0],
                end: [200.0, 100.0, 0.0],
                colour: RED,
                space: Space::Screen,
            }],
            &Camera::identity(),
            [200, 100],
        );
        let vertices = array.screen_vertices();
        assert_eq!(vertices[0].position, [-1.0, 1.0, 0.0]);
        assert_eq!(vertices[1].position, [1.0, -1.0, 0.0]);
        assert!(array.world_vertices().is_empty());
    }

    #[test]
    fn handles_become_pixel_sized_quads() {
        let mut array = ElementArray::new();
        array.build(
            &[Element::Handle {
                position: [0.0, 0.0, 0.5],
                size_px: 10.0,
                colour: RED,
            }],
            &Camera::identity(),
            [100, 100],
        );
        let vertices = array.screen_vertices();
        assert_eq!(vertices.len(), 6);
        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        let width = xs.iter().cloned().fold(f32::MIN, f32::max) - xs.iter().cloned().fold(f32::MAX, f32::min);
        // 10px of a 100px viewport is a tenth of the 2-unit clip range.
        assert!((width - 0.2).abs() < 1e-5);
    }

    #[test]
    fn world_elements_keep_world_coordinates() {
        let mut array = ElementArray::new();
        let elements = vec![
            Element::Point {
                position: [64.0, 32.0, 0.0],
                colour: RED,
                space: Space::World,
            },
            Element::Rect {
                min: [0.0, 0.0],
                max: [10.0, 10.0],
                colour: RED,
            },
        ];
        array.build(&elements, &Camera::identity(), [640, 480]);
        assert_eq!(array.world_vertices()[0].position, [64.0, 32.0, 0.0]);
        assert_eq!(array.vertex_count(), 7);
        array.build(&[], &Camera::identity(), [640, 480]);
        assert_eq!(array.vertex_count(), 0);
    }
}
