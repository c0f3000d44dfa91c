//! Renderer tunables.

use crate::data_structures::bounds::Aabb;

/// Configuration handed to [`crate::renderer::Renderer::with_config`].
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Maximum number of queued texture names resolved per rendered frame.
    pub texture_batch_size: usize,
    pub clear_colour: wgpu::Color,
    /// Root bounds of every scene's octree. Geometry outside still renders,
    /// it just is not partitioned.
    pub world_bounds: Aabb,
    /// Octree nodes never subdivide into children smaller than this edge length.
    pub octree_cell_size: f32,
    pub cull_back_faces: bool,
    pub frustum_culling: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            texture_batch_size: 5,
            clear_colour: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            world_bounds: Aabb::cube(16384.0),
            octree_cell_size: 1024.0,
            cull_back_faces: true,
            frustum_culling: true,
        }
    }
}
