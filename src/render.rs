//! Draw batching shared by the scene and overlay vertex arrays.
//!
//! Vertices are grouped by [`Topology`] and material so that one vertex
//! buffer can be drawn with as few pipeline and bind group switches as
//! possible. A [`DrawContext`] carries everything a draw needs for one frame.
//!
//! # Key types
//!
//! - [`BatchBuilder`] collects vertices per (topology, material) group
//! - [`Batch`] is a contiguous vertex range drawn with one pipeline and texture
//! - [`DrawContext`] borrows pipelines, storages and the camera for a frame

use std::collections::BTreeMap;
use std::ops::Range;

use crate::{
    camera::Frustum,
    data_structures::vertex::SceneVertex,
    pipelines::Pipelines,
    resources::{material::MaterialStorage, model::ModelStorage, texture::TextureStorage},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topology {
    Triangles,
    Lines,
    Points,
}

/// A vertex range drawn with one pipeline and one texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub topology: Topology,
    pub material: Option<String>,
    pub range: Range<u32>,
}

#[derive(Debug, Default)]
pub struct BatchBuilder {
    groups: BTreeMap<(Topology, Option<String>), Vec<SceneVertex>>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        topology: Topology,
        material: Option<&str>,
        vertices: impl IntoIterator<Item = SceneVertex>,
    ) {
        self.groups
            .entry((topology, material.map(str::to_string)))
            .or_default()
            .extend(vertices);
    }

    /// Concatenate the groups into one vertex list. Empty groups yield no batch.
    pub fn finish(self) -> (Vec<SceneVertex>, Vec<Batch>) {
        let mut vertices = Vec::new();
        let mut batches = Vec::with_capacity(self.groups.len());
        for ((topology, material), group) in self.groups {
            if group.is_empty() {
                continue;
            }
            let start = vertices.len() as u32;
            vertices.extend(group);
            batches.push(Batch {
                topology,
                material,
                range: start..vertices.len() as u32,
            });
        }
        (vertices, batches)
    }
}

/// Borrowed state needed to issue draws for one viewport and frame.
pub struct DrawContext<'a> {
    pub pipelines: &'a Pipelines,
    pub textures: &'a TextureStorage,
    pub materials: &'a MaterialStorage,
    pub models: &'a ModelStorage,
    /// Camera bind group of the viewport.
    pub camera: &'a wgpu::BindGroup,
    /// Bind group of an identity camera, for geometry already in clip space.
    pub identity_camera: &'a wgpu::BindGroup,
    /// `None` disables culling.
    pub frustum: Option<Frustum>,
}

impl DrawContext<'_> {
    /// Texture bind group for a batch material, resolved at draw time.
    pub fn texture_for(&self, material: Option<&str>) -> Option<&wgpu::BindGroup> {
        match material {
            Some(material) => self
                .textures
                .bind_group_or_default(self.materials.current_texture(material)),
            None => self.textures.white(),
        }
    }

    pub fn is_transparent(&self, material: Option<&str>) -> bool {
        let Some(material) = material else {
            return false;
        };
        self.materials.is_transparent(material)
            || self
                .textures
                .get(self.materials.current_texture(material))
                .is_some_and(|texture| texture.flags.transparent)
    }

    /// Draw `batches` out of `vertices`: opaque ones first, then transparent ones.
    ///
    /// The camera bind group (group 0) must already be set.
    pub fn draw_batches(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        vertices: &wgpu::Buffer,
        batches: &[Batch],
        overlay: bool,
    ) {
        self.draw_layer(pass, vertices, batches, overlay, false);
        self.draw_layer(pass, vertices, batches, overlay, true);
    }

    /// Draw only the opaque (or only the transparent) batches.
    pub fn draw_layer(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        vertices: &wgpu::Buffer,
        batches: &[Batch],
        overlay: bool,
        transparent: bool,
    ) {
        pass.set_vertex_buffer(0, vertices.slice(..));
        for batch in batches
            .iter()
            .filter(|batch| self.is_transparent(batch.material.as_deref()) == transparent)
        {
            let Some(texture) = self.texture_for(batch.material.as_deref()) else {
                continue;
            };
            pass.set_pipeline(self.pipelines.passthrough(batch.topology, overlay));
            pass.set_bind_group(1, texture, &[]);
            pass.draw(batch.range.clone(), 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_group_by_topology_and_material() {
        let v = SceneVertex::coloured([0.0; 3], [1.0; 4]);
        let mut builder = BatchBuilder::new();
        builder.push(Topology::Triangles, Some("brick"), [v; 3]);
        builder.push(Topology::Lines, None, [v; 2]);
        builder.push(Topology::Triangles, Some("brick"), [v; 3]);
        builder.push(Topology::Triangles, None, []);
        let (vertices, batches) = builder.finish();
        assert_eq!(vertices.len(), 8);
        assert_eq!(batches.len(), 2);
        let brick = batches
            .iter()
            .find(|batch| batch.material.as_deref() == Some("brick"))
            .unwrap();
        assert_eq!(brick.range.len(), 6);
    }
}
