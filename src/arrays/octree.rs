//! The GPU-side mirror of one scene.
//!
//! An [`OctreeVertexArray`] keeps the last committed copy of every scene
//! object, sorted into octree cells. Each occupied cell owns its own vertex
//! buffer (batched by topology and material) and one instance buffer per
//! model, so an edit only rebuilds the cells it touched.
//!
//! Updating is split in two. [`stage`](OctreeVertexArray::stage) consumes the
//! scene's pending changes and rebuilds the CPU data of affected cells;
//! [`flush`](OctreeVertexArray::flush) uploads whatever was rebuilt.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use wgpu::util::DeviceExt;

use crate::{
    context::Gpu,
    data_structures::{
        bounds::Aabb,
        instance::InstanceRaw,
        octree::{CellId, Octree},
        scene::{ObjectId, Scene, SceneObject},
        vertex::SceneVertex,
    },
    render::{Batch, BatchBuilder, DrawContext, Topology},
    resources::material::MaterialStorage,
};

#[derive(Debug)]
struct CellBuffers {
    vertices: Option<wgpu::Buffer>,
    instances: Vec<(String, wgpu::Buffer, u32)>,
}

#[derive(Debug)]
struct Cell {
    bounds: Aabb,
    vertices: Vec<SceneVertex>,
    batches: Vec<Batch>,
    instances: BTreeMap<String, Vec<InstanceRaw>>,
    gpu: Option<CellBuffers>,
}

impl Cell {
    fn instance_count(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }
}

#[derive(Debug)]
pub struct OctreeVertexArray {
    objects: HashMap<ObjectId, SceneObject>,
    octree: Octree<ObjectId>,
    cells: BTreeMap<CellId, Cell>,
    /// Cells rebuilt on the CPU but not uploaded yet.
    dirty: BTreeSet<CellId>,
    last_rebuilt: Vec<CellId>,
}

impl OctreeVertexArray {
    pub fn new(world_bounds: Aabb, cell_size: f32) -> Self {
        Self {
            objects: HashMap::new(),
            octree: Octree::new(world_bounds, cell_size),
            cells: BTreeMap::new(),
            dirty: BTreeSet::new(),
            last_rebuilt: Vec::new(),
        }
    }

    /// Consume `scene`'s pending changes and rebuild the affected cells' vertex data.
    ///
    /// Material colours are baked into the vertices here. Edits made while the
    /// scene is not tracking are not recorded, so the committed state keeps
    /// showing the last known contents.
    pub fn stage(&mut self, scene: &mut Scene, materials: &MaterialStorage) {
        let changes = scene.take_changes();
        if changes.is_empty() {
            self.last_rebuilt.clear();
            return;
        }
        let mut touched = BTreeSet::new();

        if changes.reset {
            touched.extend(self.cells.keys().copied());
            self.objects.clear();
            self.octree.clear();
            for (id, object) in scene.iter() {
                if let Some(cell) = self.place(id, object.clone()) {
                    touched.insert(cell);
                }
            }
        } else {
            for id in &changes.removed {
                self.objects.remove(id);
                touched.extend(self.octree.remove(*id));
            }
            for id in changes.added.iter().chain(&changes.updated) {
                touched.extend(self.octree.remove(*id));
                self.objects.remove(id);
                let Some(object) = scene.get(*id) else {
                    continue;
                };
                if let Some(cell) = self.place(*id, object.clone()) {
                    touched.insert(cell);
                }
            }
        }

        for cell in &touched {
            self.rebuild(*cell, materials);
        }
        log::debug!(
            "staged {} added, {} updated, {} removed{}: {} cells rebuilt",
            changes.added.len(),
            changes.updated.len(),
            changes.removed.len(),
            if changes.reset { " (reset)" } else { "" },
            touched.len()
        );
        self.last_rebuilt = touched.into_iter().collect();
    }

    /// Upload the cells rebuilt since the last flush.
    pub fn flush(&mut self, gpu: &Gpu) {
        for id in std::mem::take(&mut self.dirty) {
            let Some(cell) = self.cells.get_mut(&id) else {
                continue;
            };
            let vertices = (!cell.vertices.is_empty()).then(|| {
                gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("octree cell vertices"),
                    contents: bytemuck::cast_slice(&cell.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            });
            let instances = cell
                .instances
                .iter()
                .map(|(model, raw)| {
                    let buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("octree cell instances"),
                        contents: bytemuck::cast_slice(raw),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                    (model.clone(), buffer, raw.len() as u32)
                })
                .collect();
            cell.gpu = Some(CellBuffers { vertices, instances });
        }
    }

    pub fn apply_changes(&mut self, gpu: &Gpu, scene: &mut Scene, materials: &MaterialStorage) {
        self.stage(scene, materials);
        self.flush(gpu);
    }

    /// Vertices held across all cells.
    pub fn vertex_count(&self) -> usize {
        self.cells.values().map(|cell| cell.vertices.len()).sum()
    }

    pub fn model_instance_count(&self) -> usize {
        self.cells.values().map(Cell::instance_count).sum()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cells waiting for [`flush`](Self::flush).
    pub fn dirty_cells(&self) -> usize {
        self.dirty.len()
    }

    /// Cells rebuilt by the most recent [`stage`](Self::stage), including emptied ones.
    pub fn last_rebuilt(&self) -> &[CellId] {
        &self.last_rebuilt
    }

    pub fn cell_of(&self, id: ObjectId) -> Option<CellId> {
        self.octree.cell_of(id)
    }

    /// Names of every material referenced by committed geometry.
    pub fn materials(&self) -> BTreeSet<&str> {
        self.cells
            .values()
            .flat_map(|cell| cell.batches.iter())
            .filter_map(|batch| batch.material.as_deref())
            .collect()
    }

    /// Names of the materials used by the cells the most recent
    /// [`stage`](Self::stage) rebuilt. Costs in proportion to the edit, not
    /// to the scene.
    pub fn rebuilt_materials(&self) -> BTreeSet<&str> {
        self.last_rebuilt
            .iter()
            .filter_map(|id| self.cells.get(id))
            .flat_map(|cell| cell.batches.iter())
            .filter_map(|batch| batch.material.as_deref())
            .collect()
    }

    /// Names of every model referenced by committed instances.
    pub fn models(&self) -> BTreeSet<&str> {
        self.cells
            .values()
            .flat_map(|cell| cell.instances.keys())
            .map(String::as_str)
            .collect()
    }

    /// Draw every uploaded cell that survives frustum culling: all opaque
    /// geometry first, then models, then transparent geometry.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        let visible: Vec<(&Cell, &CellBuffers)> = self
            .cells
            .iter()
            .filter(|(id, cell)| match &ctx.frustum {
                // Root keys may lie outside the root bounds.
                Some(frustum) => **id == CellId::ROOT || frustum.intersects(&cell.bounds),
                None => true,
            })
            .filter_map(|(_, cell)| Some((cell, cell.gpu.as_ref()?)))
            .collect();

        pass.set_bind_group(0, ctx.camera, &[]);
        for (cell, buffers) in &visible {
            if let Some(vertices) = &buffers.vertices {
                ctx.draw_layer(pass, vertices, &cell.batches, false, false);
            }
        }

        pass.set_pipeline(&ctx.pipelines.model);
        for (_, buffers) in &visible {
            for (name, instances, count) in &buffers.instances {
                let Some(model) = ctx.models.gpu(name) else {
                    continue;
                };
                pass.set_bind_group(1, &model.pose_bind_group, &[]);
                pass.set_vertex_buffer(0, model.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, instances.slice(..));
                pass.set_index_buffer(model.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..model.index_count, 0, 0..*count);
            }
        }

        for (cell, buffers) in &visible {
            if let Some(vertices) = &buffers.vertices {
                ctx.draw_layer(pass, vertices, &cell.batches, false, true);
            }
        }
    }

    fn place(&mut self, id: ObjectId, object: SceneObject) -> Option<CellId> {
        let bounds = object.bounds()?;
        let cell = self.octree.insert(id, &bounds);
        self.objects.insert(id, object);
        Some(cell)
    }

    fn rebuild(&mut self, id: CellId, materials: &MaterialStorage) {
        let mut builder = BatchBuilder::new();
        let mut instances: BTreeMap<String, Vec<InstanceRaw>> = BTreeMap::new();
        for key in self.octree.keys_in(id) {
            let Some(object) = self.objects.get(&key) else {
                continue;
            };
            match object {
                SceneObject::Face(face) => {
                    let tint = face
                        .material
                        .as_deref()
                        .map(|material| materials.colour(material))
                        .unwrap_or([1.0; 4]);
                    let colour = std::array::from_fn(|i| face.colour[i] * tint[i]);
                    let vertex = |i: usize| {
                        SceneVertex::new(
                            face.points[i],
                            face.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                            colour,
                        )
                    };
                    let fan = (1..face.points.len().saturating_sub(1))
                        .flat_map(|i| [vertex(0), vertex(i), vertex(i + 1)]);
                    builder.push(Topology::Triangles, face.material.as_deref(), fan);
                }
                SceneObject::Line(line) => builder.push(
                    Topology::Lines,
                    None,
                    [
                        SceneVertex::coloured(line.start, line.colour),
                        SceneVertex::coloured(line.end, line.colour),
                    ],
                ),
                SceneObject::Light(light) => builder.push(
                    Topology::Points,
                    None,
                    [SceneVertex::coloured(light.position, light.colour)],
                ),
                SceneObject::Model(model) => instances
                    .entry(model.model.clone())
                    .or_default()
                    .push(model.transform.to_raw()),
            }
        }
        let (vertices, batches) = builder.finish();
        if vertices.is_empty() && instances.is_empty() {
            self.cells.remove(&id);
            self.dirty.remove(&id);
            return;
        }
        let Some(bounds) = self.octree.cell_bounds(id) else {
            return;
        };
        self.cells.insert(
            id,
            Cell {
                bounds,
                vertices,
                batches,
                instances,
                gpu: None,
            },
        );
        self.dirty.insert(id);
    }
}
