//! The engine-independent model of "what to draw".
//!
//! A [`Scene`] owns scene objects keyed by [`ObjectId`] and, while change
//! tracking is enabled, records every addition, update and removal into a
//! pending [`ChangeSet`]. The renderer consumes that set once per frame to
//! update only the parts of its GPU state that were touched.

use std::collections::{BTreeMap, BTreeSet};

use cgmath::Point3;

use crate::data_structures::{bounds::Aabb, instance::Instance};

/// Identifier of an object within one scene. Never reused by that scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A convex, planar polygon (a brush face).
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub points: Vec<[f32; 3]>,
    /// One UV per point; missing UVs default to `[0, 0]`.
    pub tex_coords: Vec<[f32; 2]>,
    pub colour: [f32; 4],
    pub material: Option<String>,
}

impl Face {
    pub fn new(points: Vec<[f32; 3]>, colour: [f32; 4]) -> Self {
        Self {
            points,
            tex_coords: Vec::new(),
            colour,
            material: None,
        }
    }

    pub fn with_material(mut self, material: &str, tex_coords: Vec<[f32; 2]>) -> Self {
        self.material = Some(material.to_string());
        self.tex_coords = tex_coords;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub colour: [f32; 4],
}

/// A point light. Drawn as a single point marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub position: [f32; 3],
    pub colour: [f32; 4],
}

/// A placed copy of a model from the model storage.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInstance {
    pub model: String,
    pub transform: Instance,
    /// Half extent of the model's bounds in model space, used for placement.
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneObject {
    Face(Face),
    Line(Line),
    Light(Light),
    Model(ModelInstance),
}

impl SceneObject {
    /// Number of vertices this object contributes to the scene vertex array.
    pub fn vertex_count(&self) -> usize {
        match self {
            SceneObject::Face(face) => face.points.len().saturating_sub(2) * 3,
            SceneObject::Line(_) => 2,
            SceneObject::Light(_) => 1,
            SceneObject::Model(_) => 0,
        }
    }

    /// Number of model instances this object contributes.
    pub fn instance_count(&self) -> usize {
        match self {
            SceneObject::Model(_) => 1,
            _ => 0,
        }
    }

    /// World-space bounds, `None` for degenerate geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            SceneObject::Face(face) => Aabb::from_points(face.points.iter().copied().map(Point3::from)),
            SceneObject::Line(line) => {
                Aabb::from_points([Point3::from(line.start), Point3::from(line.end)])
            }
            SceneObject::Light(light) => Aabb::from_points([Point3::from(light.position)]),
            SceneObject::Model(model) => {
                let p = model.transform.position;
                let r = model.radius
                    * model
                        .transform
                        .scale
                        .x
                        .abs()
                        .max(model.transform.scale.y.abs())
                        .max(model.transform.scale.z.abs());
                Some(Aabb::new(
                    Point3::new(p.x - r, p.y - r, p.z - r),
                    Point3::new(p.x + r, p.y + r, p.z + r),
                ))
            }
        }
    }
}

impl From<Face> for SceneObject {
    fn from(face: Face) -> Self {
        SceneObject::Face(face)
    }
}

impl From<Line> for SceneObject {
    fn from(line: Line) -> Self {
        SceneObject::Line(line)
    }
}

impl From<Light> for SceneObject {
    fn from(light: Light) -> Self {
        SceneObject::Light(light)
    }
}

impl From<ModelInstance> for SceneObject {
    fn from(model: ModelInstance) -> Self {
        SceneObject::Model(model)
    }
}

/// Changes accumulated since the last flush.
///
/// `reset` means the consumer must discard everything it knows and rebuild
/// from the scene's current contents; the id sets are empty in that case.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    pub added: BTreeSet<ObjectId>,
    pub updated: BTreeSet<ObjectId>,
    pub removed: BTreeSet<ObjectId>,
    pub reset: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !self.reset && self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    fn record_add(&mut self, id: ObjectId) {
        if self.reset {
            return;
        }
        // An id is never reused, so it cannot be in `removed`.
        self.added.insert(id);
    }

    fn record_update(&mut self, id: ObjectId) {
        if self.reset || self.added.contains(&id) {
            return;
        }
        self.updated.insert(id);
    }

    fn record_remove(&mut self, id: ObjectId) {
        if self.reset {
            return;
        }
        // Added and removed within one frame: the consumer never saw it.
        if self.added.remove(&id) {
            return;
        }
        self.updated.remove(&id);
        self.removed.insert(id);
    }
}

#[derive(Debug)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
    tracking: bool,
    changes: ChangeSet,
}

impl Scene {
    /// A new, empty scene with change tracking enabled.
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id: 0,
            tracking: true,
            changes: ChangeSet::default(),
        }
    }

    pub fn add(&mut self, object: impl Into<SceneObject>) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, object.into());
        if self.tracking {
            self.changes.record_add(id);
        }
        id
    }

    /// Replace an object's contents (move, recolour, retexture).
    ///
    /// Returns `false` for unknown ids.
    pub fn update(&mut self, id: ObjectId, object: impl Into<SceneObject>) -> bool {
        match self.objects.get_mut(&id) {
            Some(slot) => {
                *slot = object.into();
                if self.tracking {
                    self.changes.record_update(id);
                }
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let removed = self.objects.remove(&id)?;
        if self.tracking {
            self.changes.record_remove(id);
        }
        Some(removed)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Toggle change tracking.
    ///
    /// Tracking only controls recording: while it is off, edits are not
    /// recorded, but changes recorded earlier stay pending and are still
    /// handed out by [`take_changes`](Self::take_changes). Turning it back on
    /// requests a full resynchronisation, since edits made in between were
    /// not recorded.
    pub fn set_tracking(&mut self, tracking: bool) {
        if tracking && !self.tracking {
            self.changes = ChangeSet {
                reset: true,
                ..Default::default()
            };
        }
        self.tracking = tracking;
    }

    /// Ask consumers to rebuild from the full contents on their next flush.
    pub fn resync(&mut self) {
        self.changes = ChangeSet {
            reset: true,
            ..Default::default()
        };
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Consume the pending changes, whether or not tracking is on.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Face {
        Face::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [1.0; 4],
        )
    }

    #[test]
    fn add_then_remove_in_one_frame_leaves_no_trace() {
        let mut scene = Scene::new();
        let id = scene.add(triangle());
        scene.remove(id);
        assert!(!scene.has_changes());
    }

    #[test]
    fn update_after_add_stays_an_add() {
        let mut scene = Scene::new();
        let id = scene.add(triangle());
        assert!(scene.update(id, triangle()));
        let changes = scene.take_changes();
        assert!(changes.added.contains(&id));
        assert!(changes.updated.is_empty());
    }

    #[test]
    fn remove_after_update_is_a_remove() {
        let mut scene = Scene::new();
        let id = scene.add(triangle());
        scene.take_changes();
        scene.update(id, triangle());
        scene.remove(id);
        let changes = scene.take_changes();
        assert!(changes.updated.is_empty());
        assert!(changes.removed.contains(&id));
    }

    #[test]
    fn face_vertex_count_is_a_triangle_fan() {
        let quad = Face::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            [1.0; 4],
        );
        assert_eq!(SceneObject::from(quad).vertex_count(), 6);
        assert_eq!(SceneObject::from(Face::new(vec![[0.0; 3]], [1.0; 4])).vertex_count(), 0);
    }

    #[test]
    fn untracked_edits_resync_when_tracking_returns() {
        let mut scene = Scene::new();
        scene.set_tracking(false);
        scene.add(triangle());
        assert!(scene.take_changes().is_empty());
        scene.set_tracking(true);
        assert!(scene.take_changes().reset);
    }

    #[test]
    fn changes_recorded_before_pausing_stay_pending() {
        let mut scene = Scene::new();
        let id = scene.add(triangle());
        scene.set_tracking(false);
        scene.add(triangle());
        let changes = scene.take_changes();
        assert_eq!(changes.added.into_iter().collect::<Vec<_>>(), vec![id]);
        assert!(!scene.has_changes());
    }

    #[test]
    fn resync_is_handed_out_while_untracked() {
        let mut scene = Scene::new();
        scene.set_tracking(false);
        scene.resync();
        assert!(scene.take_changes().reset);
    }
}
