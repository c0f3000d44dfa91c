//! Vertex arrays owned per scene and per viewport.
//!
//! - `octree` mirrors a scene's objects in incrementally rebuilt octree cells
//! - `elements` holds transient overlay primitives, rebuilt every frame

pub mod elements;
pub mod octree;
