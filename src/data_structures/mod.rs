//! Engine data structures: scene model, spatial index, vertices and GPU targets.
//!
//! - `bounds` axis-aligned bounding boxes
//! - `framebuffer` off-screen colour and depth targets of a viewport
//! - `instance` per-instance transformation data
//! - `octree` spatial partition of scene objects
//! - `scene` scene objects and change tracking
//! - `texture` GPU texture wrapper and creation utilities
//! - `vertex` vertex formats and their buffer layouts

pub mod bounds;
pub mod framebuffer;
pub mod instance;
pub mod octree;
pub mod scene;
pub mod texture;
pub mod vertex;
