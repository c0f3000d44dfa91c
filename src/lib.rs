//! brush-ngin
//!
//! The scene rendering core of a brush-based level editor, built on wgpu. A
//! [`Renderer`](renderer::Renderer) owns resource storages and derived GPU
//! caches, keeps one scene active and renders it into any number of
//! viewports. Scene edits are committed incrementally: only the octree cells
//! an edit touched are rebuilt.
//!
//! High-level modules
//! - `arrays`: octree-partitioned scene vertex array and overlay element array
//! - `camera`: cameras, the camera uniform and frustum culling
//! - `config`: renderer tunables
//! - `context`: the GPU device/queue pair shared by everything
//! - `data_structures`: scene model, octree, vertices, textures and framebuffers
//! - `flow`: a minimal windowed host loop
//! - `pipelines`: render pipelines and their shaders
//! - `render`: draw batching shared by the vertex arrays
//! - `renderer`: the orchestrator
//! - `resources`: texture, material and model storages; texture providers
//! - `viewport`: viewports, frame timing and frame callbacks
//!

pub mod arrays;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod viewport;

// Re-exports commonly used types for convenience in downstream code.
pub use arrays::elements::{Element, Space};
pub use camera::Camera;
pub use config::RendererConfig;
pub use context::Gpu;
pub use data_structures::scene::{Face, Light, Line, ModelInstance, ObjectId, Scene, SceneObject};
pub use renderer::{Renderer, SceneHandle, ViewportHandle};
pub use resources::provider::{DirectoryTextureProvider, TextureProducer, TextureProvider};
pub use resources::texture::{Bitmap, TextureFlags};
pub use viewport::{FrameClock, FrameListener, FrameTime, Viewport};
