/**
 * Resource storages shared by every scene and viewport of a renderer:
 * textures (and the providers/request queue that fill them), materials and
 * models. Storages only ever grow; nothing is evicted while the renderer lives.
 */
pub mod material;
pub mod model;
pub mod provider;
pub mod texture;
