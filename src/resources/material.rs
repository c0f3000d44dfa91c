//! Materials: how a surface looks, independent of whether its textures exist yet.
//!
//! A material names its texture(s) but never holds them. The name is resolved
//! against the texture storage when drawing, so a material can be created long
//! before its texture is loaded.

use std::collections::HashMap;

use instant::Duration;

use crate::resources::texture::texture_key;
use crate::viewport::FrameTime;

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Texture names; more than one makes an animated material.
    pub frames: Vec<String>,
    pub frames_per_second: f32,
    /// Multiplied with the vertex colour.
    pub colour: [f32; 4],
    /// Drawn after opaque geometry with blending.
    pub transparent: bool,
}

impl Material {
    /// A material textured by the texture of the same name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: vec![name.to_string()],
            frames_per_second: 0.0,
            colour: [1.0; 4],
            transparent: false,
        }
    }

    pub fn animated(name: &str, frames: Vec<String>, frames_per_second: f32) -> Self {
        Self {
            name: name.to_string(),
            frames,
            frames_per_second,
            colour: [1.0; 4],
            transparent: false,
        }
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1 && self.frames_per_second > 0.0
    }

    /// The texture name to draw at `elapsed` time.
    pub fn texture_at(&self, elapsed: Duration) -> Option<&str> {
        if self.frames.is_empty() {
            return None;
        }
        let idx = if self.is_animated() {
            (elapsed.as_secs_f64() * f64::from(self.frames_per_second)) as usize % self.frames.len()
        } else {
            0
        };
        self.frames.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct MaterialStorage {
    materials: HashMap<String, Material>,
    elapsed: Duration,
    initialised: bool,
}

impl MaterialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialise(&mut self) {
        if self.initialised {
            return;
        }
        self.initialised = true;
        log::debug!("material storage initialised");
    }

    /// The material called `name`, created with default settings if absent.
    pub fn get_or_create(&mut self, name: &str) -> &mut Material {
        self.materials
            .entry(texture_key(name))
            .or_insert_with(|| Material::new(name))
    }

    /// Store `material` unless one with the same name exists. Returns whether it was stored.
    pub fn insert(&mut self, material: Material) -> bool {
        let key = texture_key(&material.name);
        if self.materials.contains_key(&key) {
            return false;
        }
        self.materials.insert(key, material);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(&texture_key(name))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Advance animated materials to the frame's time.
    pub fn update(&mut self, frame: &FrameTime) {
        self.elapsed = frame.elapsed;
    }

    /// Texture name to draw for material `name` right now.
    ///
    /// Unknown materials fall back to a texture of the same name, which is
    /// how brush faces refer to plain textures.
    pub fn current_texture<'a>(&'a self, name: &'a str) -> &'a str {
        match self.get(name) {
            Some(material) => material.texture_at(self.elapsed).unwrap_or(name),
            None => name,
        }
    }

    pub fn is_transparent(&self, name: &str) -> bool {
        self.get(name).is_some_and(|material| material.transparent)
    }

    pub fn colour(&self, name: &str) -> [f32; 4] {
        self.get(name).map(|material| material.colour).unwrap_or([1.0; 4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animated_materials_cycle_their_frames() {
        let mut storage = MaterialStorage::new();
        storage.insert(Material::animated(
            "+0water",
            vec!["+0water".into(), "+1water".into(), "+2water".into()],
            2.0,
        ));
        let mut frame = FrameTime::default();
        assert_eq!(storage.current_texture("+0WATER"), "+0water");
        frame.elapsed = Duration::from_millis(600);
        storage.update(&frame);
        assert_eq!(storage.current_texture("+0water"), "+1water");
        frame.elapsed = Duration::from_millis(1600);
        storage.update(&frame);
        assert_eq!(storage.current_texture("+0water"), "+0water");
    }

    #[test]
    fn unknown_materials_resolve_to_their_own_name() {
        let storage = MaterialStorage::new();
        assert_eq!(storage.current_texture("crate01"), "crate01");
    }

    #[test]
    fn get_or_create_keeps_existing_settings() {
        let mut storage = MaterialStorage::new();
        storage.get_or_create("glass").colour = [1.0, 1.0, 1.0, 0.5];
        assert_eq!(storage.get_or_create("GLASS").colour[3], 0.5);
        assert_eq!(storage.len(), 1);
    }
}
