//! Texture storage.
//!
//! Textures arrive as decoded [`Bitmap`]s (usually from a texture provider)
//! and are uploaded to the GPU lazily, at most once per name. Names are
//! case-insensitive, matching how map files refer to textures.

use std::collections::HashMap;

use crate::{context::Gpu, data_structures::texture::Texture};

/// Extra information a provider attaches to a bitmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureFlags {
    /// The bitmap uses alpha (e.g. `{`-prefixed WAD textures).
    pub transparent: bool,
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub flags: TextureFlags,
}

impl Bitmap {
    /// A single-colour bitmap, mostly useful for placeholders and tests.
    pub fn solid(name: &str, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            rgba: rgba
                .iter()
                .copied()
                .cycle()
                .take(width as usize * height as usize * 4)
                .collect(),
            flags: TextureFlags {
                transparent: rgba[3] < 255,
            },
        }
    }
}

/// A texture uploaded to the GPU together with its sampler bind group.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
    pub flags: TextureFlags,
}

#[derive(Debug)]
enum TextureEntry {
    Pending(Bitmap),
    Ready(GpuTexture),
    /// Upload was rejected (bad dimensions); drawn with the missing texture.
    Failed,
}

#[derive(Debug)]
struct Defaults {
    layout: wgpu::BindGroupLayout,
    white: GpuTexture,
    missing: GpuTexture,
}

#[derive(Debug, Default)]
pub struct TextureStorage {
    entries: HashMap<String, TextureEntry>,
    pending: Vec<String>,
    defaults: Option<Defaults>,
}

pub(crate) fn texture_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl TextureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the bind group layout and the default/missing textures.
    ///
    /// Idempotent: calling it again keeps the existing resources.
    pub fn initialise(&mut self, gpu: &Gpu) {
        if self.defaults.is_some() {
            return;
        }
        let layout = texture_bind_group_layout(&gpu.device);
        let white = Bitmap::solid("__white", 1, 1, [255, 255, 255, 255]);
        let mut checker = Vec::with_capacity(8 * 8 * 4);
        for y in 0..8 {
            for x in 0..8 {
                let on = (x / 4 + y / 4) % 2 == 0;
                checker.extend_from_slice(if on { &[255, 0, 255, 255] } else { &[0, 0, 0, 255] });
            }
        }
        let missing = Bitmap {
            name: "__missing".to_string(),
            width: 8,
            height: 8,
            rgba: checker,
            flags: TextureFlags::default(),
        };
        // Built-in bitmaps always have matching dimensions.
        let (Some(white), Some(missing)) = (
            upload(gpu, &layout, &white),
            upload(gpu, &layout, &missing),
        ) else {
            log::error!("failed to create built-in textures");
            return;
        };
        self.defaults = Some(Defaults {
            layout,
            white,
            missing,
        });
        log::info!("texture storage initialised");
    }

    pub fn is_initialised(&self) -> bool {
        self.defaults.is_some()
    }

    pub fn layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.defaults.as_ref().map(|defaults| &defaults.layout)
    }

    /// Store a bitmap for upload. Returns `false` (and keeps the existing
    /// entry) if a texture with this name is already known.
    pub fn insert(&mut self, bitmap: Bitmap) -> bool {
        let key = texture_key(&bitmap.name);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.pending.push(key.clone());
        self.entries.insert(key, TextureEntry::Pending(bitmap));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&texture_key(name))
    }

    pub fn is_pending(&self, name: &str) -> bool {
        matches!(self.entries.get(&texture_key(name)), Some(TextureEntry::Pending(_)))
    }

    /// The uploaded texture for `name`, `None` while absent or still pending.
    pub fn get(&self, name: &str) -> Option<&GpuTexture> {
        match self.entries.get(&texture_key(name)) {
            Some(TextureEntry::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_uploads(&self) -> usize {
        self.pending.len()
    }

    /// Upload every pending bitmap. Returns how many uploads succeeded.
    pub fn upload_pending(&mut self, gpu: &Gpu) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        self.initialise(gpu);
        let Some(defaults) = &self.defaults else {
            return 0;
        };
        let mut uploaded = 0;
        for key in self.pending.drain(..) {
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            let TextureEntry::Pending(bitmap) = entry else {
                continue;
            };
            *entry = match upload(gpu, &defaults.layout, bitmap) {
                Some(texture) => {
                    uploaded += 1;
                    TextureEntry::Ready(texture)
                }
                None => TextureEntry::Failed,
            };
        }
        log::debug!("uploaded {uploaded} textures");
        uploaded
    }

    pub fn white(&self) -> Option<&wgpu::BindGroup> {
        self.defaults.as_ref().map(|defaults| &defaults.white.bind_group)
    }

    /// Bind group for `name`: the texture itself once uploaded, the missing
    /// texture for failed uploads and the white texture otherwise.
    pub fn bind_group_or_default(&self, name: &str) -> Option<&wgpu::BindGroup> {
        let defaults = self.defaults.as_ref()?;
        Some(match self.entries.get(&texture_key(name)) {
            Some(TextureEntry::Ready(texture)) => &texture.bind_group,
            Some(TextureEntry::Failed) => &defaults.missing.bind_group,
            _ => &defaults.white.bind_group,
        })
    }
}

fn upload(gpu: &Gpu, layout: &wgpu::BindGroupLayout, bitmap: &Bitmap) -> Option<GpuTexture> {
    let texture = match Texture::from_rgba(
        &gpu.device,
        &gpu.queue,
        bitmap.width,
        bitmap.height,
        &bitmap.rgba,
        &bitmap.name,
    ) {
        Ok(texture) => texture,
        Err(e) => {
            log::warn!("texture {} rejected: {}", bitmap.name, e);
            return None;
        }
    };
    let sampler = texture.sampler.as_ref()?;
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(&bitmap.name),
    });
    Some(GpuTexture {
        texture,
        bind_group,
        flags: bitmap.flags,
    })
}

/// Layout of a texture bind group: a filterable 2D texture and its sampler.
pub fn texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_a_no_op_for_known_names() {
        let mut storage = TextureStorage::new();
        assert!(storage.insert(Bitmap::solid("AAATRIGGER", 2, 2, [255; 4])));
        assert!(!storage.insert(Bitmap::solid("aaatrigger", 4, 4, [0; 4])));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.pending_uploads(), 1);
        assert!(storage.is_pending("AaaTrigger"));
        assert!(storage.get("aaatrigger").is_none());
    }

    #[test]
    fn solid_bitmaps_have_one_pixel_per_texel() {
        let bitmap = Bitmap::solid("glass", 3, 2, [10, 20, 30, 128]);
        assert_eq!(bitmap.rgba.len(), 3 * 2 * 4);
        assert!(bitmap.flags.transparent);
    }
}
