//! Texture providers and the texture request queue.
//!
//! Texture names are discovered lazily (while rendering, or by background
//! tasks) and pushed into [`TextureRequests`] from any thread. The render
//! thread drains a small batch each frame, asks the registered
//! [`TextureProvider`]s who owns each name and stores what they return.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use crossbeam_channel::{Receiver, Sender};

use crate::{
    resources::texture::{Bitmap, TextureFlags, TextureStorage, texture_key},
    viewport::FrameTime,
};

/// A source of texture bitmaps (a WAD package, a directory of images, ...).
pub trait TextureProvider {
    /// Whether this provider can supply `name`. Must be cheap.
    fn exists(&self, name: &str) -> bool;

    /// Fetch bitmaps for `names`, all of which passed [`exists`](Self::exists).
    fn fetch(&mut self, names: &[String]) -> anyhow::Result<Vec<Bitmap>>;
}

/// Derives textures from per-frame state (rasterised labels, generated
/// patterns). Every registered producer is advanced once per frame update,
/// before anything is drawn.
pub trait TextureProducer {
    fn update(&mut self, time: &FrameTime, textures: &mut TextureStorage);
}

impl<F> TextureProducer for F
where
    F: FnMut(&FrameTime, &mut TextureStorage),
{
    fn update(&mut self, time: &FrameTime, textures: &mut TextureStorage) {
        self(time, textures)
    }
}

/// Resolves texture names to image files in one directory.
///
/// `name` maps to the first of `name.png`, `name.jpg`, `name.jpeg`,
/// `name.tga`, `name.bmp` that exists (file names compared case-insensitively).
#[derive(Debug, Clone)]
pub struct DirectoryTextureProvider {
    root: PathBuf,
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tga", "bmp"];

impl DirectoryTextureProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let wanted = texture_key(name);
        let entries = std::fs::read_dir(&self.root).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| texture_key(stem) == wanted)
            })
            .filter_map(|path| {
                let extension = path.extension()?.to_str()?.to_ascii_lowercase();
                let rank = IMAGE_EXTENSIONS.iter().position(|e| *e == extension)?;
                Some((rank, path))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, path)| path)
    }
}

impl TextureProvider for DirectoryTextureProvider {
    fn exists(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    fn fetch(&mut self, names: &[String]) -> anyhow::Result<Vec<Bitmap>> {
        let mut bitmaps = Vec::with_capacity(names.len());
        for name in names {
            let path = self
                .locate(name)
                .with_context(|| format!("texture {name} vanished from {}", self.root.display()))?;
            let img = image::open(&path)
                .with_context(|| format!("failed to decode {}", path.display()))?
                .to_rgba8();
            let (width, height) = img.dimensions();
            let rgba = img.into_raw();
            let transparent = rgba.chunks_exact(4).any(|px| px[3] < 255);
            bitmaps.push(Bitmap {
                name: name.clone(),
                width,
                height,
                rgba,
                flags: TextureFlags { transparent },
            });
        }
        Ok(bitmaps)
    }
}

/// Cloneable, `Send` handle for requesting textures from other threads.
#[derive(Debug, Clone)]
pub struct TextureRequester {
    sender: Sender<String>,
}

impl TextureRequester {
    pub fn request(&self, name: &str) {
        // The receiver lives as long as the renderer; after that nobody cares.
        if self.sender.send(name.to_string()).is_err() {
            log::debug!("texture request for {name} after the renderer was dropped");
        }
    }
}

/// Outcome of one drained batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Names taken off the queue (including duplicates and already stored ones).
    pub drained: usize,
    /// Bitmaps newly added to the storage.
    pub stored: usize,
    /// Names no provider claimed, or whose provider failed.
    pub dropped: Vec<String>,
}

/// Unbounded multi-producer queue of texture names awaiting resolution.
#[derive(Debug)]
pub struct TextureRequests {
    sender: Sender<String>,
    receiver: Receiver<String>,
}

impl TextureRequests {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn request(&self, name: &str) {
        // Both ends are owned by `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(name.to_string());
    }

    pub fn requester(&self) -> TextureRequester {
        TextureRequester {
            sender: self.sender.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Drain at most `batch_size` names and resolve them.
    ///
    /// Names already in `storage` are skipped. Each remaining name goes to
    /// the first provider whose `exists` check succeeds; every provider is
    /// then asked once for all of its names. Unclaimed names are dropped, not
    /// requeued: a caller that still wants them has to request them again.
    pub fn process_batch(
        &self,
        providers: &mut [Box<dyn TextureProvider>],
        storage: &mut TextureStorage,
        batch_size: usize,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut wanted = BTreeSet::new();
        for name in self.receiver.try_iter().take(batch_size) {
            report.drained += 1;
            if !storage.contains(&name) {
                wanted.insert(texture_key(&name));
            }
        }
        if wanted.is_empty() {
            return report;
        }

        let mut claims: Vec<Vec<String>> = vec![Vec::new(); providers.len()];
        for name in wanted {
            match providers.iter().position(|provider| provider.exists(&name)) {
                Some(idx) => claims[idx].push(name),
                None => {
                    log::debug!("no texture provider has {name}; dropping request");
                    report.dropped.push(name);
                }
            }
        }

        for (provider, names) in providers.iter_mut().zip(claims) {
            if names.is_empty() {
                continue;
            }
            match provider.fetch(&names) {
                Ok(bitmaps) => {
                    for bitmap in bitmaps {
                        if storage.insert(bitmap) {
                            report.stored += 1;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("texture provider failed to fetch {:?}: {:#}", names, e);
                    report.dropped.extend(names);
                }
            }
        }
        report
    }
}

impl Default for TextureRequests {
    fn default() -> Self {
        Self::new()
    }
}
