//! The renderer: owner of every storage and derived GPU cache.
//!
//! Scenes and viewports are registered in arena tables and referred to by
//! opaque handles. Derived state (the octree vertex array of a scene, the
//! framebuffer and element array of a viewport) is created lazily on first
//! render and dropped exactly when its scene or viewport goes away. Operations
//! on unknown or already removed handles are no-ops.
//!
//! Rendering follows the same steps for every viewport and frame:
//!
//! 1. skip the frame when no scene is active
//! 2. create the shared pipelines and default resources, once
//! 3. create the viewport's data, or resize its framebuffer if the viewport changed size
//! 4. commit the active scene's pending changes into its octree vertex array
//! 5. rebuild the viewport's overlay elements
//! 6. resolve a bounded batch of queued texture names and upload new resources
//! 7. draw the scene and the elements into the framebuffer and blit it onto the target

use std::collections::HashSet;

use slotmap::{SlotMap, new_key_type};

use crate::{
    arrays::{elements::ElementArray, octree::OctreeVertexArray},
    camera::{Camera, CameraBinding, Frustum},
    config::RendererConfig,
    context::Gpu,
    data_structures::{framebuffer::Framebuffer, scene::Scene},
    pipelines::Pipelines,
    render::DrawContext,
    resources::{
        material::MaterialStorage,
        model::ModelStorage,
        provider::{BatchReport, TextureProducer, TextureProvider, TextureRequester, TextureRequests},
        texture::{TextureStorage, texture_key},
    },
    viewport::{FrameListener, FrameTime, Viewport},
};

new_key_type! { pub struct SceneHandle; }
new_key_type! { pub struct ViewportHandle; }

/// Derived GPU state of one scene.
#[derive(Debug)]
pub struct SceneData {
    pub array: OctreeVertexArray,
}

#[derive(Debug)]
struct SceneEntry {
    scene: Scene,
    data: Option<SceneData>,
}

/// Derived GPU state of one viewport.
#[derive(Debug)]
pub struct ViewportData {
    pub framebuffer: Framebuffer,
    pub elements: ElementArray,
    camera: CameraBinding,
    identity_camera: CameraBinding,
}

#[derive(Debug)]
enum InitState {
    Uninitialized,
    Initialized(Box<Pipelines>),
}

pub struct Renderer {
    config: RendererConfig,
    scenes: SlotMap<SceneHandle, SceneEntry>,
    viewports: SlotMap<ViewportHandle, Option<ViewportData>>,
    active: Option<SceneHandle>,
    textures: TextureStorage,
    materials: MaterialStorage,
    models: ModelStorage,
    requests: TextureRequests,
    providers: Vec<Box<dyn TextureProvider>>,
    producers: Vec<Box<dyn TextureProducer>>,
    /// Names this renderer already queued on its own, so each is asked for once.
    requested: HashSet<String>,
    init: InitState,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            config,
            scenes: SlotMap::with_key(),
            viewports: SlotMap::with_key(),
            active: None,
            textures: TextureStorage::new(),
            materials: MaterialStorage::new(),
            models: ModelStorage::new(),
            requests: TextureRequests::new(),
            providers: Vec::new(),
            producers: Vec::new(),
            requested: HashSet::new(),
            init: InitState::Uninitialized,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn is_initialised(&self) -> bool {
        matches!(self.init, InitState::Initialized(_))
    }

    /// Register a viewport of `width` x `height` pixels. The caller owns it
    /// and must hand it back to [`destroy_viewport`](Self::destroy_viewport).
    pub fn create_viewport(&mut self, width: u32, height: u32) -> Viewport {
        let handle = self.viewports.insert(None);
        log::debug!("viewport {handle:?} created at {width}x{height}");
        Viewport::new(handle, width, height)
    }

    /// Release the viewport's data and stop its frame callbacks. Idempotent.
    pub fn destroy_viewport(&mut self, viewport: &mut Viewport) {
        viewport.detach();
        if self.viewports.remove(viewport.handle()).is_some() {
            log::debug!("viewport {:?} destroyed", viewport.handle());
        }
    }

    pub fn has_viewport_data(&self, handle: ViewportHandle) -> bool {
        self.viewport_data(handle).is_some()
    }

    pub fn viewport_data(&self, handle: ViewportHandle) -> Option<&ViewportData> {
        self.viewports.get(handle)?.as_ref()
    }

    /// A new, empty scene with change tracking enabled.
    pub fn create_scene(&mut self) -> SceneHandle {
        let handle = self.scenes.insert(SceneEntry {
            scene: Scene::new(),
            data: None,
        });
        log::debug!("scene {handle:?} created");
        handle
    }

    pub fn scene(&self, handle: SceneHandle) -> Option<&Scene> {
        self.scenes.get(handle).map(|entry| &entry.scene)
    }

    pub fn scene_mut(&mut self, handle: SceneHandle) -> Option<&mut Scene> {
        self.scenes.get_mut(handle).map(|entry| &mut entry.scene)
    }

    /// Make `handle` the rendered scene. Ignored for unknown handles.
    pub fn set_active_scene(&mut self, handle: SceneHandle) {
        if self.scenes.contains_key(handle) {
            self.active = Some(handle);
        }
    }

    pub fn active_scene(&self) -> Option<SceneHandle> {
        self.active
    }

    /// Unregister a scene and drop its data. Idempotent.
    pub fn remove_scene(&mut self, handle: SceneHandle) {
        if self.active == Some(handle) {
            self.active = None;
        }
        if let Some(entry) = self.scenes.remove(handle) {
            log::debug!(
                "scene {handle:?} removed{}",
                if entry.data.is_some() { " with its data" } else { "" }
            );
        }
    }

    pub fn has_scene_data(&self, handle: SceneHandle) -> bool {
        self.scene_data(handle).is_some()
    }

    pub fn scene_data(&self, handle: SceneHandle) -> Option<&SceneData> {
        self.scenes.get(handle)?.data.as_ref()
    }

    /// Queue a texture name for resolution on a later frame.
    pub fn request_texture(&self, name: &str) {
        self.requests.request(name);
    }

    /// A handle for queueing texture names from other threads.
    pub fn texture_requester(&self) -> TextureRequester {
        self.requests.requester()
    }

    pub fn pending_texture_requests(&self) -> usize {
        self.requests.pending()
    }

    /// Providers are asked in registration order.
    pub fn add_texture_provider(&mut self, provider: impl TextureProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Producers are advanced in registration order on every frame update.
    pub fn add_texture_producer(&mut self, producer: impl TextureProducer + 'static) {
        self.producers.push(Box::new(producer));
    }

    /// Resolve at most one batch of queued names into the texture storage.
    pub fn process_texture_requests(&mut self) -> BatchReport {
        self.requests.process_batch(
            &mut self.providers,
            &mut self.textures,
            self.config.texture_batch_size,
        )
    }

    pub fn textures(&self) -> &TextureStorage {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureStorage {
        &mut self.textures
    }

    pub fn materials(&self) -> &MaterialStorage {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialStorage {
        &mut self.materials
    }

    pub fn models(&self) -> &ModelStorage {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelStorage {
        &mut self.models
    }

    /// One-time creation of default resources and pipelines.
    fn initialise(&mut self, gpu: &Gpu) {
        if self.is_initialised() {
            return;
        }
        self.textures.initialise(gpu);
        self.materials.initialise();
        self.models.initialise(gpu);
        let (Some(texture_layout), Some(pose_layout)) = (self.textures.layout(), self.models.layout()) else {
            log::error!("renderer initialisation failed: storages have no layouts");
            return;
        };
        let pipelines = Pipelines::new(gpu, texture_layout, pose_layout, &self.config);
        self.init = InitState::Initialized(Box::new(pipelines));
        log::info!("renderer initialised");
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameListener for Renderer {
    fn on_update(&mut self, _viewport: &Viewport, time: &FrameTime) {
        self.materials.update(time);
        self.models.update(time);
        for producer in &mut self.producers {
            producer.update(time, &mut self.textures);
        }
    }

    fn on_render(&mut self, gpu: &Gpu, viewport: &Viewport, target: &wgpu::TextureView) {
        let Some(active) = self.active else {
            return;
        };
        let handle = viewport.handle();
        if !self.viewports.contains_key(handle) || !self.scenes.contains_key(active) {
            return;
        }
        self.initialise(gpu);

        let Self {
            config,
            scenes,
            viewports,
            textures,
            materials,
            models,
            requests,
            providers,
            requested,
            init,
            ..
        } = self;
        let InitState::Initialized(pipelines) = &*init else {
            return;
        };

        let size = viewport.size();
        if size[0] == 0 || size[1] == 0 {
            log::warn!("viewport {handle:?} has zero size; framebuffer clamped to 1x1");
        }
        let (Some(slot), Some(texture_layout)) = (viewports.get_mut(handle), textures.layout()) else {
            return;
        };
        if slot.is_none() {
            log::debug!("viewport {handle:?} data created");
            *slot = Some(ViewportData {
                framebuffer: Framebuffer::new(gpu, texture_layout, size),
                elements: ElementArray::new(),
                camera: CameraBinding::new(&gpu.device, &pipelines.camera_layout, viewport.camera(), "viewport camera"),
                identity_camera: CameraBinding::new(
                    &gpu.device,
                    &pipelines.camera_layout,
                    &Camera::identity(),
                    "identity camera",
                ),
            });
        }
        let Some(data) = slot.as_mut() else {
            return;
        };
        if data.framebuffer.set_size(gpu, texture_layout, size) {
            log::debug!("viewport {handle:?} framebuffer resized to {}x{}", size[0], size[1]);
        }
        data.camera.write(&gpu.queue, viewport.camera());

        let Some(SceneEntry { scene, data: scene_data }) = scenes.get_mut(active) else {
            return;
        };
        if scene_data.is_none() {
            // New data must see everything the scene holds, not only recent changes.
            scene.resync();
            log::debug!("scene {active:?} data created");
        }
        let scene_data = scene_data.get_or_insert_with(|| SceneData {
            array: OctreeVertexArray::new(config.world_bounds, config.octree_cell_size),
        });
        scene_data.array.apply_changes(gpu, scene, materials);

        data.elements.update(gpu, viewport.elements(), viewport.camera(), size);

        request_missing_textures(&scene_data.array, materials, textures, requested, requests);
        let report = requests.process_batch(providers, textures, config.texture_batch_size);
        if report.drained > 0 {
            log::debug!(
                "texture batch: {} drained, {} stored, {} dropped",
                report.drained,
                report.stored,
                report.dropped.len()
            );
        }
        textures.upload_pending(gpu);
        models.upload_pending(gpu);
        models.write_poses(gpu);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewport frame"),
            });
        {
            let ctx = DrawContext {
                pipelines,
                textures,
                materials,
                models,
                camera: &data.camera.bind_group,
                identity_camera: &data.identity_camera.bind_group,
                frustum: config
                    .frustum_culling
                    .then(|| Frustum::from_matrix(viewport.camera().view_proj())),
            };
            let mut pass = data.framebuffer.bind(&mut encoder, config.clear_colour);
            scene_data.array.render(&mut pass, &ctx);
            data.elements.render(&mut pass, &ctx);
        }
        data.framebuffer.blit(&mut encoder, &pipelines.blit, target);
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Queue textures that freshly rebuilt geometry refers to but the storage lacks.
///
/// Only cells rebuilt this frame are inspected. Each name is queued once per
/// renderer; a name no provider could supply is not asked for again.
fn request_missing_textures(
    array: &OctreeVertexArray,
    materials: &MaterialStorage,
    textures: &TextureStorage,
    requested: &mut HashSet<String>,
    requests: &TextureRequests,
) {
    for material in array.rebuilt_materials() {
        let frames = match materials.get(material) {
            Some(material) => material.frames.clone(),
            None => vec![material.to_string()],
        };
        for name in frames {
            if textures.contains(&name) || !requested.insert(texture_key(&name)) {
                continue;
            }
            requests.request(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{bounds::Aabb, scene::Face};

    #[test]
    fn unknown_handles_are_ignored() {
        let mut renderer = Renderer::new();
        let scene = renderer.create_scene();
        renderer.remove_scene(scene);
        renderer.set_active_scene(scene);
        assert_eq!(renderer.active_scene(), None);
        assert!(renderer.scene(scene).is_none());
        renderer.remove_scene(scene);
    }

    #[test]
    fn only_rebuilt_cells_are_scanned_for_missing_textures() {
        let materials = MaterialStorage::new();
        let textures = TextureStorage::new();
        let requests = TextureRequests::new();
        let mut requested = HashSet::new();
        let mut scene = Scene::new();
        let mut array = OctreeVertexArray::new(Aabb::cube(1024.0), 64.0);
        let face = |x: f32, material: &str| {
            Face::new(vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]], [1.0; 4])
                .with_material(material, vec![[0.0, 0.0]; 3])
        };

        scene.add(face(-500.0, "brick"));
        array.stage(&mut scene, &materials);
        request_missing_textures(&array, &materials, &textures, &mut requested, &requests);
        assert_eq!(requests.pending(), 1);

        // An edit far away rebuilds one other cell; "brick" is not looked at again.
        requested.clear();
        scene.add(face(500.0, "sky"));
        array.stage(&mut scene, &materials);
        request_missing_textures(&array, &materials, &textures, &mut requested, &requests);
        assert_eq!(requests.pending(), 2);
        assert!(requested.contains("sky"));
        assert!(!requested.contains("brick"));

        array.stage(&mut scene, &materials);
        request_missing_textures(&array, &materials, &textures, &mut requested, &requests);
        assert_eq!(requests.pending(), 2);
    }

    #[test]
    fn removing_the_active_scene_clears_it() {
        let mut renderer = Renderer::new();
        let first = renderer.create_scene();
        let second = renderer.create_scene();
        renderer.set_active_scene(first);
        renderer.remove_scene(second);
        assert_eq!(renderer.active_scene(), Some(first));
        renderer.remove_scene(first);
        assert_eq!(renderer.active_scene(), None);
    }
}
