//! Model storage.
//!
//! Models are indexed triangle meshes placed in a scene through
//! [`ModelInstance`](crate::data_structures::scene::ModelInstance)s. A model
//! may carry a keyframe animation; its pose is sampled every frame and fed to
//! the model shader as a uniform, shared by all instances of that model.

use std::collections::HashMap;

use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::Gpu,
    data_structures::{instance::Instance, vertex::ModelVertex},
    viewport::FrameTime,
};

/// Keyframed whole-model animation, looping over the last timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelAnimation {
    pub keyframes: Vec<Instance>,
    /// Seconds, ascending, one per keyframe.
    pub timestamps: Vec<f32>,
}

impl ModelAnimation {
    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// The interpolated pose at `time` seconds.
    pub fn sample(&self, time: f32) -> Instance {
        let frames = self.keyframes.len().min(self.timestamps.len());
        if frames == 0 {
            return Instance::new();
        }
        let duration = self.duration();
        let t = if duration > 0.0 { time.rem_euclid(duration) } else { 0.0 };
        // First keyframe strictly after `t`.
        let next = self.timestamps[..frames].partition_point(|&stamp| stamp <= t);
        if next == 0 {
            return self.keyframes[0];
        }
        if next >= frames {
            return self.keyframes[frames - 1];
        }
        let (start, end) = (self.timestamps[next - 1], self.timestamps[next]);
        let span = end - start;
        let factor = if span > 0.0 { (t - start) / span } else { 0.0 };
        self.keyframes[next - 1].interpolate(&self.keyframes[next], factor)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub animation: Option<ModelAnimation>,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PoseUniform {
    pub pose: [[f32; 4]; 4],
}

impl From<&Instance> for PoseUniform {
    fn from(instance: &Instance) -> Self {
        Self {
            pose: instance.to_matrix().into(),
        }
    }
}

/// GPU side of a model.
#[derive(Debug)]
pub struct GpuModel {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pose_buffer: wgpu::Buffer,
    pub pose_bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
struct ModelEntry {
    data: ModelData,
    gpu: Option<GpuModel>,
}

#[derive(Debug, Default)]
pub struct ModelStorage {
    models: HashMap<String, ModelEntry>,
    pending: Vec<String>,
    elapsed: Duration,
    pose_layout: Option<wgpu::BindGroupLayout>,
}

impl ModelStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialise(&mut self, gpu: &Gpu) {
        if self.pose_layout.is_some() {
            return;
        }
        self.pose_layout = Some(pose_bind_group_layout(&gpu.device));
        log::info!("model storage initialised");
    }

    pub fn layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.pose_layout.as_ref()
    }

    /// Store a model under `name`. Returns `false` if the name is taken.
    pub fn insert(&mut self, name: &str, data: ModelData) -> bool {
        if self.models.contains_key(name) {
            return false;
        }
        self.pending.push(name.to_string());
        self.models.insert(name.to_string(), ModelEntry { data, gpu: None });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ModelData> {
        self.models.get(name).map(|entry| &entry.data)
    }

    /// The uploaded model, `None` while absent or not yet uploaded.
    pub fn gpu(&self, name: &str) -> Option<&GpuModel> {
        self.models.get(name)?.gpu.as_ref()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn update(&mut self, frame: &FrameTime) {
        self.elapsed = frame.elapsed;
    }

    /// Current pose of `name`; identity for static or unknown models.
    pub fn pose(&self, name: &str) -> Instance {
        self.models
            .get(name)
            .and_then(|entry| entry.data.animation.as_ref())
            .map(|animation| animation.sample(self.elapsed.as_secs_f32()))
            .unwrap_or_default()
    }

    pub fn upload_pending(&mut self, gpu: &Gpu) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        self.initialise(gpu);
        let Some(layout) = &self.pose_layout else {
            return 0;
        };
        let mut uploaded = 0;
        for name in self.pending.drain(..) {
            let Some(entry) = self.models.get_mut(&name) else {
                continue;
            };
            let data = &entry.data;
            let vertex_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} vertices")),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} indices")),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let pose_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} pose")),
                contents: bytemuck::cast_slice(&[PoseUniform::from(&Instance::new())]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let pose_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: pose_buffer.as_entire_binding(),
                }],
                label: Some("pose_bind_group"),
            });
            entry.gpu = Some(GpuModel {
                vertex_buffer,
                index_buffer,
                index_count: data.indices.len() as u32,
                pose_buffer,
                pose_bind_group,
            });
            uploaded += 1;
        }
        log::debug!("uploaded {uploaded} models");
        uploaded
    }

    /// Write the current pose of every animated, uploaded model.
    pub fn write_poses(&self, gpu: &Gpu) {
        let time = self.elapsed.as_secs_f32();
        for entry in self.models.values() {
            let (Some(animation), Some(model)) = (&entry.data.animation, &entry.gpu) else {
                continue;
            };
            let pose = PoseUniform::from(&animation.sample(time));
            gpu.queue
                .write_buffer(&model.pose_buffer, 0, bytemuck::cast_slice(&[pose]));
        }
    }
}

pub fn pose_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("pose_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    fn bounce() -> ModelAnimation {
        ModelAnimation {
            keyframes: vec![
                Instance::from(Vector3::new(0.0, 0.0, 0.0)),
                Instance::from(Vector3::new(0.0, 0.0, 10.0)),
                Instance::from(Vector3::new(0.0, 0.0, 0.0)),
            ],
            timestamps: vec![0.0, 1.0, 2.0],
        }
    }

    #[test]
    fn animation_interpolates_between_keyframes() {
        let pose = bounce().sample(0.5);
        assert!((pose.position.z - 5.0).abs() < 1e-5);
    }

    #[test]
    fn animation_loops() {
        let pose = bounce().sample(3.0);
        assert!((pose.position.z - 10.0).abs() < 1e-5);
    }

    #[test]
    fn static_models_have_the_identity_pose() {
        let mut storage = ModelStorage::new();
        let data = ModelData {
            vertices: vec![],
            indices: vec![],
            animation: None,
        };
        assert!(storage.insert("barrel", data.clone()));
        assert!(!storage.insert("barrel", data));
        assert_eq!(storage.pose("barrel"), Instance::new());
        assert_eq!(storage.pose("unknown"), Instance::new());
    }
}
