//! Model instance transforms.
//!
//! Scene model instances and model animation keyframes are both expressed as
//! an [`Instance`]: translation, rotation and scale. Instances are packed into
//! [`InstanceRaw`] matrices for the model shader.

use cgmath::{Array, InnerSpace, One, VectorSpace, Zero};

use crate::data_structures::vertex::Vertex;

/// Translation, rotation and non-uniform scale, applied in reverse order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::zero(),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::from_value(1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
        }
    }

    /// Blend towards `other` by `t` in `[0, 1]`.
    ///
    /// Rotations are normalised-lerped along the shortest arc, which is close
    /// enough to slerp for neighbouring keyframes.
    pub fn interpolate(&self, other: &Instance, t: f32) -> Instance {
        let t = t.clamp(0.0, 1.0);
        let target = if self.rotation.dot(other.rotation) < 0.0 {
            -other.rotation
        } else {
            other.rotation
        };
        Instance {
            position: self.position.lerp(other.position, t),
            rotation: (self.rotation * (1.0 - t) + target * t).normalize(),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// Column-major world matrix as uploaded to instance buffers.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![5 => Float32x4, 6 => Float32x4, 7 => Float32x4, 8 => Float32x4];
}

impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        // One column of the world matrix per location.
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
