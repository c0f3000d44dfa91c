//! Cameras, the camera uniform and frustum culling.
//!
//! A [`Camera`] is a view and projection matrix pair. Perspective and
//! orthographic constructors follow the usual right-handed OpenGL conventions
//! and are converted into wgpu's clip space (depth in `[0, 1]`) by
//! [`Camera::view_proj`].

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};

use crate::data_structures::bounds::Aabb;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl Camera {
    /// Positions are passed through untouched: world space is clip space.
    pub fn identity() -> Self {
        Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }

    pub fn perspective(
        eye: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fovy: cgmath::Deg<f32>,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Matrix4::look_at_rh(eye, target, up),
            projection: OPENGL_TO_WGPU_MATRIX * cgmath::perspective(fovy, aspect, near, far),
        }
    }

    /// A top-down 2D view of the XY plane, as used by the editor's grid views.
    ///
    /// `zoom` is pixels per world unit; `width`/`height` are the viewport size
    /// in pixels.
    pub fn orthographic(centre: Point3<f32>, zoom: f32, width: u32, height: u32) -> Self {
        let zoom = zoom.max(f32::EPSILON);
        let half_w = width.max(1) as f32 / zoom * 0.5;
        let half_h = height.max(1) as f32 / zoom * 0.5;
        let eye = centre + Vector3::unit_z() * 65536.0;
        Self {
            view: Matrix4::look_at_rh(eye, centre, Vector3::unit_y()),
            projection: OPENGL_TO_WGPU_MATRIX
                * cgmath::ortho(-half_w, half_w, -half_h, half_h, 1.0, 131072.0),
        }
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// Project a world position into pixel coordinates (origin top-left).
    ///
    /// Returns `None` for points behind the camera.
    pub fn world_to_screen(&self, point: Point3<f32>, size: [u32; 2]) -> Option<[f32; 2]> {
        let clip = self.view_proj() * point.to_homogeneous();
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some([
            (ndc.x + 1.0) * 0.5 * size[0] as f32,
            (1.0 - ndc.y) * 0.5 * size[1] as f32,
        ])
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::identity()
    }
}

/// Data stored in the camera uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::<f32>::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&Camera> for CameraUniform {
    fn from(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().into(),
        }
    }
}

pub fn camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("camera_bind_group_layout"),
    })
}

/// A camera uniform buffer and the bind group pointing at it.
#[derive(Debug)]
pub struct CameraBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, camera: &Camera, label: &str) -> Self {
        use wgpu::util::DeviceExt;
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[CameraUniform::from(camera)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[CameraUniform::from(camera)]));
    }
}

/// Six clip planes in world space, normals pointing inwards.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extract planes from a wgpu-style view-projection matrix (depth in `[0, 1]`).
    pub fn from_matrix(m: Matrix4<f32>) -> Self {
        let row = |i: usize| Vector4::new(m.x[i], m.y[i], m.z[i], m.w[i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(|plane| {
            let length = plane.truncate().magnitude();
            if length > f32::EPSILON { plane / length } else { plane }
        });
        Self { planes }
    }

    /// Conservative test: `false` only if the box is fully outside one plane.
    pub fn intersects(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // The box corner furthest along the plane normal.
            let p = Vector3::new(
                if plane.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.truncate().dot(p) + plane.w >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_camera_maps_clip_space_to_pixels() {
        let camera = Camera::identity();
        let centre = camera.world_to_screen(Point3::new(0.0, 0.0, 0.5), [200, 100]);
        assert_eq!(centre, Some([100.0, 50.0]));
        let top_left = camera.world_to_screen(Point3::new(-1.0, 1.0, 0.5), [200, 100]);
        assert_eq!(top_left, Some([0.0, 0.0]));
    }

    #[test]
    fn frustum_rejects_boxes_behind_the_camera() {
        let camera = Camera::perspective(
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
            cgmath::Deg(60.0),
            1.0,
            0.1,
            100.0,
        );
        let frustum = Frustum::from_matrix(camera.view_proj());
        let in_front = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let behind = Aabb::new(Point3::new(-1.0, -1.0, 20.0), Point3::new(1.0, 1.0, 22.0));
        assert!(frustum.intersects(&in_front));
        assert!(!frustum.intersects(&behind));
    }
}
