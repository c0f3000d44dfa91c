//! Render pipelines.
//!
//! All pipelines render into a [`Framebuffer`](crate::data_structures::framebuffer::Framebuffer)
//! whose colour target uses the surface format and whose depth target uses
//! [`Texture::DEPTH_FORMAT`]. They are built once, during the renderer's
//! global initialisation, and shared by every viewport.
//!
//! - `passthrough`: scene faces, lines and light markers, plus overlay elements
//! - `model`: instanced models with an animated pose
//! - `blit`: copies a framebuffer onto the visible surface

use crate::{
    camera::camera_bind_group_layout, config::RendererConfig, context::Gpu,
    data_structures::texture::Texture, render::Topology,
};

pub mod blit;
pub mod model;
pub mod passthrough;

#[derive(Debug)]
pub struct Pipelines {
    pub camera_layout: wgpu::BindGroupLayout,
    pub triangles: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
    pub points: wgpu::RenderPipeline,
    pub overlay_triangles: wgpu::RenderPipeline,
    pub overlay_lines: wgpu::RenderPipeline,
    pub overlay_points: wgpu::RenderPipeline,
    pub model: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        gpu: &Gpu,
        texture_layout: &wgpu::BindGroupLayout,
        pose_layout: &wgpu::BindGroupLayout,
        config: &RendererConfig,
    ) -> Self {
        let device = &gpu.device;
        let camera_layout = camera_bind_group_layout(device);
        let passthrough = |topology, overlay: bool| {
            passthrough::mk_passthrough_pipeline(
                device,
                &camera_layout,
                texture_layout,
                gpu.format,
                topology,
                config.cull_back_faces && !overlay,
                overlay,
            )
        };
        let triangles = passthrough(wgpu::PrimitiveTopology::TriangleList, false);
        let lines = passthrough(wgpu::PrimitiveTopology::LineList, false);
        let points = passthrough(wgpu::PrimitiveTopology::PointList, false);
        let overlay_triangles = passthrough(wgpu::PrimitiveTopology::TriangleList, true);
        let overlay_lines = passthrough(wgpu::PrimitiveTopology::LineList, true);
        let overlay_points = passthrough(wgpu::PrimitiveTopology::PointList, true);
        let model = model::mk_model_pipeline(device, &camera_layout, pose_layout, gpu.format);
        let blit = blit::mk_blit_pipeline(device, texture_layout, gpu.format);
        log::info!("render pipelines created for {:?}", gpu.format);
        Self {
            camera_layout,
            triangles,
            lines,
            points,
            overlay_triangles,
            overlay_lines,
            overlay_points,
            model,
            blit,
        }
    }

    /// The passthrough pipeline for `topology`. Overlay pipelines ignore depth.
    pub fn passthrough(&self, topology: Topology, overlay: bool) -> &wgpu::RenderPipeline {
        match (topology, overlay) {
            (Topology::Triangles, false) => &self.triangles,
            (Topology::Lines, false) => &self.lines,
            (Topology::Points, false) => &self.points,
            (Topology::Triangles, true) => &self.overlay_triangles,
            (Topology::Lines, true) => &self.overlay_lines,
            (Topology::Points, true) => &self.overlay_points,
        }
    }
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    primitive: wgpu::PrimitiveState,
    depth_stencil: Option<wgpu::DepthStencilState>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive,
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

/// Depth state for geometry that is tested against and written into the depth target.
pub fn depth_tested() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: Texture::DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
