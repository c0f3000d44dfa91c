use crate::{
    data_structures::vertex::{SceneVertex, Vertex},
    pipelines::{depth_tested, mk_render_pipeline},
};

/// Pipeline for [`SceneVertex`] geometry of one topology.
///
/// Overlay pipelines still attach the depth target (they share the scene's
/// render pass) but neither test nor write it, so elements stay on top.
pub fn mk_passthrough_pipeline(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    cull_back_faces: bool,
    overlay: bool,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Passthrough Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, texture_bind_group_layout],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Passthrough Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("passthrough.wgsl").into()),
    };

    let cull_mode = (cull_back_faces && topology == wgpu::PrimitiveTopology::TriangleList)
        .then_some(wgpu::Face::Back);
    let depth = if overlay {
        wgpu::DepthStencilState {
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            ..depth_tested()
        }
    } else {
        depth_tested()
    };

    mk_render_pipeline(
        device,
        &format!("passthrough {topology:?}{}", if overlay { " overlay" } else { "" }),
        &layout,
        format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        Some(depth),
        &[SceneVertex::desc()],
        shader,
    )
}
