use crate::pipelines::mk_render_pipeline;

/// Full-screen copy of a sampled texture. Draw with `draw(0..3, 0..1)`.
pub fn mk_blit_pipeline(
    device: &wgpu::Device,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Blit Pipeline Layout"),
        bind_group_layouts: &[texture_bind_group_layout],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Blit Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        "blit",
        &layout,
        format,
        None,
        wgpu::PrimitiveState::default(),
        None,
        &[],
        shader,
    )
}
