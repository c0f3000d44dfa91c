//! Off-screen render target of a viewport.
//!
//! A [`Framebuffer`] owns a colour target in the surface format and a depth
//! target. A frame renders into it through the pass returned by
//! [`Framebuffer::bind`] and is then copied onto the visible surface by
//! [`Framebuffer::blit`].

use crate::{context::Gpu, data_structures::texture::Texture};

#[derive(Debug)]
pub struct Framebuffer {
    colour: Texture,
    depth: Texture,
    blit_group: wgpu::BindGroup,
    size: [u32; 2],
}

impl Framebuffer {
    /// `layout` is the texture bind group layout used by the blit pipeline.
    /// Zero dimensions are clamped to 1.
    pub fn new(gpu: &Gpu, layout: &wgpu::BindGroupLayout, size: [u32; 2]) -> Self {
        let size = [size[0].max(1), size[1].max(1)];
        let colour = Texture::create_render_target(&gpu.device, size, gpu.format, "framebuffer colour");
        let depth = Texture::create_depth_texture(&gpu.device, size, "framebuffer depth");
        let blit_group = mk_blit_group(&gpu.device, layout, &colour);
        log::debug!("framebuffer created at {}x{}", size[0], size[1]);
        Self {
            colour,
            depth,
            blit_group,
            size,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn colour(&self) -> &Texture {
        &self.colour
    }

    /// Reallocate the targets if `size` differs. Returns whether it did.
    pub fn set_size(&mut self, gpu: &Gpu, layout: &wgpu::BindGroupLayout, size: [u32; 2]) -> bool {
        let size = [size[0].max(1), size[1].max(1)];
        if size == self.size {
            return false;
        }
        *self = Self::new(gpu, layout, size);
        true
    }

    /// Begin a pass that clears and renders into this framebuffer.
    ///
    /// The framebuffer stays bound for as long as the returned pass lives;
    /// dropping it unbinds.
    pub fn bind<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, clear: wgpu::Color) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("framebuffer pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.colour.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }

    /// Copy the colour target onto `target`, stretching it to fill.
    pub fn blit(&self, encoder: &mut wgpu::CommandEncoder, pipeline: &wgpu::RenderPipeline, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.blit_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Read the colour target back as RGBA8.
    pub async fn read_pixels(&self, gpu: &Gpu) -> anyhow::Result<image::RgbaImage> {
        self.colour.read_pixels(gpu).await
    }
}

fn mk_blit_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, colour: &Texture) -> wgpu::BindGroup {
    let sampler = match &colour.sampler {
        Some(sampler) => sampler.clone(),
        None => device.create_sampler(&wgpu::SamplerDescriptor::default()),
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&colour.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
        label: Some("framebuffer blit"),
    })
}
