//! wgpu implementation of the frame pipeline.
//!
//! Each frame the particle positions are uploaded as an instance buffer and
//! drawn as additive billboards into an HDR scene target. Bloom and
//! afterimage then run as fullscreen passes before the result is copied to
//! the swapchain.

mod post_process;
mod shaders;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::OrbitCamera;
use crate::error::GpuError;
use crate::render::{
    gaussian_kernel, RenderPipeline, SpriteTexture, AFTERIMAGE_CUTOFF, BLOOM_KERNEL_RADII,
    BLOOM_KNEE, BLOOM_MIP_COUNT,
};
use post_process::{additive_blend, linear_sampler, FullscreenPass, RenderTarget, HDR_FORMAT};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ParticleUniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    color: [f32; 4],
    size: f32,
    _padding: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BrightUniforms {
    threshold: f32,
    knee: f32,
    _padding: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BlurUniforms {
    direction: [f32; 2],
    texel: [f32; 2],
    radius: u32,
    _padding: [u32; 3],
    weights: [[f32; 4]; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CompositeUniforms {
    weights: [[f32; 4]; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct AfterimageUniforms {
    damping: f32,
    cutoff: f32,
    _padding: [f32; 2],
}

/// Size-dependent render targets.
struct Targets {
    scene: RenderTarget,
    bright: RenderTarget,
    blur_h: Vec<RenderTarget>,
    blur_v: Vec<RenderTarget>,
    history: [RenderTarget; 2],
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let mut blur_h = Vec::with_capacity(BLOOM_MIP_COUNT);
        let mut blur_v = Vec::with_capacity(BLOOM_MIP_COUNT);
        let (mut w, mut h) = (width, height);
        for _ in 0..BLOOM_MIP_COUNT {
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            blur_h.push(RenderTarget::new(device, "Bloom Blur H", w, h));
            blur_v.push(RenderTarget::new(device, "Bloom Blur V", w, h));
        }
        Self {
            scene: RenderTarget::new(device, "Scene Target", width, height),
            bright: RenderTarget::new(device, "Bright Target", width, height),
            blur_h,
            blur_v,
            history: [
                RenderTarget::new(device, "Afterimage History A", width, height),
                RenderTarget::new(device, "Afterimage History B", width, height),
            ],
        }
    }
}

/// Bind groups over the current [`Targets`].
struct BindGroups {
    bright: wgpu::BindGroup,
    /// (horizontal, vertical) per mip level.
    blur: Vec<(wgpu::BindGroup, wgpu::BindGroup)>,
    composite: wgpu::BindGroup,
    /// Indexed by the history slot being written.
    afterimage: [wgpu::BindGroup; 2],
    /// Indexed by the history slot being shown.
    blit: [wgpu::BindGroup; 2],
}

/// The full frame pipeline on the GPU.
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pipeline: RenderPipeline,

    particle_pipeline: wgpu::RenderPipeline,
    particle_bind_group: wgpu::BindGroup,
    particle_uniforms: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,

    post: PostPasses,
    targets: Targets,
    bind_groups: BindGroups,
    /// History slot written this frame.
    history_slot: usize,
}

impl GpuRenderer {
    /// Create the device, surface and every pass for `window`.
    pub async fn new(
        window: Arc<Window>,
        pipeline: RenderPipeline,
        particle_count: usize,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sampler = linear_sampler(&device);

        // Base pass
        let sprite = SpriteTexture::soft_circle(pipeline.sprite.texture_size);
        let sprite_texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("Sprite Texture"),
                size: wgpu::Extent3d {
                    width: sprite.size(),
                    height: sprite.size(),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            sprite.as_bytes(),
        );
        let sprite_view = sprite_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let particle_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Uniforms"),
            size: std::mem::size_of::<ParticleUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instance_capacity = particle_count.max(1);
        let instance_buffer = create_instance_buffer(&device, instance_capacity);

        let particle_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let particle_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Bind Group"),
            layout: &particle_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&sprite_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::PARTICLE_SHADER.into()),
        });

        let particle_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&particle_layout],
            push_constant_ranges: &[],
        });

        let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&particle_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &particle_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vec3>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &particle_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::SrcAlpha,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::Zero,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            // Overlapping sprites blend instead of occluding.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let post = PostPasses::new(&device, &pipeline, surface_format);
        let targets = Targets::new(&device, config.width, config.height);
        let bind_groups = post.bind_groups(&device, &queue, &targets);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            particle_pipeline,
            particle_bind_group,
            particle_uniforms,
            instance_buffer,
            instance_capacity,
            instance_count: 0,
            post,
            targets,
            bind_groups,
            history_slot: 0,
        })
    }

    /// Reconfigure the surface and recreate every size-dependent target.
    ///
    /// The afterimage history starts over at the new size.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.targets = Targets::new(&self.device, new_size.width, new_size.height);
            self.bind_groups = self.post.bind_groups(&self.device, &self.queue, &self.targets);
            self.history_slot = 0;
        }
    }

    /// Upload `positions` and run every stage, presenting the result.
    pub fn render(&mut self, positions: &[Vec3], camera: &OrbitCamera) -> Result<(), wgpu::SurfaceError> {
        self.upload(positions, camera);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let bg = self.pipeline.background;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.scene.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.x as f64,
                            g: bg.y as f64,
                            b: bg.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.particle_pipeline);
            render_pass.set_bind_group(0, &self.particle_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            render_pass.draw(0..6, 0..self.instance_count);
        }

        if self.pipeline.bloom_active() {
            let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
            self.post.bright.draw(
                &mut encoder,
                &self.targets.bright.view,
                &self.bind_groups.bright,
                clear,
            );
            for (level, (h, v)) in self.bind_groups.blur.iter().enumerate() {
                let blur = &self.post.blur;
                blur.draw(&mut encoder, &self.targets.blur_h[level].view, h, clear);
                blur.draw(&mut encoder, &self.targets.blur_v[level].view, v, clear);
            }
            self.post.composite.draw(
                &mut encoder,
                &self.targets.scene.view,
                &self.bind_groups.composite,
                wgpu::LoadOp::Load,
            );
        }

        let slot = self.history_slot;
        self.post.afterimage.draw(
            &mut encoder,
            &self.targets.history[slot].view,
            &self.bind_groups.afterimage[slot],
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
        );
        self.post.blit.draw(
            &mut encoder,
            &view,
            &self.bind_groups.blit[slot],
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.history_slot = 1 - slot;

        Ok(())
    }

    fn upload(&mut self, positions: &[Vec3], camera: &OrbitCamera) {
        let aspect = self.config.width as f32 / self.config.height as f32;
        let sprite = &self.pipeline.sprite;
        let uniforms = ParticleUniforms {
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.projection_matrix(aspect).to_cols_array_2d(),
            color: sprite.color.extend(sprite.opacity).to_array(),
            size: sprite.size,
            _padding: [0.0; 3],
        };
        self.queue
            .write_buffer(&self.particle_uniforms, 0, bytemuck::bytes_of(&uniforms));

        if positions.len() > self.instance_capacity {
            self.instance_capacity = positions.len();
            self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
        }
        self.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(positions));
        self.instance_count = positions.len() as u32;
    }
}

/// Fullscreen stages after the base pass, with their fixed uniforms.
struct PostPasses {
    sampler: wgpu::Sampler,
    bright: FullscreenPass,
    blur: FullscreenPass,
    composite: FullscreenPass,
    afterimage: FullscreenPass,
    blit: FullscreenPass,
    bright_uniforms: wgpu::Buffer,
    /// (horizontal, vertical) per mip level; texel sizes change on resize.
    blur_uniforms: Vec<(wgpu::Buffer, wgpu::Buffer)>,
    composite_uniforms: wgpu::Buffer,
    afterimage_uniforms: wgpu::Buffer,
}

impl PostPasses {
    fn new(
        device: &wgpu::Device,
        pipeline: &RenderPipeline,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let bright = FullscreenPass::new(
            device,
            "Bloom Bright Pass",
            shaders::BRIGHT_FRAGMENT,
            1,
            true,
            HDR_FORMAT,
            None,
        );
        let blur = FullscreenPass::new(
            device,
            "Bloom Blur Pass",
            shaders::BLUR_FRAGMENT,
            1,
            true,
            HDR_FORMAT,
            None,
        );
        let composite = FullscreenPass::new(
            device,
            "Bloom Composite Pass",
            shaders::COMPOSITE_FRAGMENT,
            BLOOM_MIP_COUNT as u32,
            true,
            HDR_FORMAT,
            Some(additive_blend()),
        );
        let afterimage = FullscreenPass::new(
            device,
            "Afterimage Pass",
            shaders::AFTERIMAGE_FRAGMENT,
            2,
            true,
            HDR_FORMAT,
            None,
        );
        let blit = FullscreenPass::new(
            device,
            "Blit Pass",
            shaders::BLIT_FRAGMENT,
            1,
            false,
            surface_format,
            None,
        );

        let bright_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bright Uniforms"),
            contents: bytemuck::bytes_of(&BrightUniforms {
                threshold: pipeline.bloom.threshold,
                knee: BLOOM_KNEE,
                _padding: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let make_blur_buffer = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BlurUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let blur_uniforms = (0..BLOOM_MIP_COUNT)
            .map(|_| (make_blur_buffer("Blur Uniforms H"), make_blur_buffer("Blur Uniforms V")))
            .collect();

        let mut weights = [[0.0f32; 4]; 2];
        for (level, w) in pipeline.bloom_weights().into_iter().enumerate() {
            weights[level / 4][level % 4] = w;
        }
        let composite_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Uniforms"),
            contents: bytemuck::bytes_of(&CompositeUniforms { weights }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let afterimage_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Afterimage Uniforms"),
            contents: bytemuck::bytes_of(&AfterimageUniforms {
                damping: pipeline.afterimage.damping,
                cutoff: AFTERIMAGE_CUTOFF,
                _padding: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        Self {
            sampler: linear_sampler(device),
            bright,
            blur,
            composite,
            afterimage,
            blit,
            bright_uniforms,
            blur_uniforms,
            composite_uniforms,
            afterimage_uniforms,
        }
    }

    /// Write the size-dependent blur uniforms and bind every pass to `targets`.
    fn bind_groups(&self, device: &wgpu::Device, queue: &wgpu::Queue, targets: &Targets) -> BindGroups {
        let sampler = &self.sampler;

        let mut blur = Vec::with_capacity(BLOOM_MIP_COUNT);
        for level in 0..BLOOM_MIP_COUNT {
            let input = if level == 0 {
                &targets.bright.view
            } else {
                &targets.blur_v[level - 1].view
            };
            let (h_buf, v_buf) = &self.blur_uniforms[level];
            let texel = targets.blur_h[level].texel_size();
            let kernel = gaussian_kernel(BLOOM_KERNEL_RADII[level]);
            queue.write_buffer(h_buf, 0, bytemuck::bytes_of(&blur_uniforms([1.0, 0.0], texel, &kernel)));
            queue.write_buffer(v_buf, 0, bytemuck::bytes_of(&blur_uniforms([0.0, 1.0], texel, &kernel)));

            blur.push((
                self.blur.bind_group(device, &[input], sampler, Some(h_buf)),
                self.blur
                    .bind_group(device, &[&targets.blur_h[level].view], sampler, Some(v_buf)),
            ));
        }

        let mips: Vec<&wgpu::TextureView> = targets.blur_v.iter().map(|t| &t.view).collect();
        let afterimage = |slot: usize| {
            self.afterimage.bind_group(
                device,
                &[&targets.scene.view, &targets.history[1 - slot].view],
                sampler,
                Some(&self.afterimage_uniforms),
            )
        };
        let blit = |slot: usize| {
            self.blit
                .bind_group(device, &[&targets.history[slot].view], sampler, None)
        };

        BindGroups {
            bright: self.bright.bind_group(
                device,
                &[&targets.scene.view],
                sampler,
                Some(&self.bright_uniforms),
            ),
            blur,
            composite: self
                .composite
                .bind_group(device, &mips, sampler, Some(&self.composite_uniforms)),
            afterimage: [afterimage(0), afterimage(1)],
            blit: [blit(0), blit(1)],
        }
    }
}

fn blur_uniforms(direction: [f32; 2], texel: [f32; 2], kernel: &[f32]) -> BlurUniforms {
    let mut weights = [[0.0f32; 4]; 3];
    for (i, &w) in kernel.iter().enumerate().take(12) {
        weights[i / 4][i % 4] = w;
    }
    BlurUniforms {
        direction,
        texel,
        radius: kernel.len() as u32,
        _padding: [0; 3],
        weights,
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Particle Instance Buffer"),
        size: (capacity * std::mem::size_of::<Vec3>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 160);
        assert_eq!(std::mem::size_of::<BrightUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 80);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 32);
        assert_eq!(std::mem::size_of::<AfterimageUniforms>(), 16);
    }

    #[test]
    fn test_blur_uniforms_pack_kernel() {
        let kernel = gaussian_kernel(11);
        let u = blur_uniforms([1.0, 0.0], [0.5, 0.25], &kernel);
        assert_eq!(u.radius, 11);
        assert_eq!(u.weights[0][0], kernel[0]);
        assert_eq!(u.weights[2][2], kernel[10]);
        assert_eq!(u.weights[2][3], 0.0);
    }
}
