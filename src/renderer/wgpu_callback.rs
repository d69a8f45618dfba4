//! egui_wgpu integration for 3D scene rendering
//!
//! The scene is drawn into an offscreen target with a depth buffer, then
//! blitted into egui's render pass.

use glam::Mat4;
use parking_lot::RwLock;
use std::sync::Arc;
use wgpu::util::DeviceExt;

use super::camera::CameraUniform;
use super::earth::{generate_earth_sphere, EarthVertex};
use super::markers::{MarkerInstance, OrbitVertex};
use super::scene::{SceneError, SceneFrame};
use super::starfield::StarVertex;
use super::surface::RenderSurface;
use super::textures::{create_sampler, TextureData};
use crate::propagation::earth_radius_scene;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_MARKER_CAPACITY: usize = 1024;
const INITIAL_PATH_CAPACITY: usize = 2048;

/// Uniforms for Earth rendering
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct EarthUniforms {
    model: [[f32; 4]; 4],
    sun_direction: [f32; 4],
    base_color: [f32; 4],
    /// x: ambient, y: 1.0 when the surface texture is bound
    params: [f32; 4],
}

/// A vertex buffer that grows to fit whatever it is handed
struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
    len: usize,
    stride: usize,
    label: &'static str,
}

impl DynamicBuffer {
    fn new(device: &wgpu::Device, label: &'static str, stride: usize, capacity: usize) -> Self {
        Self {
            buffer: Self::allocate(device, label, stride, capacity),
            capacity,
            len: 0,
            stride,
            label,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &'static str,
        stride: usize,
        capacity: usize,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity.max(1) * stride) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload<T: bytemuck::Pod>(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, items: &[T]) {
        if items.len() > self.capacity {
            let capacity = items.len().next_power_of_two();
            log::debug!("Growing {} to {} entries", self.label, capacity);
            self.buffer = Self::allocate(device, self.label, self.stride, capacity);
            self.capacity = capacity;
        }
        if !items.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(items));
        }
        self.len = items.len();
    }
}

/// GPU resources for 3D scene rendering, stored in callback_resources
pub struct SceneRenderResources {
    // Offscreen render target
    offscreen_texture: wgpu::Texture,
    offscreen_view: wgpu::TextureView,
    offscreen_size: (u32, u32),
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    target_format: wgpu::TextureFormat,

    // Camera
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    // Earth
    earth_vertex_buffer: wgpu::Buffer,
    earth_index_buffer: wgpu::Buffer,
    earth_index_count: u32,
    earth_pipeline: wgpu::RenderPipeline,
    earth_uniform_buffer: wgpu::Buffer,
    earth_bind_group_layout: wgpu::BindGroupLayout,
    earth_bind_group: wgpu::BindGroup,
    earth_sampler: wgpu::Sampler,
    earth_texture: wgpu::Texture,
    uploaded_earth_texture: Option<Arc<TextureData>>,

    // Starfield (point list)
    star_pipeline: wgpu::RenderPipeline,
    stars: DynamicBuffer,
    uploaded_stars: Option<Arc<Vec<StarVertex>>>,

    // Markers (instanced billboards)
    marker_pipeline: wgpu::RenderPipeline,
    markers: DynamicBuffer,
    uploaded_markers: Option<Arc<Vec<MarkerInstance>>>,

    // Orbit paths (line list)
    path_pipeline: wgpu::RenderPipeline,
    paths: DynamicBuffer,
    uploaded_paths: Option<Arc<Vec<OrbitVertex>>>,

    // Blit pipeline (for drawing offscreen texture to egui)
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    blit_bind_group: wgpu::BindGroup,
    blit_sampler: wgpu::Sampler,

    // Latest frame from the scene manager
    render_data: RwLock<Option<SceneFrame>>,
}

impl SceneRenderResources {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        log::info!("Initializing SceneRenderResources ({}x{})", width, height);

        let (offscreen_texture, offscreen_view) =
            Self::create_offscreen_texture(device, width, height, target_format);
        let (depth_texture, depth_view) = Self::create_depth_texture(device, width, height);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Earth mesh at the scene-scale radius
        let (earth_vertices, earth_indices) = generate_earth_sphere(earth_radius_scene(), 64, 32);

        let earth_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Earth Vertex Buffer"),
            contents: bytemuck::cast_slice(&earth_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let earth_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Earth Index Buffer"),
            contents: bytemuck::cast_slice(&earth_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let earth_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Earth Uniform Buffer"),
            size: std::mem::size_of::<EarthUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let earth_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Earth Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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

        // Placeholder until a surface image arrives; the shader ignores it
        let earth_texture =
            TextureData::solid([255, 255, 255, 255]).create_texture(device, queue, "Earth Placeholder");
        let earth_sampler = create_sampler(device, "Earth Sampler");
        let earth_bind_group = Self::create_earth_bind_group(
            device,
            &earth_bind_group_layout,
            &earth_uniform_buffer,
            &earth_texture,
            &earth_sampler,
        );

        let earth_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Earth Shader"),
            source: wgpu::ShaderSource::Wgsl(EARTH_SHADER.into()),
        });

        let earth_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Earth Pipeline Layout"),
                bind_group_layouts: &[&camera_bind_group_layout, &earth_bind_group_layout],
                push_constant_ranges: &[],
            });

        let earth_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Earth Pipeline"),
            layout: Some(&earth_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &earth_shader,
                entry_point: Some("vs_main"),
                buffers: &[EarthVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &earth_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let star_pipeline = Self::create_camera_pipeline(
            device,
            &camera_bind_group_layout,
            target_format,
            CameraPipeline {
                label: "Star",
                source: STAR_SHADER,
                buffer: StarVertex::desc(),
                topology: wgpu::PrimitiveTopology::PointList,
                depth_write: false,
            },
        );
        let marker_pipeline = Self::create_camera_pipeline(
            device,
            &camera_bind_group_layout,
            target_format,
            CameraPipeline {
                label: "Marker",
                source: MARKER_SHADER,
                buffer: MarkerInstance::desc(),
                topology: wgpu::PrimitiveTopology::TriangleList,
                depth_write: true,
            },
        );
        let path_pipeline = Self::create_camera_pipeline(
            device,
            &camera_bind_group_layout,
            target_format,
            CameraPipeline {
                label: "Orbit Path",
                source: PATH_SHADER,
                buffer: OrbitVertex::desc(),
                topology: wgpu::PrimitiveTopology::LineList,
                depth_write: false,
            },
        );

        let stars = DynamicBuffer::new(
            device,
            "Star Buffer",
            std::mem::size_of::<StarVertex>(),
            super::starfield::DEFAULT_STAR_COUNT,
        );
        let markers = DynamicBuffer::new(
            device,
            "Marker Instance Buffer",
            std::mem::size_of::<MarkerInstance>(),
            INITIAL_MARKER_CAPACITY,
        );
        let paths = DynamicBuffer::new(
            device,
            "Orbit Path Buffer",
            std::mem::size_of::<OrbitVertex>(),
            INITIAL_PATH_CAPACITY,
        );

        // Blit pipeline (to draw offscreen texture to egui's render pass)
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Blit Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let blit_bind_group = Self::create_blit_bind_group(
            device,
            &blit_bind_group_layout,
            &offscreen_view,
            &blit_sampler,
        );

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_bind_group_layout],
            push_constant_ranges: &[],
        });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            offscreen_texture,
            offscreen_view,
            offscreen_size: (width, height),
            depth_texture,
            depth_view,
            target_format,
            camera_buffer,
            camera_bind_group,
            earth_vertex_buffer,
            earth_index_buffer,
            earth_index_count: earth_indices.len() as u32,
            earth_pipeline,
            earth_uniform_buffer,
            earth_bind_group_layout,
            earth_bind_group,
            earth_sampler,
            earth_texture,
            uploaded_earth_texture: None,
            star_pipeline,
            stars,
            uploaded_stars: None,
            marker_pipeline,
            markers,
            uploaded_markers: None,
            path_pipeline,
            paths,
            uploaded_paths: None,
            blit_pipeline,
            blit_bind_group_layout,
            blit_bind_group,
            blit_sampler,
            render_data: RwLock::new(None),
        }
    }

    fn create_camera_pipeline(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        target_format: wgpu::TextureFormat,
        desc: CameraPipeline,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[camera_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[desc.buffer],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: desc.depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_earth_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniforms: &wgpu::Buffer,
        texture: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Earth Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_offscreen_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Replace the frame drawn on the next paint
    pub fn set_render_data(&self, frame: SceneFrame) {
        *self.render_data.write() = Some(frame);
    }

    /// Resize offscreen buffers if needed
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.offscreen_size != (width, height) && width > 0 && height > 0 {
            let (offscreen_texture, offscreen_view) =
                Self::create_offscreen_texture(device, width, height, self.target_format);
            let (depth_texture, depth_view) = Self::create_depth_texture(device, width, height);

            self.blit_bind_group = Self::create_blit_bind_group(
                device,
                &self.blit_bind_group_layout,
                &offscreen_view,
                &self.blit_sampler,
            );

            self.offscreen_texture = offscreen_texture;
            self.offscreen_view = offscreen_view;
            self.depth_texture = depth_texture;
            self.depth_view = depth_view;
            self.offscreen_size = (width, height);
        }
    }

    /// Upload whatever changed since the last frame. Frame contents are
    /// shared `Arc`s, so pointer equality means nothing to do.
    fn sync_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let Some(frame) = self.render_data.read().clone() else {
            return;
        };

        if !same_arc(&self.uploaded_stars, &frame.stars) {
            self.stars.upload(device, queue, &frame.stars);
            self.uploaded_stars = Some(frame.stars);
        }
        if !same_arc(&self.uploaded_markers, &frame.markers) {
            self.markers.upload(device, queue, &frame.markers);
            self.uploaded_markers = Some(frame.markers);
        }
        if !same_arc(&self.uploaded_paths, &frame.paths) {
            self.paths.upload(device, queue, &frame.paths);
            self.uploaded_paths = Some(frame.paths);
        }

        if let Some(texture) = frame.earth_texture {
            if !same_arc(&self.uploaded_earth_texture, &texture) {
                self.earth_texture = texture.create_texture(device, queue, "Earth Surface");
                self.earth_bind_group = Self::create_earth_bind_group(
                    device,
                    &self.earth_bind_group_layout,
                    &self.earth_uniform_buffer,
                    &self.earth_texture,
                    &self.earth_sampler,
                );
                self.uploaded_earth_texture = Some(texture);
            }
        }
    }

    /// Render the 3D scene to offscreen buffer
    pub fn render_offscreen(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder) {
        let data = self.render_data.read();

        if let Some(frame) = data.as_ref() {
            let camera_uniform = CameraUniform::from_camera(&frame.camera, frame.aspect_ratio);
            queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));

            let has_texture = frame.earth_texture.is_some() && self.uploaded_earth_texture.is_some();
            let earth_uniforms = EarthUniforms {
                model: Mat4::IDENTITY.to_cols_array_2d(),
                sun_direction: frame.sun_direction.extend(0.0).to_array(),
                base_color: frame.earth_color,
                params: [frame.ambient, if has_texture { 1.0 } else { 0.0 }, 0.0, 0.0],
            };
            queue.write_buffer(
                &self.earth_uniform_buffer,
                0,
                bytemuck::bytes_of(&earth_uniforms),
            );
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Offscreen Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.offscreen_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.0,
                        g: 0.0,
                        b: 0.02,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        // Nothing presented yet (or released): just the clear color
        if data.is_none() {
            return;
        }

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        if self.stars.len > 0 {
            render_pass.set_pipeline(&self.star_pipeline);
            render_pass.set_vertex_buffer(0, self.stars.buffer.slice(..));
            render_pass.draw(0..self.stars.len as u32, 0..1);
        }

        render_pass.set_pipeline(&self.earth_pipeline);
        render_pass.set_bind_group(1, &self.earth_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.earth_vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.earth_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.earth_index_count, 0, 0..1);

        if self.paths.len > 1 {
            render_pass.set_pipeline(&self.path_pipeline);
            render_pass.set_vertex_buffer(0, self.paths.buffer.slice(..));
            render_pass.draw(0..self.paths.len as u32, 0..1);
        }

        if self.markers.len > 0 {
            render_pass.set_pipeline(&self.marker_pipeline);
            render_pass.set_vertex_buffer(0, self.markers.buffer.slice(..));
            // Two triangles per billboard
            render_pass.draw(0..6, 0..self.markers.len as u32);
        }
    }

    /// Blit the offscreen texture to egui's render pass
    pub fn blit(&self, render_pass: &mut wgpu::RenderPass<'static>) {
        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, &self.blit_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

struct CameraPipeline {
    label: &'static str,
    source: &'static str,
    buffer: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
    depth_write: bool,
}

fn same_arc<T>(uploaded: &Option<Arc<T>>, current: &Arc<T>) -> bool {
    uploaded
        .as_ref()
        .map(|u| Arc::ptr_eq(u, current))
        .unwrap_or(false)
}

/// Surface backed by eframe's wgpu renderer. Frames land in the
/// `SceneRenderResources` held in egui's callback resources and are drawn
/// by [`SceneCallback`].
pub struct WgpuSurface {
    render_state: egui_wgpu::RenderState,
}

impl WgpuSurface {
    pub fn install(render_state: &egui_wgpu::RenderState, width: u32, height: u32) -> Self {
        let resources = SceneRenderResources::new(
            &render_state.device,
            &render_state.queue,
            render_state.target_format,
            width,
            height,
        );
        render_state
            .renderer
            .write()
            .callback_resources
            .insert(resources);
        log::info!("wgpu 3D renderer initialized");

        Self {
            render_state: render_state.clone(),
        }
    }
}

impl RenderSurface for WgpuSurface {
    fn present(&mut self, frame: &SceneFrame) -> Result<(), SceneError> {
        let renderer = self.render_state.renderer.read();
        let resources = renderer
            .callback_resources
            .get::<SceneRenderResources>()
            .ok_or_else(|| SceneError::Surface("scene GPU resources missing".into()))?;
        resources.set_render_data(frame.clone());
        Ok(())
    }

    fn release(&mut self) {
        let removed = self
            .render_state
            .renderer
            .write()
            .callback_resources
            .remove::<SceneRenderResources>();
        if removed.is_some() {
            log::info!("Released scene GPU resources");
        }
    }
}

/// The callback that egui_wgpu will invoke
pub struct SceneCallback {
    pub viewport_size: (u32, u32),
}

impl egui_wgpu::CallbackTrait for SceneCallback {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        egui_encoder: &mut wgpu::CommandEncoder,
        callback_resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        if let Some(resources) = callback_resources.get_mut::<SceneRenderResources>() {
            resources.resize(device, self.viewport_size.0, self.viewport_size.1);
            resources.sync_buffers(device, queue);
            resources.render_offscreen(queue, egui_encoder);
        }
        Vec::new()
    }

    fn paint(
        &self,
        _info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        callback_resources: &egui_wgpu::CallbackResources,
    ) {
        if let Some(resources) = callback_resources.get::<SceneRenderResources>() {
            resources.blit(render_pass);
        }
    }
}

const EARTH_SHADER: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

struct EarthUniforms {
    model: mat4x4<f32>,
    sun_direction: vec4<f32>,
    base_color: vec4<f32>,
    params: vec4<f32>,
};

@group(1) @binding(0) var<uniform> earth: EarthUniforms;
@group(1) @binding(1) var surface_texture: texture_2d<f32>;
@group(1) @binding(2) var surface_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_pos = (earth.model * vec4<f32>(in.position, 1.0)).xyz;
    out.clip_position = camera.view_proj * vec4<f32>(world_pos, 1.0);
    out.normal = normalize((earth.model * vec4<f32>(in.normal, 0.0)).xyz);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let ambient = earth.params.x;
    let diffuse = max(dot(normalize(in.normal), normalize(earth.sun_direction.xyz)), 0.0);
    let light = ambient + (1.0 - ambient) * diffuse;

    let sampled = textureSample(surface_texture, surface_sampler, in.uv).rgb;
    let albedo = select(earth.base_color.rgb, sampled, earth.params.y > 0.5);
    return vec4<f32>(albedo * light, 1.0);
}
"#;

const STAR_SHADER: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) brightness: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) brightness: f32,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.brightness = in.brightness;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(vec3<f32>(in.brightness), 1.0);
}
"#;

const MARKER_SHADER: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

struct InstanceInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) size: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    instance: InstanceInput,
) -> VertexOutput {
    var offsets = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0)
    );
    let offset = offsets[vertex_index];

    // Roughly constant on-screen size, clamped so close markers stay small
    let dist = length(camera.camera_pos.xyz - instance.position);
    let half_size = clamp(instance.size * 0.004 * dist, 0.01, 0.25);

    let right = vec3<f32>(camera.view[0][0], camera.view[1][0], camera.view[2][0]);
    let up = vec3<f32>(camera.view[0][1], camera.view[1][1], camera.view[2][1]);
    let corner = instance.position + (right * offset.x + up * offset.y) * half_size;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(corner, 1.0);
    out.color = instance.color;
    out.uv = offset * 0.5 + 0.5;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.uv - vec2<f32>(0.5));
    let alpha = 1.0 - smoothstep(0.35, 0.5, dist);
    if (alpha < 0.01) {
        discard;
    }
    return vec4<f32>(in.color.rgb, in.color.a * alpha);
}
"#;

const PATH_SHADER: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

const BLIT_SHADER: &str = r#"
@group(0) @binding(0) var blit_texture: texture_2d<f32>;
@group(0) @binding(1) var blit_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    // Fullscreen triangle
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0)
    );

    var out: VertexOutput;
    let pos = positions[vertex_index];
    out.clip_position = vec4<f32>(pos, 0.0, 1.0);
    out.uv = pos * 0.5 + 0.5;
    out.uv.y = 1.0 - out.uv.y;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(blit_texture, blit_sampler, in.uv);
}
"#;
