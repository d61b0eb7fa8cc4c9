//! wgpu implementation of [`Backend`].
//!
//! Calls are recorded during the frame and replayed into a single render pass
//! by [`WgpuBackend::encode`]. Each draw snapshots the active program's uniform
//! image into a dynamic-offset arena, so a program can be drawn several times
//! per frame with different uniforms. A clear starts the recording over, so a
//! frame whose present was skipped never leaks into the next one.
//!
//! Fixed binding layout shared by every program:
//! - `@group(0) @binding(0)`: the program's uniform block (dynamic offset)
//! - `@group(1) @binding(0..=3)`: `texture_2d<f32>` units 0..3
//! - `@group(1) @binding(4)`: filtering sampler
//!
//! Vertex input `i` of a program (in ascending location order) is fed from
//! vertex buffer slot `i`. Inputs the draw did not enable read a zeroed
//! per-instance fallback.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use super::backend::{Backend, BufferId, BufferKind, ProgramDesc, ProgramId, TextureId, Topology};
use crate::device::FrameTarget;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const TEXTURE_UNITS: usize = 4;
const ATTRIBUTE_STRIDE: u64 = 16;
const INITIAL_ARENA_BYTES: u64 = 64 * 1024;

struct Program {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    attribute_locations: Vec<u32>,
    staging: Vec<u8>,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: ProgramId,
    topology: Topology,
    depth_test: bool,
    blend: bool,
    /// Bit `i` set when vertex input `i` is sourced per-vertex.
    enabled_mask: u32,
}

struct DrawCommand {
    key: PipelineKey,
    uniform_offset: u32,
    vertex_buffers: Vec<Option<BufferId>>,
    index: BufferId,
    count: u32,
    textures: [Option<TextureId>; TEXTURE_UNITS],
    viewport: (u32, u32),
}

/// Draws and uniform snapshots waiting for the next [`WgpuBackend::encode`].
#[derive(Default)]
struct FrameRecording {
    clear_requested: bool,
    commands: Vec<DrawCommand>,
    snapshots: Vec<u8>,
}

impl FrameRecording {
    /// Drops everything recorded so far; the clear would overwrite it anyway.
    fn restart(&mut self) {
        self.clear_requested = true;
        self.commands.clear();
        self.snapshots.clear();
    }

    /// Appends `staging` at the next `align`ed offset and records `cmd` against it.
    fn record(&mut self, mut cmd: DrawCommand, staging: &[u8], align: usize) {
        let offset = self.snapshots.len().next_multiple_of(align);
        self.snapshots.resize(offset, 0);
        self.snapshots.extend_from_slice(staging);
        cmd.uniform_offset = offset as u32;
        self.commands.push(cmd);
    }
}

struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
    binding_size: u64,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    fallback_vertex: wgpu::Buffer,
    white: GpuTexture,

    programs: Vec<Program>,
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<GpuTexture>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    texture_groups: HashMap<[Option<TextureId>; TEXTURE_UNITS], wgpu::BindGroup>,
    arena: Option<UniformArena>,
    uniform_alignment: u32,

    // Immediate-mode state.
    active: Option<ProgramId>,
    attributes: BTreeMap<u32, BufferId>,
    index: Option<BufferId>,
    units: [Option<TextureId>; TEXTURE_UNITS],
    clear_color: [f32; 4],
    viewport: (u32, u32),
    depth_test: bool,
    blend: bool,

    recording: FrameRecording,
}

impl WgpuBackend {
    /// Creates a backend rendering into targets of `color_format` (depth is [`DEPTH_FORMAT`]).
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planet uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let mut texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_UNITS as u32)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: TEXTURE_UNITS as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planet textures bgl"),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("planet pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("planet sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let fallback_vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planet fallback attribute"),
            contents: &[0u8; ATTRIBUTE_STRIDE as usize],
            usage: wgpu::BufferUsages::VERTEX,
        });

        let white = upload_texture(device, queue, "planet white", 1, 1, &[255; 4]);
        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            color_format,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            sampler,
            fallback_vertex,
            white,
            programs: Vec::new(),
            buffers: Vec::new(),
            textures: Vec::new(),
            pipelines: HashMap::new(),
            texture_groups: HashMap::new(),
            arena: None,
            uniform_alignment,
            active: None,
            attributes: BTreeMap::new(),
            index: None,
            units: [None; TEXTURE_UNITS],
            clear_color: [0.0, 0.0, 0.0, 1.0],
            viewport: (1, 1),
            depth_test: false,
            blend: false,
            recording: FrameRecording::default(),
        }
    }

    /// Replays the recorded frame into one render pass on `target`.
    ///
    /// Color is cleared when [`Backend::clear`] was called this frame and loaded
    /// otherwise. Depth always starts at 1.0.
    pub fn encode(&mut self, encoder: &mut wgpu::CommandEncoder, target: &FrameTarget<'_>) {
        let FrameRecording {
            clear_requested: clear,
            commands,
            snapshots,
        } = std::mem::take(&mut self.recording);

        if commands.is_empty() && !clear {
            return;
        }

        for cmd in &commands {
            self.ensure_pipeline(cmd.key);
            self.ensure_texture_group(cmd.textures);
        }
        self.upload_snapshots(&snapshots);

        let [r, g, b, a] = self.clear_color;
        let color_load = if clear {
            wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            })
        } else {
            wgpu::LoadOp::Load
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("planet frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Some(arena) = self.arena.as_ref() else {
            return;
        };

        for cmd in &commands {
            let (Some(pipeline), Some(textures)) =
                (self.pipelines.get(&cmd.key), self.texture_groups.get(&cmd.textures))
            else {
                continue;
            };
            let Some(index) = self.buffers.get(cmd.index.0 as usize) else {
                continue;
            };

            let width = cmd.viewport.0.min(target.width);
            let height = cmd.viewport.1.min(target.height);
            if width == 0 || height == 0 {
                continue;
            }

            pass.set_pipeline(pipeline);
            pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            pass.set_bind_group(0, &arena.bind_group, &[cmd.uniform_offset]);
            pass.set_bind_group(1, textures, &[]);

            for (slot, buffer) in cmd.vertex_buffers.iter().enumerate() {
                let source = buffer
                    .and_then(|id| self.buffers.get(id.0 as usize))
                    .unwrap_or(&self.fallback_vertex);
                pass.set_vertex_buffer(slot as u32, source.slice(..));
            }

            pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..cmd.count, 0, 0..1);
        }
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let Some(program) = self.programs.get(key.program.0 as usize) else {
            return;
        };

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = program
            .attribute_locations
            .iter()
            .map(|&location| {
                [wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attributes
            .iter()
            .enumerate()
            .map(|(slot, attrs)| wgpu::VertexBufferLayout {
                array_stride: ATTRIBUTE_STRIDE,
                step_mode: if key.enabled_mask & (1 << slot) != 0 {
                    wgpu::VertexStepMode::Vertex
                } else {
                    wgpu::VertexStepMode::Instance
                },
                attributes: attrs,
            })
            .collect();

        let (topology, strip_index_format) = match key.topology {
            Topology::Triangles => (wgpu::PrimitiveTopology::TriangleList, None),
            Topology::TriangleStrip => (wgpu::PrimitiveTopology::TriangleStrip, Some(wgpu::IndexFormat::Uint32)),
            Topology::Lines => (wgpu::PrimitiveTopology::LineList, None),
            Topology::LineStrip => (wgpu::PrimitiveTopology::LineStrip, Some(wgpu::IndexFormat::Uint32)),
            Topology::Points => (wgpu::PrimitiveTopology::PointList, None),
        };

        let label = format!("{} pipeline", program.label);
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label.as_str()),
            layout: Some(&self.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some(program.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some(program.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: key.blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            // The water pass redraws the terrain sphere, so equal depth must pass.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: key.depth_test,
                depth_compare: if key.depth_test {
                    wgpu::CompareFunction::LessEqual
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built pipeline `{label}` ({:?})", key);
        self.pipelines.insert(key, pipeline);
    }

    fn ensure_texture_group(&mut self, units: [Option<TextureId>; TEXTURE_UNITS]) {
        if self.texture_groups.contains_key(&units) {
            return;
        }

        let views: Vec<&wgpu::TextureView> = units
            .iter()
            .map(|unit| {
                unit.and_then(|id| self.textures.get(id.0 as usize))
                    .map_or(&self.white.view, |t| &t.view)
            })
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .into_iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: TEXTURE_UNITS as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("planet textures bg"),
            layout: &self.texture_layout,
            entries: &entries,
        });
        self.texture_groups.insert(units, group);
    }

    fn binding_size(&self) -> u64 {
        let largest = self.programs.iter().map(|p| p.staging.len() as u64).max().unwrap_or(0);
        largest.max(16).next_multiple_of(16)
    }

    fn upload_snapshots(&mut self, snapshots: &[u8]) {
        let binding_size = self.binding_size();
        let needed = (snapshots.len() as u64 + binding_size).max(INITIAL_ARENA_BYTES);

        let stale = match &self.arena {
            Some(arena) => arena.capacity < needed || arena.binding_size != binding_size,
            None => true,
        };
        if stale {
            let capacity = needed.next_power_of_two();
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("planet uniform arena"),
                size: capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("planet uniform arena bg"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: NonZeroU64::new(binding_size),
                    }),
                }],
            });
            log::debug!("uniform arena resized to {capacity} bytes");
            self.arena = Some(UniformArena {
                buffer,
                bind_group,
                capacity,
                binding_size,
            });
        }

        if let Some(arena) = &self.arena {
            if !snapshots.is_empty() {
                let padded = snapshots.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize);
                let mut bytes = Cow::Borrowed(snapshots);
                if padded != snapshots.len() {
                    bytes.to_mut().resize(padded, 0);
                }
                self.queue.write_buffer(&arena.buffer, 0, &bytes);
            }
        }
    }
}

impl Backend for WgpuBackend {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, String> {
        let limits = self.device.limits();
        if u64::from(desc.uniform_size) > u64::from(limits.max_uniform_buffer_binding_size) {
            return Err(format!(
                "uniform block of {} bytes exceeds the device limit of {}",
                desc.uniform_size, limits.max_uniform_buffer_binding_size
            ));
        }
        if desc.attribute_locations.len() as u32 > limits.max_vertex_buffers {
            return Err(format!(
                "{} vertex inputs exceed the device limit of {}",
                desc.attribute_locations.len(),
                limits.max_vertex_buffers
            ));
        }

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{} vertex", desc.label).as_str()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(desc.vertex.source.to_string())),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{} fragment", desc.label).as_str()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(desc.fragment.source.to_string())),
        });

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(Program {
            label: desc.label.to_string(),
            vertex,
            fragment,
            vertex_entry: desc.vertex.entry_point.to_string(),
            fragment_entry: desc.fragment.entry_point.to_string(),
            attribute_locations: desc.attribute_locations.clone(),
            staging: vec![0; desc.uniform_size as usize],
        });
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.active = Some(program);
    }

    fn upload_uniform(&mut self, offset: u32, bytes: &[u8]) {
        let Some(program) = self.active.and_then(|id| self.programs.get_mut(id.0 as usize)) else {
            log::trace!("uniform upload with no active program");
            return;
        };
        let start = offset as usize;
        match program.staging.get_mut(start..start + bytes.len()) {
            Some(dst) => dst.copy_from_slice(bytes),
            None => log::warn!("program `{}`: uniform write at {offset} is out of bounds", program.label),
        }
    }

    fn create_buffer(&mut self, kind: BufferKind, label: &str, bytes: &[u8]) -> BufferId {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        // Zero-sized buffers cannot be sliced.
        let contents: &[u8] = if bytes.is_empty() { &[0; 16] } else { bytes };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(buffer);
        id
    }

    fn enable_attribute(&mut self, location: u32, buffer: BufferId) {
        self.attributes.insert(location, buffer);
    }

    fn disable_attribute(&mut self, location: u32) {
        self.attributes.remove(&location);
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.index = Some(buffer);
    }

    fn draw_elements(&mut self, topology: Topology, count: u32) {
        let (Some(id), Some(index)) = (self.active, self.index) else {
            log::warn!("draw without an active program or index buffer");
            return;
        };
        let Some(program) = self.programs.get(id.0 as usize) else {
            return;
        };

        let mut enabled_mask = 0;
        let vertex_buffers: Vec<Option<BufferId>> = program
            .attribute_locations
            .iter()
            .enumerate()
            .map(|(slot, location)| {
                let buffer = self.attributes.get(location).copied();
                if buffer.is_some() {
                    enabled_mask |= 1 << slot;
                }
                buffer
            })
            .collect();

        let cmd = DrawCommand {
            key: PipelineKey {
                program: id,
                topology,
                depth_test: self.depth_test,
                blend: self.blend,
                enabled_mask,
            },
            uniform_offset: 0,
            vertex_buffers,
            index,
            count,
            textures: self.units,
            viewport: self.viewport,
        };
        self.recording
            .record(cmd, &program.staging, self.uniform_alignment as usize);
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        let texture = upload_texture(&self.device, &self.queue, label, width, height, rgba);
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = Some(texture);
        }
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn clear(&mut self) {
        self.recording.restart();
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_blend(&mut self, enabled: bool) {
        self.blend = enabled;
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { _texture: texture, view }
}
