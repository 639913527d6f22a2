//! wgpu compute pipeline for the primary-ray kernel.

use slimtrace_gpu::{read_buffer, GpuContext, GpuError};
use slimtrace_math::Vec3;
use wgpu::util::DeviceExt;

use super::buffers::{pack_directions, GpuFrame};

/// Kernel workgroup edge, matching `@workgroup_size` in the shader.
const WORKGROUP_SIZE: u32 = 8;

/// Bytes per direction (`vec4<f32>`).
const DIRECTION_STRIDE: u64 = 16;

/// Bytes per output pixel (packed `u32`).
const PIXEL_STRIDE: u64 = 4;

/// Compute pipeline plus the buffers that outlive a frame.
pub struct RayTracePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    directions: Option<wgpu::Buffer>,
    output: Option<wgpu::Buffer>,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Upload `data` as a read-only storage buffer, padding empty slices to one
/// zeroed element since wgpu rejects zero-sized bindings.
fn storage_buffer<T: bytemuck::Pod>(ctx: &GpuContext, label: &str, data: &[T]) -> wgpu::Buffer {
    let padding = [<T as bytemuck::Zeroable>::zeroed()];
    let contents: &[T] = if data.is_empty() { &padding } else { data };
    ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(contents),
        usage: wgpu::BufferUsages::STORAGE,
    })
}

fn check_size(ctx: &GpuContext, what: &'static str, bytes: u64) -> Result<(), GpuError> {
    let limit = ctx.max_storage_buffer_size();
    if bytes > limit {
        return Err(GpuError::BufferTooLarge { what, bytes, limit });
    }
    Ok(())
}

impl RayTracePipeline {
    /// Compile the kernel and create the bind group layout.
    pub fn new(ctx: &GpuContext) -> Result<Self, GpuError> {
        ctx.scoped(|| {
            let shader_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Ray Trace Shader"),
                source: wgpu::ShaderSource::Wgsl(super::shaders::RAYTRACE_SHADER.into()),
            });

            let bind_group_layout =
                ctx.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("Ray Trace Bind Group Layout"),
                        entries: &[
                            // Frame uniforms
                            wgpu::BindGroupLayoutEntry {
                                binding: 0,
                                visibility: wgpu::ShaderStages::COMPUTE,
                                ty: wgpu::BindingType::Buffer {
                                    ty: wgpu::BufferBindingType::Uniform,
                                    has_dynamic_offset: false,
                                    min_binding_size: None,
                                },
                                count: None,
                            },
                            storage_entry(1, true), // directions
                            storage_entry(2, true), // primitives
                            storage_entry(3, true), // materials
                            storage_entry(4, true), // lights
                            storage_entry(5, true), // screen-space bounds
                            storage_entry(6, true), // bvh nodes
                            storage_entry(7, true), // bvh refs
                            storage_entry(8, false), // output
                        ],
                    });

            let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Ray Trace Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = ctx.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Ray Trace Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

            Self {
                pipeline,
                bind_group_layout,
                directions: None,
                output: None,
            }
        })
    }

    /// Copy the direction cache to device memory, growing the buffer when the
    /// resolution needs more room.
    pub fn upload_directions(&mut self, ctx: &GpuContext, directions: &[Vec3]) -> Result<(), GpuError> {
        let bytes = (directions.len().max(1) as u64) * DIRECTION_STRIDE;
        check_size(ctx, "ray directions", bytes)?;

        let packed = pack_directions(directions);
        ctx.scoped(|| {
            let fits = self.directions.as_ref().is_some_and(|b| b.size() >= bytes);
            if !fits {
                self.directions = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Directions Buffer"),
                    size: bytes,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
            }
            if let Some(buffer) = &self.directions {
                if !packed.is_empty() {
                    ctx.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&packed));
                }
            }
        })?;
        tracing::debug!(pixels = directions.len(), "ray directions uploaded");
        Ok(())
    }

    /// Trace one frame and return the packed RGBA8 pixels, row-major.
    pub fn render(&mut self, ctx: &GpuContext, frame: &GpuFrame) -> Result<Vec<u8>, GpuError> {
        let width = frame.uniforms.width;
        let height = frame.uniforms.height;
        let bytes = u64::from(width) * u64::from(height) * PIXEL_STRIDE;
        check_size(ctx, "output pixels", bytes)?;

        ctx.scoped(|| {
            let fits = self.output.as_ref().is_some_and(|b| b.size() >= bytes);
            if !fits {
                self.output = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Output Buffer"),
                    size: bytes,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                }));
            }
        })?;

        let (Some(directions), Some(output)) = (&self.directions, &self.output) else {
            return Err(GpuError::Dispatch("ray directions were never uploaded".into()));
        };

        ctx.scoped(|| {
            let uniform_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Frame Uniforms"),
                contents: bytemuck::bytes_of(&frame.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let primitives = storage_buffer(ctx, "Primitives Buffer", &frame.primitives);
            let materials = storage_buffer(ctx, "Materials Buffer", &frame.materials);
            let lights = storage_buffer(ctx, "Lights Buffer", &frame.lights);
            let bounds = storage_buffer(ctx, "Bounds Buffer", &frame.bounds);
            let nodes = storage_buffer(ctx, "BVH Buffer", &frame.nodes);
            let refs = storage_buffer(ctx, "BVH Refs Buffer", &frame.refs);

            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Ray Trace Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: directions.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: primitives.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: materials.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: lights.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: bounds.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: nodes.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 7,
                        resource: refs.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 8,
                        resource: output.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Ray Trace Encoder"),
                });
            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Ray Trace Pass"),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(&self.pipeline);
                compute_pass.set_bind_group(0, &bind_group, &[]);
                compute_pass.dispatch_workgroups(
                    width.div_ceil(WORKGROUP_SIZE),
                    height.div_ceil(WORKGROUP_SIZE),
                    1,
                );
            }
            ctx.queue.submit(std::iter::once(encoder.finish()));
        })?;

        read_buffer(ctx, output, bytes)
    }
}
