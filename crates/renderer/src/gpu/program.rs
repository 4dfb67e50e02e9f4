use std::borrow::Cow;

use wgpu::util::DeviceExt;
use wgpu::naga;

use crate::compile::{check_stage, check_wrapped_fragment};
use crate::types::{RenderError, ShaderDiagnostic, ShaderStage};

use super::uniforms::FrameUniforms;

/// Full-screen quad drawn as a four-vertex triangle strip.
const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, 1.0], [-1.0, -1.0], [1.0, 1.0], [1.0, -1.0]];

/// Layout objects shared by every program built on one device.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hero uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hero pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        Self {
            uniform_layout,
            pipeline_layout,
        }
    }
}

pub(crate) struct UniformBindings {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

pub(crate) struct QuadBuffer {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

/// A linked shader program plus the GPU buffers it owns.
pub struct ShaderProgram {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) bindings: UniformBindings,
    pub(crate) quad: QuadBuffer,
}

impl ShaderProgram {
    /// Compiles both stages and links them into a pipeline.
    ///
    /// `fragment` must already be wrapped. Sources are pre-validated with naga
    /// so the common failure (a typo in the fragment shader) surfaces as a
    /// diagnostic instead of a device validation error.
    pub(crate) fn link(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        target_format: wgpu::TextureFormat,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, RenderError> {
        check_stage(ShaderStage::Vertex, vertex).map_err(RenderError::ShaderCompile)?;
        check_wrapped_fragment(fragment).map_err(RenderError::ShaderCompile)?;

        let vertex_module = create_module(device, ShaderStage::Vertex, vertex)?;
        let fragment_module = create_module(device, ShaderStage::Fragment, fragment)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hero shader pipeline"),
            layout: Some(&layouts.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderLink(err.to_string()));
        }

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hero uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hero uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("hero quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            pipeline,
            bindings: UniformBindings { buffer, bind_group },
            quad: QuadBuffer {
                buffer: quad,
                vertex_count: QUAD_VERTICES.len() as u32,
            },
        })
    }

    /// Frees the program's buffers now rather than when the last handle drops.
    pub(crate) fn destroy(self) {
        self.bindings.buffer.destroy();
        self.quad.buffer.destroy();
    }
}

fn create_module(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    let (label, naga_stage) = match stage {
        ShaderStage::Vertex => ("hero vertex shader", naga::ShaderStage::Vertex),
        ShaderStage::Fragment => ("hero fragment shader", naga::ShaderStage::Fragment),
    };
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage: naga_stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::ShaderCompile(ShaderDiagnostic::new(
            stage,
            err.to_string(),
        ))),
        None => Ok(module),
    }
}
