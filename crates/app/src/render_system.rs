//! Draws the scene into the frame controller's render pass.
//!
//! One pipeline and one vertex buffer per model. Each object pushes its
//! transform and tint as push constants and issues a single draw. The
//! pipeline is rebuilt whenever the frame's render pass differs from the one
//! it was built for, which only happens right after a chain rebuild while
//! the device is idle.

use std::sync::Arc;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use swapframe_renderer::vulkan::VulkanContext;
use swapframe_renderer::{FrameContext, FrameError, RenderPassParticipant, RenderResult};
use swapframe_rhi::buffer::{Buffer, BufferUsage};
use swapframe_rhi::command;
use swapframe_rhi::device::Device;
use swapframe_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use swapframe_rhi::shader::{Shader, ShaderStage};
use swapframe_rhi::{RhiError, vk};
use swapframe_scene::{Model, Scene, Vertex2D};
use tracing::{debug, info, warn};

/// Radians per second each object spins about Z.
const SPIN_RATE: f32 = 0.5;

const SHADER_SOURCE: &str = r#"
struct ObjectPush {
    transform: mat4x4<f32>,
    color: vec4<f32>,
}

var<push_constant> draw_data: ObjectPush;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = draw_data.transform * vec4<f32>(position, 0.0, 1.0);
    out.color = color * draw_data.color.rgb;
    return out;
}

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(frag.color, 1.0);
}
"#;

/// Per-draw data, laid out like `ObjectPush` in the shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct ObjectPush {
    transform: Mat4,
    color: Vec4,
}

impl ObjectPush {
    const STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::VERTEX;

    fn range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: Self::STAGES,
            offset: 0,
            size: size_of::<Self>() as u32,
        }
    }
}

/// Clip-space transform of an object on a surface with `aspect` width
/// over height, so the scene is not stretched horizontally.
fn clip_transform(aspect: f32, model: Mat4) -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0 / aspect, 1.0, 1.0)) * model
}

fn vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: size_of::<Vertex2D>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 2] {
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: std::mem::offset_of!(Vertex2D, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex2D, color) as u32,
        },
    ]
}

/// A model uploaded to the GPU.
struct GpuModel {
    model: Arc<Model>,
    buffer: Buffer,
    vertex_count: u32,
}

impl GpuModel {
    fn upload(device: &Arc<Device>, model: Arc<Model>) -> RenderResult<Self> {
        let vertex_count = u32::try_from(model.vertex_count()).map_err(|_| {
            RhiError::InvalidArgument(format!("model '{}' has too many vertices", model.name()))
        })?;
        let buffer = Buffer::new_with_data(device.clone(), BufferUsage::Vertex, model.as_bytes())?;
        debug!(
            "Uploaded model '{}': {} vertices",
            model.name(),
            vertex_count
        );
        Ok(Self {
            model,
            buffer,
            vertex_count,
        })
    }
}

/// Animates and draws every object that has a model.
///
/// Fields drop top to bottom: the pipeline goes before its layout and
/// shaders, and everything before the device.
pub struct SceneRenderer {
    scene: Scene,
    delta: Duration,
    pipeline: Option<Pipeline>,
    layout: PipelineLayout,
    vertex_shader: Shader,
    fragment_shader: Shader,
    /// Index-aligned with the scene's model ids.
    models: Vec<GpuModel>,
    device: Arc<Device>,
}

impl SceneRenderer {
    /// Compiles the shaders and uploads every model in `scene`.
    ///
    /// The pipeline itself is built on the first recorded frame, once the
    /// render pass is known.
    ///
    /// # Errors
    ///
    /// Returns the shader, allocation or Vulkan error.
    pub fn new(device: Arc<Device>, scene: Scene) -> RenderResult<Self> {
        let vertex_shader =
            Shader::from_wgsl(device.clone(), SHADER_SOURCE, ShaderStage::Vertex, "vs_main")?;
        let fragment_shader = Shader::from_wgsl(
            device.clone(),
            SHADER_SOURCE,
            ShaderStage::Fragment,
            "fs_main",
        )?;
        let layout = PipelineLayout::new(device.clone(), &[ObjectPush::range()])?;

        let mut models = Vec::with_capacity(scene.models().len());
        for (id, _) in scene.models().iter() {
            let shared = scene
                .models()
                .share(id)
                .map_err(|e| FrameError::ProtocolViolation(e.to_string()))?;
            models.push(GpuModel::upload(&device, shared)?);
        }

        info!("Scene renderer ready: {} model(s) uploaded", models.len());
        Ok(Self {
            scene,
            delta: Duration::ZERO,
            pipeline: None,
            layout,
            vertex_shader,
            fragment_shader,
            models,
            device,
        })
    }

    /// Time since the previous frame; drives the animation.
    pub fn set_delta(&mut self, delta: Duration) {
        self.delta = delta;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The pipeline for `render_pass`, rebuilding it if the pass changed.
    fn pipeline_for(&mut self, render_pass: vk::RenderPass) -> RenderResult<vk::Pipeline> {
        if let Some(pipeline) = &self.pipeline {
            if pipeline.render_pass() == render_pass {
                return Ok(pipeline.handle());
            }
        }

        // The old render pass is gone and the device was idle for the rebuild.
        self.pipeline = None;
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&self.vertex_shader)
            .fragment_shader(&self.fragment_shader)
            .vertex_binding(vertex_binding())
            .vertex_attributes(&vertex_attributes())
            .render_pass(render_pass)
            .build(self.device.clone(), &self.layout)?;
        let handle = pipeline.handle();
        self.pipeline = Some(pipeline);
        Ok(handle)
    }

    fn animate(&mut self) {
        let spin = Vec3::new(0.0, 0.0, SPIN_RATE * self.delta.as_secs_f32());
        for object in self.scene.objects_mut() {
            object.transform.rotate(spin);
        }
    }
}

impl RenderPassParticipant<VulkanContext> for SceneRenderer {
    fn record(&mut self, frame: &FrameContext<'_, VulkanContext>) -> RenderResult<()> {
        let pipeline = self.pipeline_for(frame.render_pass)?;
        self.animate();

        let device = frame.device.device();
        let cb = frame.command_buffer;
        command::bind_pipeline(device, cb, pipeline);

        let aspect = frame.aspect_ratio();
        for object in self.scene.objects() {
            let Some(id) = object.model else {
                continue;
            };
            let gpu = self
                .models
                .get(id.index())
                .ok_or(FrameError::IndexOutOfRange {
                    index: id.index(),
                    len: self.models.len(),
                })?;

            let push = ObjectPush {
                transform: clip_transform(aspect, object.transform.matrix()),
                color: object.color.extend(1.0),
            };
            command::push_constants(
                device,
                cb,
                self.layout.handle(),
                ObjectPush::STAGES,
                bytemuck::bytes_of(&push),
            );
            command::bind_vertex_buffer(device, cb, gpu.buffer.handle());
            command::draw(device, cb, gpu.vertex_count);
        }
        Ok(())
    }
}

impl Drop for SceneRenderer {
    fn drop(&mut self) {
        // Buffers and the pipeline may still be referenced by a submission.
        if let Err(e) = self.device.wait_idle() {
            warn!("wait_idle failed while dropping the scene renderer: {}", e);
        }
        debug!(
            "Scene renderer dropped: {} model(s), last '{}'",
            self.models.len(),
            self.models.last().map_or("-", |m| m.model.name())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_push_constants_fit_guaranteed_limit() {
        assert_eq!(size_of::<ObjectPush>(), 80);
        // Every Vulkan device supports at least 128 bytes.
        assert!(ObjectPush::range().size <= 128);
        assert_eq!(ObjectPush::range().stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    fn test_vertex_layout_matches_vertex2d() {
        assert_eq!(vertex_binding().stride, 20);
        let attributes = vertex_attributes();
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].offset, 8);
        assert_eq!(attributes[1].location, 1);
    }

    #[test]
    fn test_shader_source_compiles() {
        use swapframe_rhi::shader::compile_wgsl;
        assert!(compile_wgsl(SHADER_SOURCE, ShaderStage::Vertex, "vs_main").is_ok());
        assert!(compile_wgsl(SHADER_SOURCE, ShaderStage::Fragment, "fs_main").is_ok());
    }

    #[test]
    fn test_clip_transform_corrects_aspect() {
        let model = Mat4::from_translation(Vec3::new(0.5, 0.5, 0.0));
        let clip = clip_transform(2.0, model);
        let p = clip.transform_point3(Vec2::ZERO.extend(0.0));
        assert!((p - Vec3::new(0.25, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(clip_transform(1.0, model), model);
    }
}
