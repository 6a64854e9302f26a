//! Shader modules compiled from WGSL.
//!
//! Sources are compiled to SPIR-V at load time with `naga`, so the demo
//! needs no offline shader toolchain. [`compile_wgsl`] is the pure half and
//! needs no device.
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>, source: &str) -> swapframe_rhi::RhiResult<()> {
//! let vertex = Shader::from_wgsl(device.clone(), source, ShaderStage::Vertex, "vs_main")?;
//! let fragment = Shader::from_wgsl(device, source, ShaderStage::Fragment, "fs_main")?;
//! let _stages = [vertex.stage_create_info(), fragment.stage_create_info()];
//! # Ok(())
//! # }
//! ```

use std::ffi::{CStr, CString};
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Pipeline stage a shader entry point runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compiles one entry point of a WGSL source to SPIR-V words.
///
/// # Errors
///
/// [`RhiError::ShaderError`] if the source does not parse or validate, or
/// has no `entry_point` for `stage`.
pub fn compile_wgsl(source: &str, stage: ShaderStage, entry_point: &str) -> RhiResult<Vec<u32>> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| RhiError::ShaderError(format!("WGSL parse error: {}", e)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator
        .validate(&module)
        .map_err(|e| RhiError::ShaderError(format!("WGSL validation error: {}", e)))?;

    let naga_stage = stage.to_naga();
    if !module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry_point && ep.stage == naga_stage)
    {
        return Err(RhiError::ShaderError(format!(
            "no {} entry point named '{}'",
            stage, entry_point
        )));
    }

    let options = naga::back::spv::Options {
        lang_version: (1, 0),
        flags: naga::back::spv::WriterFlags::empty(),
        capabilities: None,
        bounds_check_policies: naga::proc::BoundsCheckPolicies::default(),
        binding_map: Default::default(),
        debug_info: None,
        zero_initialize_workgroup_memory: naga::back::spv::ZeroInitializeWorkgroupMemoryMode::None,
    };
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: naga_stage,
        entry_point: entry_point.to_string(),
    };

    naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
        .map_err(|e| RhiError::ShaderError(format!("SPIR-V generation error: {}", e)))
}

/// `VkShaderModule` holding a single entry point.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Compiles `entry_point` from a WGSL source and creates the module.
    ///
    /// # Errors
    ///
    /// The compile error from [`compile_wgsl`], or the Vulkan error.
    pub fn from_wgsl(
        device: Arc<Device>,
        source: &str,
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let entry_point_cstring = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {}", e)))?;
        let code = compile_wgsl(source, stage, entry_point)?;
        debug!(
            "Compiled {} entry point '{}' to {} SPIR-V words",
            stage,
            entry_point,
            code.len()
        );

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        info!("Created {} shader module '{}'", stage, entry_point);
        Ok(Self {
            device,
            module,
            stage,
            entry_point: entry_point_cstring,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn entry_point(&self) -> &CStr {
        &self.entry_point
    }

    /// Stage description for pipeline creation; borrows this shader.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    const SOURCE: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(frag.color, 1.0);
}
"#;

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn test_compile_both_stages() {
        for (stage, entry) in [
            (ShaderStage::Vertex, "vs_main"),
            (ShaderStage::Fragment, "fs_main"),
        ] {
            let words = compile_wgsl(SOURCE, stage, entry).unwrap();
            assert_eq!(words[0], SPIRV_MAGIC, "{} stage", stage);
        }
    }

    #[test]
    fn test_entry_point_must_match_stage() {
        let err = compile_wgsl(SOURCE, ShaderStage::Fragment, "vs_main").unwrap_err();
        assert!(matches!(err, RhiError::ShaderError(_)));
        assert!(compile_wgsl(SOURCE, ShaderStage::Vertex, "main").is_err());
    }

    #[test]
    fn test_parse_error_is_shader_error() {
        let err = compile_wgsl("fn broken(", ShaderStage::Vertex, "vs_main").unwrap_err();
        assert!(matches!(err, RhiError::ShaderError(msg) if msg.contains("parse")));
    }
}
