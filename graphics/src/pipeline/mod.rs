//! Render pipeline descriptions and their compiled form.
//!
//! A [`RenderPipeline`] is a plain description: shaders, vertex layout,
//! declared uniforms and samplers, and fixed-function state. The device turns
//! it into a [`CompiledRenderPipeline`] with
//! [`GpuDevice::precompile_pipeline`](crate::GpuDevice::precompile_pipeline).
//! Compilation failure does not produce an error; the compiled pipeline is
//! flagged invalid and refuses to be bound.

use std::collections::HashSet;
use std::sync::Arc;

use crate::backend::{GpuBackend, ProgramSource};
use crate::types::{BlendFunction, ColorWriteMask, DepthTestFunction, ShaderType, UniformType};
use crate::vertex::{DrawMode, VertexFormat};

/// Callback that supplies shader source by shader id and stage.
pub type ShaderSourceFn<'a> = &'a dyn Fn(&str, ShaderType) -> Option<String>;

/// A uniform declared by a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformDescription {
    pub name: String,
    /// Value type, or `None` for a uniform block.
    pub ty: Option<UniformType>,
}

impl UniformDescription {
    /// A uniform block.
    pub fn block(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    /// A single typed uniform value.
    pub fn typed(name: impl Into<String>, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

/// Description of a render pipeline.
///
/// # Example
///
/// ```ignore
/// let pipeline = RenderPipeline::new("core/position_color", format, DrawMode::Quads)
///     .with_uniform(UniformDescription::block("Projection"))
///     .with_blend(BlendFunction::TRANSLUCENT)
///     .with_depth_test(DepthTestFunction::NoDepthTest);
/// let compiled = device.precompile_pipeline(&pipeline);
/// ```
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    /// Unique location, also the cache key.
    pub location: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Inline vertex source used when no source callback is given.
    pub vertex_source: Option<String>,
    /// Inline fragment source used when no source callback is given.
    pub fragment_source: Option<String>,
    pub vertex_format: Arc<VertexFormat>,
    pub draw_mode: DrawMode,
    pub uniforms: Vec<UniformDescription>,
    pub samplers: Vec<String>,
    pub blend: Option<BlendFunction>,
    pub depth_test: DepthTestFunction,
    pub cull: bool,
    pub color_write: ColorWriteMask,
    pub write_depth: bool,
}

impl RenderPipeline {
    /// Create a pipeline whose shaders are both named after `location`.
    pub fn new(
        location: impl Into<String>,
        vertex_format: Arc<VertexFormat>,
        draw_mode: DrawMode,
    ) -> Self {
        let location = location.into();
        Self {
            vertex_shader: location.clone(),
            fragment_shader: location.clone(),
            location,
            vertex_source: None,
            fragment_source: None,
            vertex_format,
            draw_mode,
            uniforms: Vec::new(),
            samplers: Vec::new(),
            blend: None,
            depth_test: DepthTestFunction::default(),
            cull: true,
            color_write: ColorWriteMask::default(),
            write_depth: true,
        }
    }

    /// Set the vertex shader id.
    pub fn with_vertex_shader(mut self, id: impl Into<String>) -> Self {
        self.vertex_shader = id.into();
        self
    }

    /// Set the fragment shader id.
    pub fn with_fragment_shader(mut self, id: impl Into<String>) -> Self {
        self.fragment_shader = id.into();
        self
    }

    /// Attach inline source for one stage.
    pub fn with_shader_source(mut self, stage: ShaderType, source: impl Into<String>) -> Self {
        match stage {
            ShaderType::Vertex => self.vertex_source = Some(source.into()),
            ShaderType::Fragment => self.fragment_source = Some(source.into()),
        }
        self
    }

    /// Declare a uniform.
    pub fn with_uniform(mut self, uniform: UniformDescription) -> Self {
        self.uniforms.push(uniform);
        self
    }

    /// Declare a sampler.
    pub fn with_sampler(mut self, name: impl Into<String>) -> Self {
        self.samplers.push(name.into());
        self
    }

    /// Enable blending.
    pub fn with_blend(mut self, blend: BlendFunction) -> Self {
        self.blend = Some(blend);
        self
    }

    /// Set the depth test.
    pub fn with_depth_test(mut self, depth_test: DepthTestFunction) -> Self {
        self.depth_test = depth_test;
        self
    }

    /// Disable back-face culling.
    pub fn without_culling(mut self) -> Self {
        self.cull = false;
        self
    }

    /// Set which color channels are written.
    pub fn with_color_write(mut self, mask: ColorWriteMask) -> Self {
        self.color_write = mask;
        self
    }

    /// Enable or disable depth writes.
    pub fn with_depth_write(mut self, enabled: bool) -> Self {
        self.write_depth = enabled;
        self
    }

    /// Shader id of a stage.
    pub fn shader_id(&self, stage: ShaderType) -> &str {
        match stage {
            ShaderType::Vertex => &self.vertex_shader,
            ShaderType::Fragment => &self.fragment_shader,
        }
    }

    /// Inline source of a stage, if any.
    pub fn inline_source(&self, stage: ShaderType) -> Option<&str> {
        match stage {
            ShaderType::Vertex => self.vertex_source.as_deref(),
            ShaderType::Fragment => self.fragment_source.as_deref(),
        }
    }

    /// Returns true if draws with this pipeline need a depth attachment.
    pub fn wants_depth_texture(&self) -> bool {
        self.depth_test.wants_depth_texture() || self.write_depth
    }
}

/// Result of compiling a [`RenderPipeline`].
#[derive(Debug)]
pub struct CompiledRenderPipeline {
    pipeline: RenderPipeline,
    active: HashSet<String>,
    error: Option<String>,
}

impl CompiledRenderPipeline {
    /// Compile `pipeline`, taking sources from `sources` if given and from
    /// the pipeline's inline sources otherwise.
    pub(crate) fn compile(
        backend: &dyn GpuBackend,
        pipeline: RenderPipeline,
        sources: Option<ShaderSourceFn<'_>>,
    ) -> Self {
        let fetch = |stage: ShaderType| -> Option<String> {
            match sources {
                Some(sources) => sources(pipeline.shader_id(stage), stage),
                None => pipeline.inline_source(stage).map(str::to_string),
            }
        };

        let (vertex, fragment) = match (fetch(ShaderType::Vertex), fetch(ShaderType::Fragment)) {
            (Some(vertex), Some(fragment)) => (vertex, fragment),
            (vertex, _) => {
                let stage = if vertex.is_none() {
                    ShaderType::Vertex
                } else {
                    ShaderType::Fragment
                };
                let message = format!(
                    "missing {} shader {}",
                    stage.name(),
                    pipeline.shader_id(stage)
                );
                log::error!("Pipeline {}: {}", pipeline.location, message);
                return Self::invalid(pipeline, message);
            }
        };

        let result = backend.compile_program(&ProgramSource {
            location: &pipeline.location,
            vertex_source: &vertex,
            fragment_source: &fragment,
            uniforms: &pipeline.uniforms,
            samplers: &pipeline.samplers,
        });

        match result {
            Ok(info) => {
                log::debug!(
                    "Pipeline {}: compiled with {} active uniforms, {} active samplers",
                    pipeline.location,
                    info.active_uniforms.len(),
                    info.active_samplers.len()
                );
                Self {
                    active: info
                        .active_uniforms
                        .into_iter()
                        .chain(info.active_samplers)
                        .collect(),
                    pipeline,
                    error: None,
                }
            }
            Err(message) => {
                log::error!("Pipeline {} failed to compile: {}", pipeline.location, message);
                Self::invalid(pipeline, message)
            }
        }
    }

    fn invalid(pipeline: RenderPipeline, message: String) -> Self {
        Self {
            pipeline,
            active: HashSet::new(),
            error: Some(message),
        }
    }

    /// Returns true if compilation succeeded.
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the compiled program uses the uniform or sampler `name`.
    pub fn contains_uniform(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// The description this was compiled from.
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Location of the pipeline.
    pub fn location(&self) -> &str {
        &self.pipeline.location
    }

    /// Compiler log of a failed compilation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

static_assertions::assert_impl_all!(CompiledRenderPipeline: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    const VERTEX: &str = "uniform Projection; void main() {}";
    const FRAGMENT: &str = "uniform sampler2D Sampler0; void main() {}";

    fn test_pipeline() -> RenderPipeline {
        RenderPipeline::new(
            "core/position_tex",
            Arc::new(VertexFormat::position_tex()),
            DrawMode::Quads,
        )
        .with_uniform(UniformDescription::block("Projection"))
        .with_uniform(UniformDescription::typed("GameTime", UniformType::Float))
        .with_sampler("Sampler0")
    }

    #[test]
    fn test_defaults() {
        let pipeline = test_pipeline();
        assert_eq!(pipeline.shader_id(ShaderType::Vertex), "core/position_tex");
        assert_eq!(pipeline.depth_test, DepthTestFunction::LessEqual);
        assert!(pipeline.cull);
        assert!(pipeline.wants_depth_texture());
        assert!(pipeline.inline_source(ShaderType::Fragment).is_none());
    }

    #[test]
    fn test_compile_inline_sources() {
        let backend = DummyBackend::default();
        let pipeline = test_pipeline()
            .with_shader_source(ShaderType::Vertex, VERTEX)
            .with_shader_source(ShaderType::Fragment, FRAGMENT);
        let compiled = CompiledRenderPipeline::compile(&backend, pipeline, None);

        assert!(compiled.is_valid());
        assert!(compiled.contains_uniform("Projection"));
        assert!(compiled.contains_uniform("Sampler0"));
        assert!(!compiled.contains_uniform("GameTime"));
        assert_eq!(compiled.location(), "core/position_tex");
    }

    #[test]
    fn test_compile_missing_source() {
        let backend = DummyBackend::default();
        let pipeline = test_pipeline().with_shader_source(ShaderType::Vertex, VERTEX);
        let compiled = CompiledRenderPipeline::compile(&backend, pipeline, None);

        assert!(!compiled.is_valid());
        assert!(compiled.error().is_some_and(|e| e.contains("fragment")));
    }

    #[test]
    fn test_compile_with_source_callback() {
        let backend = DummyBackend::default();
        let sources = |id: &str, stage: ShaderType| match stage {
            ShaderType::Vertex => Some(format!("// {id}\n{VERTEX}")),
            ShaderType::Fragment => Some("#error broken".to_string()),
        };
        let compiled = CompiledRenderPipeline::compile(&backend, test_pipeline(), Some(&sources));
        assert!(!compiled.is_valid());
        assert!(!compiled.contains_uniform("Projection"));
    }
}
