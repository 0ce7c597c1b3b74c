//! Render pass recording.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::backend::{ClearValue, DrawCall, DrawPrimitive, ResourceId};
use crate::command::{CommandEncoder, RenderPassDescriptor};
use crate::error::{GraphicsError, GraphicsResult};
use crate::pipeline::CompiledRenderPipeline;
use crate::resources::{GpuBufferSlice, GpuResource, GpuTextureView, ViewTarget};
use crate::types::ScissorRect;
use crate::vertex::IndexType;

/// Receives per-object uniform bindings during
/// [`RenderPass::draw_multiple_indexed`].
pub trait UniformUploader {
    /// Bind `slice` to the uniform `name` for the following draws.
    fn upload(&mut self, name: &str, slice: GpuBufferSlice);
}

/// Callback that binds the uniforms of one object.
pub type UniformUploadFn<'a, T> = &'a dyn Fn(&T, &mut dyn UniformUploader);

/// One indexed draw of a [`RenderPass::draw_multiple_indexed`] batch.
pub struct RenderObject<'a, T: ?Sized> {
    /// Vertex buffer slot `vertex_buffer` is bound to.
    pub slot: u32,
    pub vertex_buffer: GpuBufferSlice,
    /// Overrides the batch's default index buffer.
    pub index_buffer: Option<GpuBufferSlice>,
    /// Overrides the batch's default index type.
    pub index_type: Option<IndexType>,
    pub first_index: u32,
    pub index_count: u32,
    pub uniform_uploader: Option<UniformUploadFn<'a, T>>,
}

impl<'a, T: ?Sized> RenderObject<'a, T> {
    /// Draw `index_count` indices of the batch's index buffer over `vertex_buffer` in slot 0.
    pub fn new(vertex_buffer: GpuBufferSlice, index_count: u32) -> Self {
        Self {
            slot: 0,
            vertex_buffer,
            index_buffer: None,
            index_type: None,
            first_index: 0,
            index_count,
            uniform_uploader: None,
        }
    }

    /// Use this object's own index buffer.
    pub fn with_index_buffer(
        mut self,
        index_buffer: GpuBufferSlice,
        index_type: IndexType,
    ) -> Self {
        self.index_buffer = Some(index_buffer);
        self.index_type = Some(index_type);
        self
    }

    /// Start at `first_index`.
    pub fn with_first_index(mut self, first_index: u32) -> Self {
        self.first_index = first_index;
        self
    }

    /// Bind uniforms before drawing this object.
    pub fn with_uniforms(mut self, uploader: UniformUploadFn<'a, T>) -> Self {
        self.uniform_uploader = Some(uploader);
        self
    }
}

impl<T: ?Sized> std::fmt::Debug for RenderObject<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderObject")
            .field("slot", &self.slot)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .field("index_type", &self.index_type)
            .field("first_index", &self.first_index)
            .field("index_count", &self.index_count)
            .field("uniform_uploader", &self.uniform_uploader.is_some())
            .finish()
    }
}

/// An open render pass.
///
/// Bindings are local to the pass. Each draw is validated against the bound
/// pipeline before it reaches the backend. The attachments stay reserved until
/// the pass is closed or dropped.
pub struct RenderPass<'a> {
    encoder: &'a mut CommandEncoder,
    label: String,
    color: ViewTarget,
    depth: Option<ViewTarget>,
    attachments: Vec<ResourceId>,
    pipeline: Option<Arc<CompiledRenderPipeline>>,
    uniforms: HashMap<String, GpuBufferSlice>,
    samplers: HashMap<String, ViewTarget>,
    vertex_buffers: BTreeMap<u32, GpuBufferSlice>,
    index_buffer: Option<(GpuBufferSlice, IndexType)>,
    scissor: Option<ScissorRect>,
    debug_groups: Vec<String>,
    closed: bool,
}

impl<'a> RenderPass<'a> {
    pub(crate) fn open(
        encoder: &'a mut CommandEncoder,
        descriptor: RenderPassDescriptor<'_>,
    ) -> GraphicsResult<Self> {
        let color_target = descriptor.color.target()?.clone();
        let color = color_target.resolve()?;
        if !color.format.has_color_aspect() {
            return Err(GraphicsError::InvalidArgument(format!(
                "color attachment {} of pass {} has no color aspect",
                color.label, descriptor.label
            )));
        }

        let depth_target = descriptor.depth.map(GpuTextureView::target).transpose()?.cloned();
        let depth = depth_target.as_ref().map(ViewTarget::resolve).transpose()?;
        if let Some(depth) = &depth {
            if !depth.format.has_depth_aspect() {
                return Err(GraphicsError::InvalidArgument(format!(
                    "depth attachment {} of pass {} has no depth aspect",
                    depth.label, descriptor.label
                )));
            }
            if (depth.width, depth.height) != (color.width, color.height) {
                return Err(GraphicsError::InvalidArgument(format!(
                    "pass {}: color {}x{} and depth {}x{} differ in size",
                    descriptor.label, color.width, color.height, depth.width, depth.height
                )));
            }
        } else if descriptor.clear_depth.is_some() {
            return Err(GraphicsError::InvalidArgument(format!(
                "pass {} clears depth without a depth attachment",
                descriptor.label
            )));
        }

        let mut claimed = vec![(color.id, color.label.as_str())];
        if let Some(depth) = &depth {
            claimed.push((depth.id, depth.label.as_str()));
        }
        let device = Arc::clone(encoder.device());
        device.acquire_attachments(&claimed)?;
        let attachments: Vec<ResourceId> = claimed.iter().map(|(id, _)| *id).collect();

        let backend = device.backend();
        let cleared = descriptor
            .clear_color
            .map(|argb| backend.clear_texture(color.id, color.base_mip, ClearValue::Color(argb)))
            .transpose()
            .and_then(|_| match (&depth, descriptor.clear_depth) {
                (Some(depth), Some(value)) => {
                    backend.clear_texture(depth.id, depth.base_mip, ClearValue::Depth(value))
                }
                _ => Ok(()),
            });
        if let Err(e) = cleared {
            device.release_attachments(&attachments);
            return Err(e);
        }

        log::trace!(
            "RenderPass: opened {} on {} ({}x{})",
            descriptor.label,
            color.label,
            color.width,
            color.height
        );

        Ok(Self {
            encoder,
            label: descriptor.label,
            color: color_target,
            depth: depth_target,
            attachments,
            pipeline: None,
            uniforms: HashMap::new(),
            samplers: HashMap::new(),
            vertex_buffers: BTreeMap::new(),
            index_buffer: None,
            scissor: None,
            debug_groups: Vec::new(),
            closed: false,
        })
    }

    /// Label of the pass.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true once the pass has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The bound pipeline, if any.
    pub fn pipeline(&self) -> Option<&Arc<CompiledRenderPipeline>> {
        self.pipeline.as_ref()
    }

    /// Current debug group nesting depth.
    pub fn debug_group_depth(&self) -> usize {
        self.debug_groups.len()
    }

    /// Open a named debug group.
    pub fn push_debug_group(&mut self, label: impl Into<String>) -> GraphicsResult<()> {
        self.ensure_open()?;
        self.debug_groups.push(label.into());
        Ok(())
    }

    /// Close the innermost debug group.
    pub fn pop_debug_group(&mut self) -> GraphicsResult<()> {
        self.ensure_open()?;
        match self.debug_groups.pop() {
            Some(_) => Ok(()),
            None => Err(GraphicsError::InvalidState(format!(
                "pass {} has no debug group to pop",
                self.label
            ))),
        }
    }

    /// Bind a compiled pipeline for the following draws.
    ///
    /// Fails with [`GraphicsError::PipelineInvalid`] if it did not compile.
    pub fn set_pipeline(&mut self, pipeline: &Arc<CompiledRenderPipeline>) -> GraphicsResult<()> {
        self.ensure_open()?;
        if let Some(error) = pipeline.error() {
            return Err(GraphicsError::PipelineInvalid(format!(
                "{}: {error}",
                pipeline.location()
            )));
        }
        self.pipeline = Some(Arc::clone(pipeline));
        Ok(())
    }

    /// Bind `view` to the sampler `name`, or unbind it with `None`.
    pub fn bind_sampler(
        &mut self,
        name: &str,
        view: Option<&GpuTextureView>,
    ) -> GraphicsResult<()> {
        self.ensure_open()?;
        match view {
            Some(view) => {
                let target = view.target()?.clone();
                target.resolve()?;
                self.samplers.insert(name.to_string(), target);
            }
            None => {
                self.samplers.remove(name);
            }
        }
        Ok(())
    }

    /// Bind `slice` to the uniform `name`.
    pub fn set_uniform(&mut self, name: &str, slice: GpuBufferSlice) -> GraphicsResult<()> {
        self.ensure_open()?;
        slice.resolve()?;
        self.uniforms.insert(name.to_string(), slice);
        Ok(())
    }

    /// Clip the following draws to `rect`.
    pub fn enable_scissor(&mut self, rect: ScissorRect) -> GraphicsResult<()> {
        self.ensure_open()?;
        let color = self.color.resolve()?;
        let fits = rect.x.checked_add(rect.width).is_some_and(|right| right <= color.width)
            && rect.y.checked_add(rect.height).is_some_and(|bottom| bottom <= color.height);
        if !fits {
            return Err(GraphicsError::OutOfRange(format!(
                "scissor {rect:?} exceeds {}x{} attachment of pass {}",
                color.width, color.height, self.label
            )));
        }
        self.scissor = Some(rect);
        Ok(())
    }

    /// Stop clipping.
    pub fn disable_scissor(&mut self) -> GraphicsResult<()> {
        self.ensure_open()?;
        self.scissor = None;
        Ok(())
    }

    /// Bind `slice` as the vertex buffer of `slot`.
    pub fn set_vertex_buffer(&mut self, slot: u32, slice: GpuBufferSlice) -> GraphicsResult<()> {
        self.ensure_open()?;
        slice.resolve()?;
        self.vertex_buffers.insert(slot, slice);
        Ok(())
    }

    /// Bind the index buffer.
    pub fn set_index_buffer(
        &mut self,
        slice: GpuBufferSlice,
        index_type: IndexType,
    ) -> GraphicsResult<()> {
        self.ensure_open()?;
        slice.resolve()?;
        self.index_buffer = Some((slice, index_type));
        Ok(())
    }

    /// Draw `index_count` indices starting at `first_index`.
    pub fn draw_indexed(
        &mut self,
        base_vertex: i32,
        first_index: u32,
        index_count: u32,
        instance_count: u32,
    ) -> GraphicsResult<()> {
        self.ensure_open()?;
        self.check_index_range(first_index, index_count)?;
        self.submit(
            DrawPrimitive::Indexed {
                base_vertex,
                first_index,
                index_count,
                instance_count,
            },
            &[],
        )
    }

    /// Draw `vertex_count` vertices starting at `first_vertex` without indices.
    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32) -> GraphicsResult<()> {
        self.ensure_open()?;
        let pipeline = self.bound_pipeline()?;
        let vertex_size = u64::from(pipeline.pipeline().vertex_format.vertex_size());
        let vertices = self.vertex_buffers.get(&0).ok_or_else(|| {
            GraphicsError::InvalidState(format!("pass {}: no vertex buffer bound", self.label))
        })?;
        let end = (u64::from(first_vertex) + u64::from(vertex_count)) * vertex_size;
        if end > vertices.length() {
            return Err(GraphicsError::OutOfRange(format!(
                "pass {}: vertices {first_vertex}..{} exceed vertex buffer of {} bytes",
                self.label,
                u64::from(first_vertex) + u64::from(vertex_count),
                vertices.length()
            )));
        }
        self.submit(
            DrawPrimitive::Vertices {
                first_vertex,
                vertex_count,
            },
            &[],
        )
    }

    /// Draw many objects with the bound pipeline.
    ///
    /// Each object binds its vertex buffer, runs its uniform uploader with
    /// `context` and issues one indexed draw. Objects without their own index
    /// buffer use `default_index_buffer`. Uniforms in
    /// `validation_skipped_uniforms` may be left unbound.
    pub fn draw_multiple_indexed<T: ?Sized>(
        &mut self,
        objects: &[RenderObject<'_, T>],
        default_index_buffer: Option<&GpuBufferSlice>,
        default_index_type: Option<IndexType>,
        validation_skipped_uniforms: &[&str],
        context: &T,
    ) -> GraphicsResult<()> {
        self.ensure_open()?;
        self.bound_pipeline()?;

        for (i, object) in objects.iter().enumerate() {
            let index_buffer = object
                .index_buffer
                .as_ref()
                .or(default_index_buffer)
                .ok_or_else(|| {
                    GraphicsError::InvalidState(format!(
                        "pass {}: object {i} has no index buffer",
                        self.label
                    ))
                })?;
            let index_type = object.index_type.or(default_index_type).ok_or_else(|| {
                GraphicsError::InvalidState(format!(
                    "pass {}: object {i} has no index type",
                    self.label
                ))
            })?;

            self.set_vertex_buffer(object.slot, object.vertex_buffer.clone())?;
            self.set_index_buffer(index_buffer.clone(), index_type)?;
            if let Some(uploader) = object.uniform_uploader {
                uploader(context, self);
            }

            self.check_index_range(object.first_index, object.index_count)?;
            self.submit(
                DrawPrimitive::Indexed {
                    base_vertex: 0,
                    first_index: object.first_index,
                    index_count: object.index_count,
                    instance_count: 1,
                },
                validation_skipped_uniforms,
            )?;
        }

        log::trace!(
            "RenderPass: {} drew {} objects",
            self.label,
            objects.len()
        );
        Ok(())
    }

    /// Close the pass and release its attachments.
    pub fn close(&mut self) -> GraphicsResult<()> {
        self.ensure_open()?;
        if !self.debug_groups.is_empty() {
            log::warn!(
                "RenderPass: {} closed with {} open debug groups",
                self.label,
                self.debug_groups.len()
            );
        }
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        self.closed = true;
        self.encoder.device().release_attachments(&self.attachments);
        log::trace!("RenderPass: closed {}", self.label);
    }

    fn ensure_open(&self) -> GraphicsResult<()> {
        if self.closed {
            return Err(GraphicsError::InvalidState(format!(
                "render pass {} is closed",
                self.label
            )));
        }
        Ok(())
    }

    fn bound_pipeline(&self) -> GraphicsResult<&Arc<CompiledRenderPipeline>> {
        self.pipeline.as_ref().ok_or_else(|| {
            GraphicsError::InvalidState(format!("pass {}: no pipeline bound", self.label))
        })
    }

    fn check_index_range(&self, first_index: u32, index_count: u32) -> GraphicsResult<()> {
        let (indices, index_type) = self.index_buffer.as_ref().ok_or_else(|| {
            GraphicsError::InvalidState(format!("pass {}: no index buffer bound", self.label))
        })?;
        let end = (u64::from(first_index) + u64::from(index_count)) * u64::from(index_type.size());
        if end > indices.length() {
            return Err(GraphicsError::OutOfRange(format!(
                "pass {}: indices {first_index}..{} exceed index buffer of {} bytes",
                self.label,
                u64::from(first_index) + u64::from(index_count),
                indices.length()
            )));
        }
        Ok(())
    }

    /// Validate the bindings against the pipeline and hand the draw to the backend.
    fn submit(&self, primitive: DrawPrimitive, skipped: &[&str]) -> GraphicsResult<()> {
        let compiled = self.bound_pipeline()?;
        let pipeline = compiled.pipeline();

        if !self.vertex_buffers.contains_key(&0) {
            return Err(GraphicsError::InvalidState(format!(
                "pass {}: no vertex buffer bound",
                self.label
            )));
        }
        let vertex_buffers = self
            .vertex_buffers
            .iter()
            .map(|(slot, slice)| Ok((*slot, slice.range()?)))
            .collect::<GraphicsResult<Vec<_>>>()?;

        let index_buffer = match (&primitive, &self.index_buffer) {
            (DrawPrimitive::Indexed { .. }, Some((slice, index_type))) => {
                Some((slice.range()?, *index_type))
            }
            _ => None,
        };

        let mut uniforms = Vec::new();
        for uniform in &pipeline.uniforms {
            let name = uniform.name.as_str();
            match self.uniforms.get(name) {
                Some(slice) => uniforms.push((name.to_string(), slice.range()?)),
                None if compiled.contains_uniform(name) && !skipped.contains(&name) => {
                    return Err(GraphicsError::InvalidState(format!(
                        "pass {}: pipeline {} requires uniform {name}",
                        self.label, pipeline.location
                    )));
                }
                None => {}
            }
        }

        let mut samplers = Vec::new();
        for name in &pipeline.samplers {
            match self.samplers.get(name) {
                Some(target) => samplers.push((name.clone(), target.resolve()?.sampled())),
                None if compiled.contains_uniform(name) && !skipped.contains(&name.as_str()) => {
                    return Err(GraphicsError::InvalidState(format!(
                        "pass {}: pipeline {} requires sampler {name}",
                        self.label, pipeline.location
                    )));
                }
                None => {}
            }
        }

        let color_target = self.color.resolve()?.id;
        let depth_target = self
            .depth
            .as_ref()
            .map(|depth| depth.resolve().map(|view| view.id))
            .transpose()?;

        self.encoder.device().backend().draw(DrawCall {
            pass: self.label.clone(),
            pipeline: pipeline.location.clone(),
            color_target,
            depth_target,
            vertex_buffers,
            index_buffer,
            uniforms,
            samplers,
            scissor: self.scissor,
            primitive,
        })
    }
}

impl UniformUploader for RenderPass<'_> {
    fn upload(&mut self, name: &str, slice: GpuBufferSlice) {
        self.uniforms.insert(name.to_string(), slice);
    }
}

impl GpuResource for RenderPass<'_> {
    fn label(&self) -> &str {
        RenderPass::label(self)
    }

    fn is_closed(&self) -> bool {
        RenderPass::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        RenderPass::close(self)
    }
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.finish();
        }
    }
}

impl std::fmt::Debug for RenderPass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("label", &self.label)
            .field("pipeline", &self.pipeline.as_ref().map(|p| p.location().to_string()))
            .field("vertex_buffers", &self.vertex_buffers.len())
            .field("uniforms", &self.uniforms.len())
            .field("samplers", &self.samplers.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::config::DeviceParameters;
    use crate::device::GpuDevice;
    use crate::pipeline::{RenderPipeline, UniformDescription};
    use crate::resources::{GpuBuffer, GpuTexture};
    use crate::types::{
        BufferDescriptor, BufferType, BufferUsage, ShaderType, TextureDescriptor, TextureFormat,
    };
    use crate::vertex::{DrawMode, VertexFormat};

    struct Fixture {
        backend: Arc<DummyBackend>,
        device: Arc<GpuDevice>,
        color: GpuTexture,
        depth: GpuTexture,
        vertices: GpuBuffer,
        indices: GpuBuffer,
        uniforms: GpuBuffer,
        pipeline: Arc<CompiledRenderPipeline>,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(DummyBackend::default());
        let device = GpuDevice::new(backend.clone(), &DeviceParameters::default());
        let texture = |format: TextureFormat, label: &str| {
            let desc = TextureDescriptor::new(format, 16, 16).with_label(label);
            device.create_texture(&desc).unwrap()
        };
        let color = texture(TextureFormat::Rgba8, "color");
        let depth = texture(TextureFormat::Depth32, "depth");
        let buffer = |buffer_type: BufferType, usage: BufferUsage, size: u64| {
            device
                .create_buffer(&BufferDescriptor::new(buffer_type, usage, size))
                .unwrap()
        };
        let vertices = buffer(BufferType::Vertices, BufferUsage::StaticWrite, 12 * 4);
        let indices = buffer(BufferType::Indices, BufferUsage::StaticWrite, 12);
        let uniforms = buffer(BufferType::Uniform, BufferUsage::DynamicWrite, 512);
        let format = Arc::new(VertexFormat::position());
        let pipeline = device.precompile_pipeline(
            &RenderPipeline::new("test/pass", format, DrawMode::Triangles)
                .with_uniform(UniformDescription::block("Projection"))
                .with_uniform(UniformDescription::block("Unused"))
                .with_sampler("Sampler0")
                .with_shader_source(ShaderType::Vertex, "uniform Projection;")
                .with_shader_source(ShaderType::Fragment, "uniform sampler2D Sampler0;"),
        );
        Fixture {
            backend,
            device,
            color,
            depth,
            vertices,
            indices,
            uniforms,
            pipeline,
        }
    }

    #[test]
    fn test_draw_requires_bindings() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let sampled = f.depth.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let mut pass = encoder
            .create_render_pass(RenderPassDescriptor::new("main", &color))
            .unwrap();

        assert!(matches!(pass.draw(0, 3), Err(GraphicsError::InvalidState(_))));
        pass.set_pipeline(&f.pipeline).unwrap();
        assert!(pass.draw(0, 3).is_err());
        pass.set_vertex_buffer(0, f.vertices.slice_all()).unwrap();
        assert!(pass.draw(0, 3).is_err());
        pass.set_uniform("Projection", f.uniforms.slice(0, 64).unwrap())
            .unwrap();
        assert!(pass.draw(0, 3).is_err());
        pass.bind_sampler("Sampler0", Some(&sampled)).unwrap();

        // "Unused" is declared but not referenced by the shaders.
        pass.draw(0, 3).unwrap();
        assert!(matches!(pass.draw(2, 3), Err(GraphicsError::OutOfRange(_))));
        assert!(pass.draw_indexed(0, 0, 3, 1).is_err());

        pass.set_index_buffer(f.indices.slice_all(), IndexType::Short)
            .unwrap();
        pass.draw_indexed(0, 0, 6, 1).unwrap();
        assert!(matches!(
            pass.draw_indexed(0, 1, 6, 1),
            Err(GraphicsError::OutOfRange(_))
        ));
        pass.close().unwrap();

        let draws = f.backend.draw_calls();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].pipeline, "test/pass");
        assert_eq!(draws[0].uniforms.len(), 1);
        assert_eq!(draws[1].index_buffer.map(|(_, ty)| ty), Some(IndexType::Short));
    }

    #[test]
    fn test_invalid_pipeline_rejected() {
        let f = fixture();
        let format = Arc::new(VertexFormat::position());
        let broken = f.device.precompile_pipeline(
            &RenderPipeline::new("test/broken", format, DrawMode::Triangles)
                .with_shader_source(ShaderType::Vertex, "#error nope")
                .with_shader_source(ShaderType::Fragment, "void main() {}"),
        );
        let color = f.color.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let mut pass = encoder
            .create_render_pass(RenderPassDescriptor::new("main", &color))
            .unwrap();
        assert!(matches!(
            pass.set_pipeline(&broken),
            Err(GraphicsError::PipelineInvalid(_))
        ));
    }

    #[test]
    fn test_attachments_reserved_while_open() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let depth = f.depth.create_view().unwrap();
        let mut first = f.device.create_command_encoder();
        let mut second = f.device.create_command_encoder();

        let pass = first
            .create_render_pass(
                RenderPassDescriptor::new("first", &color)
                    .with_depth(&depth)
                    .with_clear_depth(1.0),
            )
            .unwrap();
        assert!(matches!(
            second.create_render_pass(RenderPassDescriptor::new("second", &color)),
            Err(GraphicsError::AttachmentInUse(_))
        ));
        drop(pass);
        second
            .create_render_pass(RenderPassDescriptor::new("second", &color))
            .unwrap()
            .close()
            .unwrap();
    }

    #[test]
    fn test_attachment_validation() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let depth = f.depth.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();

        assert!(encoder
            .create_render_pass(RenderPassDescriptor::new("swapped", &depth))
            .is_err());
        assert!(encoder
            .create_render_pass(RenderPassDescriptor::new("swapped", &color).with_depth(&color))
            .is_err());
        assert!(encoder
            .create_render_pass(RenderPassDescriptor::new("no depth", &color).with_clear_depth(1.0))
            .is_err());

        let small = f
            .device
            .create_texture(&TextureDescriptor::new(TextureFormat::Depth32, 8, 8))
            .unwrap();
        let small_view = small.create_view().unwrap();
        let descriptor = RenderPassDescriptor::new("mismatch", &color)
            .with_depth(&small_view);
        assert!(encoder.create_render_pass(descriptor).is_err());
    }

    #[test]
    fn test_clear_on_open() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let descriptor = RenderPassDescriptor::new("clear", &color)
            .with_clear_color(0xFF00_FF00);
        encoder
            .create_render_pass(descriptor)
            .unwrap()
            .close()
            .unwrap();
        let pixels = f.backend.texture_contents(f.color.id(), 0).unwrap();
        assert_eq!(&pixels[..4], &[0x00, 0xFF, 0x00, 0xFF]);
    }

    #[test]
    fn test_closed_pass_rejects_everything() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let mut pass = encoder
            .create_render_pass(RenderPassDescriptor::new("main", &color))
            .unwrap();
        pass.close().unwrap();
        assert!(pass.is_closed());
        assert!(pass.set_pipeline(&f.pipeline).is_err());
        assert!(pass.push_debug_group("late").is_err());
        assert!(pass.close().is_err());
    }

    #[test]
    fn test_debug_groups_and_scissor() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let mut pass = encoder
            .create_render_pass(RenderPassDescriptor::new("main", &color))
            .unwrap();

        pass.push_debug_group("outer").unwrap();
        pass.push_debug_group("inner").unwrap();
        assert_eq!(pass.debug_group_depth(), 2);
        pass.pop_debug_group().unwrap();
        pass.pop_debug_group().unwrap();
        assert!(matches!(
            pass.pop_debug_group(),
            Err(GraphicsError::InvalidState(_))
        ));

        pass.enable_scissor(ScissorRect::new(8, 8, 8, 8)).unwrap();
        assert!(pass.enable_scissor(ScissorRect::new(8, 8, 9, 8)).is_err());
        pass.disable_scissor().unwrap();
    }

    #[test]
    fn test_draw_multiple_indexed() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let sampled = f.depth.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let mut pass = encoder
            .create_render_pass(RenderPassDescriptor::new("batch", &color))
            .unwrap();
        pass.set_pipeline(&f.pipeline).unwrap();
        pass.bind_sampler("Sampler0", Some(&sampled)).unwrap();

        let upload = |uniforms: &GpuBuffer, upload: &mut dyn UniformUploader| {
            upload.upload("Projection", uniforms.slice(256, 64).unwrap());
        };
        let objects = [
            RenderObject::new(f.vertices.slice_all(), 6),
            RenderObject::new(f.vertices.slice_all(), 3)
                .with_first_index(3)
                .with_uniforms(&upload),
        ];

        // Projection is not bound before the batch, so the first object needs the skip.
        let indices = f.indices.slice_all();
        let index_type = Some(IndexType::Short);
        assert!(pass
            .draw_multiple_indexed(&objects, Some(&indices), index_type, &[], &f.uniforms)
            .is_err());
        pass.draw_multiple_indexed(
            &objects,
            Some(&indices),
            Some(IndexType::Short),
            &["Projection"],
            &f.uniforms,
        )
        .unwrap();
        pass.close().unwrap();

        let draws = f.backend.take_draw_calls();
        assert_eq!(draws.len(), 2);
        assert!(draws[0].uniforms.is_empty());
        assert_eq!(draws[1].uniforms[0].1.offset, 256);
        assert_eq!(
            draws[1].primitive,
            DrawPrimitive::Indexed {
                base_vertex: 0,
                first_index: 3,
                index_count: 3,
                instance_count: 1
            }
        );
    }

    #[test]
    fn test_draw_multiple_indexed_needs_index_buffer() {
        let f = fixture();
        let color = f.color.create_view().unwrap();
        let mut encoder = f.device.create_command_encoder();
        let mut pass = encoder
            .create_render_pass(RenderPassDescriptor::new("batch", &color))
            .unwrap();
        pass.set_pipeline(&f.pipeline).unwrap();
        let objects: [RenderObject<'_, ()>; 1] = [RenderObject::new(f.vertices.slice_all(), 3)];
        assert!(pass
            .draw_multiple_indexed(&objects, None, None, &["Projection", "Sampler0"], &())
            .is_err());
    }
}
