//! Command recording.
//!
//! A [`CommandEncoder`] records transfer commands and opens [`RenderPass`]es.
//! Commands are submitted to the backend in the order they are recorded; every
//! operation is validated first and leaves no trace when it fails.
//!
//! # Example
//!
//! ```ignore
//! let mut encoder = device.create_command_encoder();
//! encoder.write_to_buffer(&uniforms, bytemuck::bytes_of(&projection), 0)?;
//!
//! let color = device.create_texture_view(&main_color)?;
//! let mut pass = encoder.create_render_pass(
//!     RenderPassDescriptor::new("Main", &color).with_clear_color(0xFF00_0000),
//! )?;
//! pass.set_pipeline(&compiled)?;
//! pass.set_vertex_buffer(0, vertices.slice_all())?;
//! pass.draw(0, 3)?;
//! pass.close()?;
//!
//! let fence = encoder.create_fence();
//! ```

mod pass;

pub use pass::{RenderObject, RenderPass, UniformUploadFn, UniformUploader};

use std::sync::Arc;

use crate::backend::ClearValue;
use crate::device::GpuDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{
    BufferReadView, GpuBuffer, GpuBufferSlice, GpuFence, GpuTexture, GpuTextureView,
};
use crate::types::TextureRegion;

/// Attachments and clear values of a render pass.
#[derive(Debug)]
pub struct RenderPassDescriptor<'a> {
    pub label: String,
    pub color: &'a GpuTextureView,
    /// Packed ARGB color written before the first draw.
    pub clear_color: Option<u32>,
    pub depth: Option<&'a GpuTextureView>,
    /// Depth written before the first draw.
    pub clear_depth: Option<f64>,
}

impl<'a> RenderPassDescriptor<'a> {
    /// Create a pass drawing into `color`.
    pub fn new(label: impl Into<String>, color: &'a GpuTextureView) -> Self {
        Self {
            label: label.into(),
            color,
            clear_color: None,
            depth: None,
            clear_depth: None,
        }
    }

    /// Clear the color attachment when the pass opens.
    pub fn with_clear_color(mut self, argb: u32) -> Self {
        self.clear_color = Some(argb);
        self
    }

    /// Attach a depth texture.
    pub fn with_depth(mut self, depth: &'a GpuTextureView) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Clear the depth attachment when the pass opens.
    pub fn with_clear_depth(mut self, depth: f64) -> Self {
        self.clear_depth = Some(depth);
        self
    }
}

/// Records and submits commands to a device.
#[derive(Debug)]
pub struct CommandEncoder {
    device: Arc<GpuDevice>,
}

impl CommandEncoder {
    pub(crate) fn new(device: Arc<GpuDevice>) -> Self {
        Self { device }
    }

    /// The device commands are submitted to.
    pub fn device(&self) -> &Arc<GpuDevice> {
        &self.device
    }

    /// Open a render pass on the descriptor's attachments.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::ResourceReleased`] if an attachment is closed or its
    ///   texture released.
    /// - [`GraphicsError::InvalidArgument`] if an attachment has the wrong
    ///   aspect or the attachments differ in size.
    /// - [`GraphicsError::AttachmentInUse`] if another open pass uses one of
    ///   the attachments.
    pub fn create_render_pass(
        &mut self,
        descriptor: RenderPassDescriptor<'_>,
    ) -> GraphicsResult<RenderPass<'_>> {
        RenderPass::open(self, descriptor)
    }

    /// Upload `data` into `buffer` at `offset`.
    ///
    /// Rejected for CPU-readable usages, which only the GPU writes.
    pub fn write_to_buffer(
        &self,
        buffer: &GpuBuffer,
        data: &[u8],
        offset: u64,
    ) -> GraphicsResult<()> {
        let shared = buffer.shared();
        shared.ensure_live()?;
        if shared.usage().is_readable() {
            return Err(GraphicsError::InvalidArgument(format!(
                "buffer {} has read-back usage {:?} and cannot be written by the CPU",
                shared.label(),
                shared.usage()
            )));
        }
        check_range(shared.label(), offset, data.len() as u64, shared.size())?;
        self.device.backend().write_buffer(shared.id(), offset, data)?;
        log::trace!(
            "CommandEncoder: wrote {} bytes to {} at {}",
            data.len(),
            shared.label(),
            offset
        );
        Ok(())
    }

    /// Upload plain-old-data values into `buffer` at `offset`.
    pub fn write_pod<T: bytemuck::Pod>(
        &self,
        buffer: &GpuBuffer,
        values: &[T],
        offset: u64,
    ) -> GraphicsResult<()> {
        self.write_to_buffer(buffer, bytemuck::cast_slice(values), offset)
    }

    /// Upload `data` at the start of `slice`.
    pub fn write_to_slice(&self, slice: &GpuBufferSlice, data: &[u8]) -> GraphicsResult<()> {
        let shared = slice.resolve()?;
        if shared.usage().is_readable() {
            return Err(GraphicsError::InvalidArgument(format!(
                "buffer {} has read-back usage {:?} and cannot be written by the CPU",
                shared.label(),
                shared.usage()
            )));
        }
        check_range(shared.label(), 0, data.len() as u64, slice.length())?;
        self.device
            .backend()
            .write_buffer(shared.id(), slice.offset(), data)
    }

    /// Read the whole of `buffer` back to the CPU.
    pub fn read_buffer(&self, buffer: &GpuBuffer) -> GraphicsResult<BufferReadView> {
        self.read_buffer_range(buffer, 0, buffer.size())
    }

    /// Read `length` bytes of `buffer` at `offset` back to the CPU.
    ///
    /// Requires a CPU-readable usage.
    pub fn read_buffer_range(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        length: u64,
    ) -> GraphicsResult<BufferReadView> {
        let shared = buffer.shared();
        shared.ensure_live()?;
        if !shared.usage().is_readable() {
            return Err(GraphicsError::InvalidArgument(format!(
                "buffer {} has usage {:?} and cannot be read by the CPU",
                shared.label(),
                shared.usage()
            )));
        }
        check_range(shared.label(), offset, length, shared.size())?;
        let data = self.device.backend().read_buffer(shared.id(), offset, length)?;
        Ok(BufferReadView::new(shared.label(), data))
    }

    /// Fill mip level 0 of a color texture with a packed ARGB color.
    pub fn clear_color_texture(&self, texture: &GpuTexture, argb: u32) -> GraphicsResult<()> {
        texture.ensure_live()?;
        if !texture.format().has_color_aspect() {
            return Err(GraphicsError::InvalidArgument(format!(
                "texture {} has no color aspect",
                texture.label()
            )));
        }
        self.device
            .backend()
            .clear_texture(texture.id(), 0, ClearValue::Color(argb))
    }

    /// Fill mip level 0 of a depth texture with `depth`.
    pub fn clear_depth_texture(&self, texture: &GpuTexture, depth: f64) -> GraphicsResult<()> {
        texture.ensure_live()?;
        if !texture.format().has_depth_aspect() {
            return Err(GraphicsError::InvalidArgument(format!(
                "texture {} has no depth aspect",
                texture.label()
            )));
        }
        self.device
            .backend()
            .clear_texture(texture.id(), 0, ClearValue::Depth(depth))
    }

    /// Clear a color and a depth texture of the same size together.
    pub fn clear_color_and_depth_textures(
        &self,
        color: &GpuTexture,
        argb: u32,
        depth: &GpuTexture,
        depth_value: f64,
    ) -> GraphicsResult<()> {
        color.ensure_live()?;
        depth.ensure_live()?;
        if color.width(0) != depth.width(0) || color.height(0) != depth.height(0) {
            return Err(GraphicsError::InvalidArgument(format!(
                "color {} ({}x{}) and depth {} ({}x{}) differ in size",
                color.label(),
                color.width(0),
                color.height(0),
                depth.label(),
                depth.width(0),
                depth.height(0)
            )));
        }
        if !color.format().has_color_aspect() {
            return Err(GraphicsError::InvalidArgument(format!(
                "texture {} has no color aspect",
                color.label()
            )));
        }
        if !depth.format().has_depth_aspect() {
            return Err(GraphicsError::InvalidArgument(format!(
                "texture {} has no depth aspect",
                depth.label()
            )));
        }
        let backend = self.device.backend();
        backend.clear_texture(color.id(), 0, ClearValue::Color(argb))?;
        backend.clear_texture(depth.id(), 0, ClearValue::Depth(depth_value))
    }

    /// Upload tightly packed pixels into `region` of `texture`.
    pub fn write_to_texture(
        &self,
        texture: &GpuTexture,
        pixels: &[u8],
        region: TextureRegion,
    ) -> GraphicsResult<()> {
        texture.ensure_live()?;
        check_region(texture, &region)?;
        let expected = region.texel_count() * u64::from(texture.format().pixel_size());
        if pixels.len() as u64 != expected {
            return Err(GraphicsError::InvalidArgument(format!(
                "region {region:?} of {} needs {expected} bytes, got {}",
                texture.label(),
                pixels.len()
            )));
        }
        self.device.backend().write_texture(texture.id(), &region, pixels)
    }

    /// Copy `region` of `texture` into `buffer` at `offset`, then run `on_complete`.
    ///
    /// Rejected for CPU-writable buffer usages, which the GPU never writes.
    pub fn copy_texture_to_buffer(
        &self,
        texture: &GpuTexture,
        buffer: &GpuBuffer,
        offset: u64,
        on_complete: impl FnOnce(),
        region: TextureRegion,
    ) -> GraphicsResult<()> {
        texture.ensure_live()?;
        let shared = buffer.shared();
        shared.ensure_live()?;
        if shared.usage().is_writable() {
            return Err(GraphicsError::InvalidArgument(format!(
                "buffer {} has CPU upload usage {:?} and cannot receive GPU copies",
                shared.label(),
                shared.usage()
            )));
        }
        check_region(texture, &region)?;
        let bytes = region.texel_count() * u64::from(texture.format().pixel_size());
        check_range(shared.label(), offset, bytes, shared.size())?;

        self.device
            .backend()
            .copy_texture_to_buffer(texture.id(), &region, shared.id(), offset)?;
        log::trace!(
            "CommandEncoder: copied {} bytes from {} to {}",
            bytes,
            texture.label(),
            shared.label()
        );
        on_complete();
        Ok(())
    }

    /// Copy `region` of `source` into `destination` at (`x`, `y`) of the same mip level.
    pub fn copy_texture_to_texture(
        &self,
        source: &GpuTexture,
        destination: &GpuTexture,
        region: TextureRegion,
        x: u32,
        y: u32,
    ) -> GraphicsResult<()> {
        source.ensure_live()?;
        destination.ensure_live()?;
        if source.format() != destination.format() {
            return Err(GraphicsError::InvalidArgument(format!(
                "cannot copy {:?} texture {} into {:?} texture {}",
                source.format(),
                source.label(),
                destination.format(),
                destination.label()
            )));
        }
        check_region(source, &region)?;
        let target = TextureRegion::new(region.mip_level, x, y, region.width, region.height);
        check_region(destination, &target)?;
        self.device
            .backend()
            .copy_texture_to_texture(source.id(), &region, destination.id(), x, y)
    }

    /// Show `texture` on the output surface.
    pub fn present_texture(&self, texture: &GpuTexture) -> GraphicsResult<()> {
        texture.ensure_live()?;
        if !texture.format().has_color_aspect() {
            return Err(GraphicsError::InvalidArgument(format!(
                "cannot present depth texture {}",
                texture.label()
            )));
        }
        self.device.backend().present(texture.id())
    }

    /// Create a fence signaled once everything submitted so far has finished.
    pub fn create_fence(&self) -> GpuFence {
        self.device.backend().create_fence()
    }
}

fn check_range(label: &str, offset: u64, length: u64, size: u64) -> GraphicsResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(GraphicsError::OutOfRange(format!(
            "{length} bytes at offset {offset} exceed {label} of {size} bytes"
        ))),
    }
}

fn check_region(texture: &GpuTexture, region: &TextureRegion) -> GraphicsResult<()> {
    if region.mip_level >= texture.mip_levels() {
        return Err(GraphicsError::OutOfRange(format!(
            "mip level {} of texture {} with {} levels",
            region.mip_level,
            texture.label(),
            texture.mip_levels()
        )));
    }
    let (width, height) = (texture.width(region.mip_level), texture.height(region.mip_level));
    if !region.fits_within(width, height) {
        return Err(GraphicsError::OutOfRange(format!(
            "region {region:?} exceeds {width}x{height} level of texture {}",
            texture.label()
        )));
    }
    Ok(())
}
