//! GPU resources.
//!
//! This module contains the GPU resource types that are created by [`GpuDevice`]:
//! - [`GpuBuffer`] - GPU memory buffer, with [`GpuBufferSlice`] ranges and
//!   [`BufferReadView`] readbacks
//! - [`GpuTexture`] - 2D texture with mip levels, and [`GpuTextureView`]s of it
//! - [`GpuFence`] - CPU-GPU completion signal
//! - [`MappableRingBuffer`] - Three buffers rotated under fence protection
//!
//! Resources are owned handles. Releasing one (explicitly with `close` or by
//! dropping it) frees the backend storage exactly once; slices and views that
//! still refer to it become invalid and fail with
//! [`GraphicsError::ResourceReleased`] when used.
//!
//! [`GpuDevice`]: crate::GpuDevice
//! [`GraphicsError::ResourceReleased`]: crate::GraphicsError::ResourceReleased

mod buffer;
mod fence;
mod ring_buffer;
mod texture;

pub use buffer::{BufferReadView, GpuBuffer, GpuBufferSlice};
pub use fence::{FenceSignal, GpuFence};
pub use ring_buffer::MappableRingBuffer;
pub use texture::{GpuTexture, GpuTextureView};

pub(crate) use buffer::BufferShared;
pub(crate) use texture::{TextureShared, ViewTarget};

use crate::error::GraphicsResult;

/// Release capability shared by every closable resource.
pub trait GpuResource {
    /// Debug label.
    fn label(&self) -> &str;

    /// Returns true once the resource has been released.
    fn is_closed(&self) -> bool;

    /// Release the resource. Releasing twice is an error.
    fn close(&mut self) -> GraphicsResult<()>;
}

impl GpuResource for GpuBuffer {
    fn label(&self) -> &str {
        GpuBuffer::label(self)
    }

    fn is_closed(&self) -> bool {
        GpuBuffer::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        GpuBuffer::close(self)
    }
}

impl GpuResource for GpuTexture {
    fn label(&self) -> &str {
        GpuTexture::label(self)
    }

    fn is_closed(&self) -> bool {
        GpuTexture::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        GpuTexture::close(self)
    }
}

impl GpuResource for GpuTextureView {
    fn label(&self) -> &str {
        GpuTextureView::label(self)
    }

    fn is_closed(&self) -> bool {
        GpuTextureView::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        GpuTextureView::close(self)
    }
}

impl GpuResource for GpuFence {
    fn label(&self) -> &str {
        "fence"
    }

    fn is_closed(&self) -> bool {
        GpuFence::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        GpuFence::close(self)
    }
}

impl GpuResource for BufferReadView {
    fn label(&self) -> &str {
        BufferReadView::label(self)
    }

    fn is_closed(&self) -> bool {
        BufferReadView::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        BufferReadView::close(self)
    }
}

impl GpuResource for MappableRingBuffer {
    fn label(&self) -> &str {
        MappableRingBuffer::label(self)
    }

    fn is_closed(&self) -> bool {
        MappableRingBuffer::is_closed(self)
    }

    fn close(&mut self) -> GraphicsResult<()> {
        MappableRingBuffer::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceParameters;
    use crate::device::GpuDevice;
    use crate::types::{BufferDescriptor, BufferType, BufferUsage, TextureDescriptor, TextureFormat};

    #[test]
    fn test_close_through_trait() {
        let device = GpuDevice::dummy(DeviceParameters::default());
        let buffer_desc = BufferDescriptor::new(BufferType::Uniform, BufferUsage::StaticWrite, 16)
            .with_label("ubo");
        let buffer = device.create_buffer(&buffer_desc).unwrap();
        let texture_desc = TextureDescriptor::new(TextureFormat::Rgba8, 4, 4)
            .with_label("albedo");
        let texture = device.create_texture(&texture_desc).unwrap();
        let view = texture.create_view().unwrap();
        let fence = device.create_command_encoder().create_fence();

        let mut resources: Vec<Box<dyn GpuResource>> =
            vec![Box::new(buffer), Box::new(view), Box::new(texture), Box::new(fence)];
        let labels: Vec<&str> = resources.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["ubo", "albedo view", "albedo", "fence"]);

        for resource in &mut resources {
            resource.close().unwrap();
            assert!(resource.is_closed());
            assert!(resource.close().is_err());
        }
        assert_eq!(device.buffer_count(), 0);
        assert_eq!(device.texture_count(), 0);
    }
}
