//! Fence-protected ring of mappable buffers.
//!
//! A [`MappableRingBuffer`] keeps [`MappableRingBuffer::BUFFER_COUNT`] equally
//! sized buffers and hands out one per frame. When the caller is done with the
//! current buffer it calls [`rotate`](MappableRingBuffer::rotate), which fences
//! the work submitted so far and advances to the next slot. Before a slot is
//! reused, [`get_blocking`](MappableRingBuffer::get_blocking) waits until the
//! GPU has finished reading it.
//!
//! # Example
//!
//! ```ignore
//! let mut ring = MappableRingBuffer::new(
//!     &manager,
//!     "Per-frame uniforms",
//!     BufferType::Uniform,
//!     BufferUsage::DynamicWrite,
//!     256,
//! )?;
//!
//! // Each frame
//! let buffer = ring.get_blocking()?;
//! encoder.write_to_buffer(buffer, bytemuck::bytes_of(&frame_data), 0)?;
//! // ... record draws that read it ...
//! ring.rotate()?;
//! ```

use std::sync::Arc;

use crate::device::GpuDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::manager::DeviceManager;
use crate::resources::{GpuBuffer, GpuFence};
use crate::types::{BufferDescriptor, BufferType, BufferUsage};

/// Ring of buffers rotated under fence protection.
#[derive(Debug)]
pub struct MappableRingBuffer {
    device: Arc<GpuDevice>,
    label: String,
    size: u64,
    buffers: Vec<GpuBuffer>,
    fences: Vec<Option<GpuFence>>,
    current: usize,
    closed: bool,
}

impl MappableRingBuffer {
    /// Number of buffers in the ring.
    pub const BUFFER_COUNT: usize = 3;

    /// Create a ring of `size`-byte buffers on the manager's device.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::NotInitialized`] if the manager has no device.
    /// - [`GraphicsError::InvalidArgument`] if `usage` is neither CPU-readable
    ///   nor CPU-writable.
    pub fn new(
        manager: &DeviceManager,
        label: impl Into<String>,
        buffer_type: BufferType,
        usage: BufferUsage,
        size: u64,
    ) -> GraphicsResult<Self> {
        let label = label.into();
        if !usage.is_mappable() {
            return Err(GraphicsError::InvalidArgument(format!(
                "ring buffer {label} needs a CPU-readable or CPU-writable usage, got {usage:?}"
            )));
        }
        let device = manager.required_device()?;

        let buffers = (0..Self::BUFFER_COUNT)
            .map(|i| {
                let descriptor = BufferDescriptor::new(buffer_type, usage, size)
                    .with_label(format!("{label} #{i}"));
                device.create_buffer(&descriptor)
            })
            .collect::<GraphicsResult<Vec<_>>>()?;

        log::trace!(
            "MappableRingBuffer: created {label} with {} x {size} bytes",
            Self::BUFFER_COUNT
        );

        Ok(Self {
            device,
            label,
            size,
            buffers,
            fences: (0..Self::BUFFER_COUNT).map(|_| None).collect(),
            current: 0,
            closed: false,
        })
    }

    /// Label of the ring.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size of each buffer in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Index of the current slot.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The current buffer, without waiting for its fence.
    pub fn current_buffer(&self) -> &GpuBuffer {
        &self.buffers[self.current]
    }

    /// Returns true if `slot` still has an unconsumed fence.
    pub fn has_pending_fence(&self, slot: usize) -> bool {
        self.fences.get(slot).is_some_and(Option::is_some)
    }

    /// The current buffer, after waiting for the GPU to finish with it.
    pub fn get_blocking(&mut self) -> GraphicsResult<&GpuBuffer> {
        self.ensure_open()?;
        if let Some(mut fence) = self.fences[self.current].take() {
            if !fence.is_signaled() {
                log::trace!(
                    "MappableRingBuffer: {} waiting on slot {}",
                    self.label,
                    self.current
                );
            }
            fence.await_completion(None);
            fence.close()?;
        }
        Ok(&self.buffers[self.current])
    }

    /// Fence the current slot and advance to the next one.
    pub fn rotate(&mut self) -> GraphicsResult<()> {
        self.ensure_open()?;
        if let Some(mut previous) = self.fences[self.current].take() {
            previous.close()?;
        }
        let fence = self.device.create_command_encoder().create_fence();
        self.fences[self.current] = Some(fence);
        self.current = (self.current + 1) % Self::BUFFER_COUNT;
        Ok(())
    }

    /// Returns true once the ring has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release every buffer and fence.
    pub fn close(&mut self) -> GraphicsResult<()> {
        self.ensure_open()?;
        self.closed = true;
        self.fences.fill_with(|| None);
        for buffer in &mut self.buffers {
            if !buffer.is_closed() {
                buffer.close()?;
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> GraphicsResult<()> {
        if self.closed {
            return Err(GraphicsError::ResourceReleased(format!(
                "ring buffer {}",
                self.label
            )));
        }
        Ok(())
    }
}

static_assertions::assert_impl_all!(MappableRingBuffer: Send, Sync);
