//! GPU buffer resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::backend::{BufferRange, ResourceId};
use crate::device::GpuDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::{BufferDescriptor, BufferType, BufferUsage};

/// State shared between a buffer and the slices taken from it.
#[derive(Debug)]
pub(crate) struct BufferShared {
    id: ResourceId,
    label: String,
    buffer_type: BufferType,
    usage: BufferUsage,
    size: u64,
    released: AtomicBool,
    device: Weak<GpuDevice>,
}

impl BufferShared {
    pub(crate) fn id(&self) -> ResourceId {
        self.id
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_live(&self) -> GraphicsResult<()> {
        if self.is_released() {
            return Err(GraphicsError::ResourceReleased(format!(
                "buffer {}",
                self.label
            )));
        }
        Ok(())
    }

    /// Free the backend storage. Returns false if it was already freed.
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(device) = self.device.upgrade() {
            device.backend().destroy_buffer(self.id);
        }
        log::trace!("GpuBuffer: released {} ({})", self.label, self.id);
        true
    }
}

/// A GPU buffer resource.
///
/// Buffers are created by [`GpuDevice::create_buffer`]. A buffer is an owned
/// handle: [`close`](Self::close) or dropping it frees the storage, after which
/// every [`GpuBufferSlice`] taken from it reports itself invalid.
///
/// # Example
///
/// ```ignore
/// let desc = BufferDescriptor::new(BufferType::Vertices, BufferUsage::DynamicWrite, 1024);
/// let buffer = device.create_buffer(&desc)?;
/// let first_half = buffer.slice(0, 512)?;
/// ```
pub struct GpuBuffer {
    shared: Arc<BufferShared>,
}

impl GpuBuffer {
    /// Create a new buffer handle (called by GpuDevice).
    pub(crate) fn new(
        device: Weak<GpuDevice>,
        id: ResourceId,
        descriptor: &BufferDescriptor,
    ) -> Self {
        Self {
            shared: Arc::new(BufferShared {
                id,
                label: descriptor.display_label().to_string(),
                buffer_type: descriptor.buffer_type,
                usage: descriptor.usage,
                size: descriptor.size,
                released: AtomicBool::new(false),
                device,
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<BufferShared> {
        &self.shared
    }

    /// Backend identifier.
    pub fn id(&self) -> ResourceId {
        self.shared.id
    }

    /// Get the buffer label.
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Role of the buffer.
    pub fn buffer_type(&self) -> BufferType {
        self.shared.buffer_type
    }

    /// Access pattern of the buffer.
    pub fn usage(&self) -> BufferUsage {
        self.shared.usage
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.shared.size
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<GpuDevice>> {
        self.shared.device.upgrade()
    }

    /// Returns true if the buffer was created by `device`.
    pub fn belongs_to(&self, device: &Arc<GpuDevice>) -> bool {
        std::ptr::eq(self.shared.device.as_ptr(), Arc::as_ptr(device))
    }

    /// Returns true once the buffer has been released.
    pub fn is_closed(&self) -> bool {
        self.shared.is_released()
    }

    /// Release the buffer.
    pub fn close(&mut self) -> GraphicsResult<()> {
        if !self.shared.release() {
            return Err(GraphicsError::ResourceReleased(format!(
                "buffer {} closed twice",
                self.shared.label
            )));
        }
        Ok(())
    }

    /// Take a sub-range of the buffer.
    ///
    /// Fails with [`GraphicsError::OutOfRange`] unless `offset + length <= size`.
    pub fn slice(&self, offset: u64, length: u64) -> GraphicsResult<GpuBufferSlice> {
        self.shared.ensure_live()?;
        check_bounds(&self.shared.label, offset, length, self.shared.size)?;
        Ok(GpuBufferSlice {
            buffer: Arc::downgrade(&self.shared),
            offset,
            length,
        })
    }

    /// A slice covering the whole buffer.
    pub fn slice_all(&self) -> GpuBufferSlice {
        GpuBufferSlice {
            buffer: Arc::downgrade(&self.shared),
            offset: 0,
            length: self.shared.size,
        }
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .field("type", &self.shared.buffer_type)
            .field("usage", &self.shared.usage)
            .field("size", &self.shared.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn check_bounds(label: &str, offset: u64, length: u64, size: u64) -> GraphicsResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(GraphicsError::OutOfRange(format!(
            "slice at offset {offset} with length {length} exceeds buffer {label} of {size} bytes"
        ))),
    }
}

/// A byte range of a [`GpuBuffer`].
///
/// Slices are cheap to clone and do not keep the buffer alive.
#[derive(Clone)]
pub struct GpuBufferSlice {
    buffer: Weak<BufferShared>,
    offset: u64,
    length: u64,
}

impl GpuBufferSlice {
    /// Offset in bytes from the start of the buffer.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Returns true while the parent buffer is alive.
    pub fn is_valid(&self) -> bool {
        self.buffer
            .upgrade()
            .is_some_and(|buffer| !buffer.is_released())
    }

    /// Identifier of the parent buffer, if it is still alive.
    pub fn buffer_id(&self) -> Option<ResourceId> {
        self.resolve().ok().map(|buffer| buffer.id)
    }

    /// Take a sub-range, relative to this slice.
    pub fn slice(&self, offset: u64, length: u64) -> GraphicsResult<GpuBufferSlice> {
        let buffer = self.resolve()?;
        check_bounds(&buffer.label, offset, length, self.length)?;
        Ok(GpuBufferSlice {
            buffer: self.buffer.clone(),
            offset: self.offset + offset,
            length,
        })
    }

    pub(crate) fn resolve(&self) -> GraphicsResult<Arc<BufferShared>> {
        let buffer = self.buffer.upgrade().ok_or_else(|| {
            GraphicsError::ResourceReleased("slice of a dropped buffer".to_string())
        })?;
        buffer.ensure_live()?;
        Ok(buffer)
    }

    pub(crate) fn range(&self) -> GraphicsResult<BufferRange> {
        let buffer = self.resolve()?;
        Ok(BufferRange {
            buffer: buffer.id,
            offset: self.offset,
            length: self.length,
        })
    }
}

impl From<&GpuBuffer> for GpuBufferSlice {
    fn from(buffer: &GpuBuffer) -> Self {
        buffer.slice_all()
    }
}

impl std::fmt::Debug for GpuBufferSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBufferSlice")
            .field("buffer", &self.buffer.upgrade().map(|b| b.id))
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

/// A CPU copy of a buffer range, read back from the GPU.
///
/// The contents stay readable until the view is closed.
#[derive(Debug)]
pub struct BufferReadView {
    label: String,
    data: Option<Vec<u8>>,
}

impl BufferReadView {
    pub(crate) fn new(label: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            data: Some(data),
        }
    }

    /// Label of the buffer the data came from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The read bytes.
    pub fn data(&self) -> GraphicsResult<&[u8]> {
        self.data.as_deref().ok_or_else(|| {
            GraphicsError::ResourceReleased(format!("read view of {}", self.label))
        })
    }

    /// The read bytes reinterpreted as `T` values.
    pub fn cast<T: bytemuck::Pod>(&self) -> GraphicsResult<Vec<T>> {
        let data = self.data()?;
        if data.len() % std::mem::size_of::<T>() != 0 {
            return Err(GraphicsError::InvalidArgument(format!(
                "{} bytes is not a multiple of {}",
                data.len(),
                std::mem::size_of::<T>()
            )));
        }
        Ok(bytemuck::pod_collect_to_vec(data))
    }

    /// Number of bytes read, zero once closed.
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Returns true if no bytes are readable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the view has been closed.
    pub fn is_closed(&self) -> bool {
        self.data.is_none()
    }

    /// Release the view.
    pub fn close(&mut self) -> GraphicsResult<()> {
        match self.data.take() {
            Some(_) => Ok(()),
            None => Err(GraphicsError::ResourceReleased(format!(
                "read view of {} closed twice",
                self.label
            ))),
        }
    }
}

static_assertions::assert_impl_all!(GpuBuffer: Send, Sync);
static_assertions::assert_impl_all!(GpuBufferSlice: Send, Sync);
