//! Buffer types and descriptors.

/// Role of a buffer in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    /// Vertex data.
    Vertices,
    /// Index data.
    Indices,
    /// Destination of pixel reads from a texture.
    PixelPack,
    /// Source of a buffer-to-buffer copy.
    CopyRead,
    /// Destination of a buffer-to-buffer copy.
    CopyWrite,
    /// Source of pixel uploads into a texture.
    PixelUnpack,
    /// Uniform block data.
    Uniform,
}

impl BufferType {
    /// Returns true if buffers of this type hold geometry (vertices or indices).
    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::Vertices | Self::Indices)
    }
}

/// Expected access pattern of a buffer.
///
/// The `*Write` usages are written by the CPU and read by the GPU, the `*Read`
/// usages are written by the GPU and read back by the CPU, and the `*Copy`
/// usages never leave the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Rewritten often by the CPU.
    DynamicWrite,
    /// Written once by the CPU.
    #[default]
    StaticWrite,
    /// Written once by the CPU, used a handful of times.
    StreamWrite,
    /// Read back once.
    StaticRead,
    /// Read back often.
    DynamicRead,
    /// Read back once, used a handful of times.
    StreamRead,
    /// GPU-only, rewritten often.
    DynamicCopy,
    /// GPU-only, written once.
    StaticCopy,
    /// GPU-only, used a handful of times.
    StreamCopy,
}

impl BufferUsage {
    /// Returns true if the CPU may map the buffer for reading.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::StaticRead | Self::DynamicRead | Self::StreamRead)
    }

    /// Returns true if the CPU may map the buffer for writing.
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            Self::DynamicWrite | Self::StaticWrite | Self::StreamWrite
        )
    }

    /// Returns true if the CPU can map the buffer at all.
    pub fn is_mappable(&self) -> bool {
        self.is_readable() || self.is_writable()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Role of the buffer.
    pub buffer_type: BufferType,
    /// Access pattern.
    pub usage: BufferUsage,
    /// Size in bytes.
    pub size: u64,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(buffer_type: BufferType, usage: BufferUsage, size: u64) -> Self {
        Self {
            label: None,
            buffer_type,
            usage,
            size,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label used in logs and error messages.
    pub(crate) fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed buffer>")
    }
}
