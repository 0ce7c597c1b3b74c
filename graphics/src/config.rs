//! Device configuration.
//!
//! [`DeviceParameters`] is the single in-process configuration object for a
//! [`GpuDevice`](crate::GpuDevice). It carries the limits the device reports
//! to callers and the knobs of the bundled dummy backend.

use std::time::Duration;

/// How the dummy backend signals fences.
///
/// Real backends signal a fence when the GPU reaches it; the dummy backend has
/// no GPU, so this decides when submitted work counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FenceMode {
    /// Fences are signaled as soon as they are created.
    #[default]
    Immediate,
    /// Fences are signaled once the given latency has elapsed after creation.
    Delayed(Duration),
    /// Fences stay unsignaled until the backend is told to complete them.
    Manual,
}

/// Parameters for creating a [`GpuDevice`](crate::GpuDevice).
///
/// # Example
///
/// ```ignore
/// let params = DeviceParameters::new()
///     .with_max_texture_size(8192)
///     .with_uniform_offset_alignment(256)
///     .with_fence_mode(FenceMode::Delayed(Duration::from_millis(2)));
/// let device = GpuDevice::dummy(params);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParameters {
    /// Largest width or height a texture may have.
    pub max_texture_size: u32,
    /// Required alignment of uniform buffer binding offsets.
    pub uniform_offset_alignment: u32,
    /// Largest buffer that can be allocated.
    pub max_buffer_size: u64,
    /// Backend extensions reported as enabled.
    pub enabled_extensions: Vec<String>,
    /// Whether debug messages are collected.
    pub debugging_enabled: bool,
    /// How many debug messages are kept.
    pub debug_message_capacity: usize,
    /// Fence signaling behavior of the dummy backend.
    pub fence_mode: FenceMode,
}

impl DeviceParameters {
    /// Create parameters with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum texture dimension.
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Set the uniform offset alignment.
    pub fn with_uniform_offset_alignment(mut self, alignment: u32) -> Self {
        self.uniform_offset_alignment = alignment;
        self
    }

    /// Set the maximum buffer size.
    pub fn with_max_buffer_size(mut self, size: u64) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Add an enabled extension.
    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        self.enabled_extensions.push(name.into());
        self
    }

    /// Enable or disable debug message collection.
    pub fn with_debugging(mut self, enabled: bool) -> Self {
        self.debugging_enabled = enabled;
        self
    }

    /// Set how many debug messages are kept before the oldest are dropped.
    pub fn with_debug_message_capacity(mut self, capacity: usize) -> Self {
        self.debug_message_capacity = capacity;
        self
    }

    /// Set the fence mode.
    pub fn with_fence_mode(mut self, mode: FenceMode) -> Self {
        self.fence_mode = mode;
        self
    }
}

impl Default for DeviceParameters {
    fn default() -> Self {
        Self {
            max_texture_size: 16384,
            uniform_offset_alignment: 256,
            max_buffer_size: 1 << 30, // 1 GB
            enabled_extensions: Vec::new(),
            debugging_enabled: false,
            debug_message_capacity: 10,
            fence_mode: FenceMode::Immediate,
        }
    }
}
