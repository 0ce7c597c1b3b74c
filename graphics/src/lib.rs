//! # Amber Graphics
//!
//! GPU resource, synchronization and command abstraction layer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GpuDevice`] - Creates buffers, textures, views, encoders and pipelines
//! - [`CommandEncoder`] / [`RenderPass`] - Validated transfer and draw recording
//! - [`GpuFence`] / [`MappableRingBuffer`] - CPU/GPU synchronization
//! - [`VertexFormat`] / [`DrawMode`] - Vertex layouts and primitive assembly
//! - [`GpuBackend`] - Trait for backend implementations, with a CPU-memory
//!   [`DummyBackend`] for testing
//!
//! ## Example
//!
//! ```ignore
//! use amber_graphics::{DeviceManager, DeviceParameters, GpuDevice};
//!
//! let manager = DeviceManager::new();
//! manager.set_device(GpuDevice::dummy(DeviceParameters::default()));
//!
//! let device = manager.required_device()?;
//! let mut encoder = device.create_command_encoder();
//! // Upload, open passes, draw...
//! let fence = encoder.create_fence();
//! fence.await_completion(None);
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod resources;
pub mod types;
pub mod vertex;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::DummyBackend;
pub use backend::{AdapterInfo, GpuBackend, ResourceId};
pub use command::{
    CommandEncoder, RenderObject, RenderPass, RenderPassDescriptor, UniformUploader,
};
pub use config::{DeviceParameters, FenceMode};
pub use device::{DeviceCapabilities, GpuDevice};
pub use error::{ErrorKind, GraphicsError, GraphicsResult};
pub use manager::DeviceManager;
pub use pipeline::{CompiledRenderPipeline, RenderPipeline, UniformDescription};
pub use resources::{
    BufferReadView, GpuBuffer, GpuBufferSlice, GpuFence, GpuResource, GpuTexture,
    GpuTextureView, MappableRingBuffer,
};
pub use types::{
    AddressMode, BlendFunction, BufferDescriptor, BufferType, BufferUsage, ColorWriteMask,
    DepthTestFunction, FilterMode, SamplerState, ScissorRect, ShaderType, TextureDescriptor,
    TextureFormat, TextureRegion, UniformType,
};
pub use vertex::{DrawMode, IndexType, VertexFormat, VertexFormatElement};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Only logs the version; devices are created explicitly.
pub fn init() {
    log::info!("Amber Graphics v{} initialized", VERSION);
}
