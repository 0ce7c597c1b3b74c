//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends, allowing
//! the resource and command layer to work with different GPU APIs.
//!
//! # Available Backends
//!
//! - `dummy` (default): CPU-memory backend for testing and development
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Resource storage (buffers, textures) addressed by [`ResourceId`]
//! - Transfer operations (writes, reads, clears, copies)
//! - Program compilation and draw submission
//! - Synchronization primitives
//!
//! Validation (bounds, usage rules, liveness) happens in the front-end types
//! before a backend is called, so backends may assume well-formed requests.

#[cfg(feature = "dummy")]
pub mod dummy;

#[cfg(feature = "dummy")]
pub use dummy::DummyBackend;

use crate::error::GraphicsResult;
use crate::pipeline::UniformDescription;
use crate::resources::GpuFence;
use crate::types::{
    BufferDescriptor, SamplerState, ScissorRect, TextureDescriptor, TextureRegion,
};
use crate::vertex::IndexType;

/// Opaque identifier of a backend resource.
///
/// Identifiers are allocated by the [`GpuDevice`](crate::GpuDevice) and are
/// never reused within one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u64);

impl ResourceId {
    /// Raw numeric value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Information about the adapter a backend drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Name of the backend implementation.
    pub backend_name: String,
    /// Hardware vendor.
    pub vendor: String,
    /// Renderer (device) name.
    pub renderer: String,
    /// Driver or API version string.
    pub version: String,
}

impl AdapterInfo {
    /// One-line human readable summary.
    pub fn implementation_information(&self) -> String {
        format!(
            "{} {} ({}), version {}",
            self.vendor, self.renderer, self.backend_name, self.version
        )
    }
}

/// Value written by a texture clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Packed ARGB color.
    Color(u32),
    /// Depth value.
    Depth(f64),
}

/// A byte range of a backend buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRange {
    pub buffer: ResourceId,
    pub offset: u64,
    pub length: u64,
}

/// A texture bound to a sampler slot for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledTexture {
    pub texture: ResourceId,
    pub base_mip: u32,
    pub mip_levels: u32,
    pub sampler: SamplerState,
}

/// Primitive range of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPrimitive {
    /// Non-indexed draw of `vertex_count` vertices.
    Vertices { first_vertex: u32, vertex_count: u32 },
    /// Indexed draw.
    Indexed {
        base_vertex: i32,
        first_index: u32,
        index_count: u32,
        instance_count: u32,
    },
}

/// A fully validated draw submitted to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Label of the render pass the draw was recorded in.
    pub pass: String,
    /// Location of the pipeline used.
    pub pipeline: String,
    pub color_target: ResourceId,
    pub depth_target: Option<ResourceId>,
    /// Bound vertex buffers by slot.
    pub vertex_buffers: Vec<(u32, BufferRange)>,
    pub index_buffer: Option<(BufferRange, IndexType)>,
    pub uniforms: Vec<(String, BufferRange)>,
    pub samplers: Vec<(String, SampledTexture)>,
    pub scissor: Option<ScissorRect>,
    pub primitive: DrawPrimitive,
}

/// Sources and declarations of a program to compile.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub location: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub uniforms: &'a [UniformDescription],
    pub samplers: &'a [String],
}

/// Reflection data of a successfully compiled program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInfo {
    /// Declared uniforms the program actually uses.
    pub active_uniforms: Vec<String>,
    /// Declared samplers the program actually uses.
    pub active_samplers: Vec<String>,
}

/// Trait implemented by every GPU backend.
pub trait GpuBackend: Send + Sync + std::fmt::Debug {
    /// Describe the adapter.
    fn adapter_info(&self) -> AdapterInfo;

    /// Allocate a zero-filled buffer.
    fn create_buffer(&self, id: ResourceId, descriptor: &BufferDescriptor) -> GraphicsResult<()>;

    /// Free a buffer. Unknown ids are ignored.
    fn destroy_buffer(&self, id: ResourceId);

    /// Write `data` at `offset`.
    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> GraphicsResult<()>;

    /// Read `size` bytes at `offset`.
    fn read_buffer(&self, id: ResourceId, offset: u64, size: u64) -> GraphicsResult<Vec<u8>>;

    /// Allocate a zero-filled texture with every mip level.
    fn create_texture(&self, id: ResourceId, descriptor: &TextureDescriptor) -> GraphicsResult<()>;

    /// Free a texture. Unknown ids are ignored.
    fn destroy_texture(&self, id: ResourceId);

    /// Fill one mip level with a single value.
    fn clear_texture(
        &self,
        id: ResourceId,
        mip_level: u32,
        value: ClearValue,
    ) -> GraphicsResult<()>;

    /// Upload tightly packed pixels into a region.
    fn write_texture(
        &self,
        id: ResourceId,
        region: &TextureRegion,
        pixels: &[u8],
    ) -> GraphicsResult<()>;

    /// Download a region as tightly packed pixels.
    fn read_texture(&self, id: ResourceId, region: &TextureRegion) -> GraphicsResult<Vec<u8>>;

    /// Copy a texture region into a buffer at `offset`.
    fn copy_texture_to_buffer(
        &self,
        texture: ResourceId,
        region: &TextureRegion,
        buffer: ResourceId,
        offset: u64,
    ) -> GraphicsResult<()> {
        let pixels = self.read_texture(texture, region)?;
        self.write_buffer(buffer, offset, &pixels)
    }

    /// Copy a region of one texture into another at (`x`, `y`) of the same mip level.
    fn copy_texture_to_texture(
        &self,
        source: ResourceId,
        region: &TextureRegion,
        destination: ResourceId,
        x: u32,
        y: u32,
    ) -> GraphicsResult<()> {
        let pixels = self.read_texture(source, region)?;
        let target = TextureRegion::new(region.mip_level, x, y, region.width, region.height);
        self.write_texture(destination, &target, &pixels)
    }

    /// Compile a program. On failure returns the compiler log.
    fn compile_program(&self, source: &ProgramSource<'_>) -> Result<ProgramInfo, String>;

    /// Execute a draw.
    fn draw(&self, call: DrawCall) -> GraphicsResult<()>;

    /// Show a texture on the output surface.
    fn present(&self, texture: ResourceId) -> GraphicsResult<()>;

    /// Create a fence that is signaled after all work submitted so far.
    fn create_fence(&self) -> GpuFence;

    /// Drop any cached compiled programs.
    fn clear_program_cache(&self) {}
}
