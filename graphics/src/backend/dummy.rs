//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. Buffers and textures live in CPU
//! memory so that writes, clears, copies and readbacks are observable, and
//! draws and presents are recorded instead of rasterized.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::FenceMode;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{FenceSignal, GpuFence};
use crate::types::{BufferDescriptor, TextureDescriptor, TextureFormat, TextureRegion};

use super::{
    AdapterInfo, ClearValue, DrawCall, GpuBackend, ProgramInfo, ProgramSource, ResourceId,
};

/// Marker that makes the dummy compiler reject a shader source.
pub const ERROR_DIRECTIVE: &str = "#error";

#[derive(Debug)]
struct MipLevel {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
struct TextureStorage {
    format: TextureFormat,
    levels: Vec<MipLevel>,
}

impl TextureStorage {
    fn level(&self, id: ResourceId, mip_level: u32) -> GraphicsResult<&MipLevel> {
        self.levels.get(mip_level as usize).ok_or_else(|| {
            GraphicsError::OutOfRange(format!("texture {id} has no mip level {mip_level}"))
        })
    }

    fn level_mut(&mut self, id: ResourceId, mip_level: u32) -> GraphicsResult<&mut MipLevel> {
        self.levels.get_mut(mip_level as usize).ok_or_else(|| {
            GraphicsError::OutOfRange(format!("texture {id} has no mip level {mip_level}"))
        })
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    fence_mode: FenceMode,
    buffers: Mutex<HashMap<ResourceId, Vec<u8>>>,
    textures: Mutex<HashMap<ResourceId, TextureStorage>>,
    draws: Mutex<Vec<DrawCall>>,
    presented: Mutex<Vec<ResourceId>>,
    pending_fences: Mutex<Vec<FenceSignal>>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new(fence_mode: FenceMode) -> Self {
        Self {
            fence_mode,
            buffers: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            draws: Mutex::new(Vec::new()),
            presented: Mutex::new(Vec::new()),
            pending_fences: Mutex::new(Vec::new()),
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    /// Fence signaling mode.
    pub fn fence_mode(&self) -> FenceMode {
        self.fence_mode
    }

    /// Number of allocated buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Number of allocated textures.
    pub fn texture_count(&self) -> usize {
        self.textures.lock().len()
    }

    /// Copy of a buffer's contents.
    pub fn buffer_contents(&self, id: ResourceId) -> Option<Vec<u8>> {
        self.buffers.lock().get(&id).cloned()
    }

    /// Copy of one mip level of a texture.
    pub fn texture_contents(&self, id: ResourceId, mip_level: u32) -> Option<Vec<u8>> {
        self.textures
            .lock()
            .get(&id)
            .and_then(|storage| storage.levels.get(mip_level as usize))
            .map(|level| level.data.clone())
    }

    /// Draws recorded so far.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.draws.lock().clone()
    }

    /// Take and clear the recorded draws.
    pub fn take_draw_calls(&self) -> Vec<DrawCall> {
        std::mem::take(&mut *self.draws.lock())
    }

    /// Textures presented so far, in order.
    pub fn presented(&self) -> Vec<ResourceId> {
        self.presented.lock().clone()
    }

    /// Number of manual fences not yet signaled.
    pub fn pending_fence_count(&self) -> usize {
        self.pending_fences.lock().len()
    }

    /// Signal every outstanding manual fence. Returns how many were signaled.
    pub fn signal_all_fences(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending_fences.lock());
        for signal in &pending {
            signal.signal();
        }
        log::trace!("DummyBackend: signaled {} fences", pending.len());
        pending.len()
    }

    fn encode_clear(format: TextureFormat, value: ClearValue) -> GraphicsResult<Vec<u8>> {
        match (value, format) {
            (ClearValue::Color(argb), TextureFormat::Rgba8) => {
                let [a, r, g, b] = argb.to_be_bytes();
                Ok(vec![r, g, b, a])
            }
            (ClearValue::Color(argb), TextureFormat::Red8) => Ok(vec![(argb >> 16) as u8]),
            (ClearValue::Depth(depth), TextureFormat::Depth32) => {
                Ok((depth as f32).to_le_bytes().to_vec())
            }
            (value, format) => Err(GraphicsError::InvalidArgument(format!(
                "cannot clear {format:?} texture with {value:?}"
            ))),
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new(FenceMode::Immediate)
    }
}

fn check_range(what: ResourceId, offset: u64, size: u64, len: usize) -> GraphicsResult<()> {
    match offset.checked_add(size) {
        Some(end) if end <= len as u64 => Ok(()),
        _ => Err(GraphicsError::OutOfRange(format!(
            "{size} bytes at offset {offset} exceed buffer {what} of {len} bytes"
        ))),
    }
}

fn unknown(kind: &str, id: ResourceId) -> GraphicsError {
    GraphicsError::ResourceReleased(format!("{kind} {id} does not exist"))
}

impl GpuBackend for DummyBackend {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            backend_name: self.name().to_string(),
            vendor: "None".to_string(),
            renderer: "Software (CPU memory)".to_string(),
            version: crate::VERSION.to_string(),
        }
    }

    fn create_buffer(&self, id: ResourceId, descriptor: &BufferDescriptor) -> GraphicsResult<()> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let size = usize::try_from(descriptor.size).map_err(|_| {
            GraphicsError::InvalidArgument(format!("buffer size {} too large", descriptor.size))
        })?;
        self.buffers.lock().insert(id, vec![0; size]);
        Ok(())
    }

    fn destroy_buffer(&self, id: ResourceId) {
        log::trace!("DummyBackend: destroying buffer {id}");
        self.buffers.lock().remove(&id);
    }

    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        let mut buffers = self.buffers.lock();
        let storage = buffers.get_mut(&id).ok_or_else(|| unknown("buffer", id))?;
        check_range(id, offset, data.len() as u64, storage.len())?;
        let start = offset as usize;
        storage[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: ResourceId, offset: u64, size: u64) -> GraphicsResult<Vec<u8>> {
        let buffers = self.buffers.lock();
        let storage = buffers.get(&id).ok_or_else(|| unknown("buffer", id))?;
        check_range(id, offset, size, storage.len())?;
        let start = offset as usize;
        Ok(storage[start..start + size as usize].to_vec())
    }

    fn create_texture(&self, id: ResourceId, descriptor: &TextureDescriptor) -> GraphicsResult<()> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {} mips)",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.mip_levels
        );
        let pixel_size = descriptor.format.pixel_size() as usize;
        let levels = (0..descriptor.mip_levels)
            .map(|mip| {
                let width = (descriptor.width >> mip).max(1);
                let height = (descriptor.height >> mip).max(1);
                MipLevel {
                    width,
                    height,
                    data: vec![0; width as usize * height as usize * pixel_size],
                }
            })
            .collect();
        self.textures.lock().insert(
            id,
            TextureStorage {
                format: descriptor.format,
                levels,
            },
        );
        Ok(())
    }

    fn destroy_texture(&self, id: ResourceId) {
        log::trace!("DummyBackend: destroying texture {id}");
        self.textures.lock().remove(&id);
    }

    fn clear_texture(
        &self,
        id: ResourceId,
        mip_level: u32,
        value: ClearValue,
    ) -> GraphicsResult<()> {
        let mut textures = self.textures.lock();
        let storage = textures.get_mut(&id).ok_or_else(|| unknown("texture", id))?;
        let pixel = Self::encode_clear(storage.format, value)?;
        let level = storage.level_mut(id, mip_level)?;
        for chunk in level.data.chunks_exact_mut(pixel.len()) {
            chunk.copy_from_slice(&pixel);
        }
        Ok(())
    }

    fn write_texture(
        &self,
        id: ResourceId,
        region: &TextureRegion,
        pixels: &[u8],
    ) -> GraphicsResult<()> {
        let mut textures = self.textures.lock();
        let storage = textures.get_mut(&id).ok_or_else(|| unknown("texture", id))?;
        let pixel_size = storage.format.pixel_size() as usize;
        let level = storage.level_mut(id, region.mip_level)?;
        if !region.fits_within(level.width, level.height) {
            return Err(GraphicsError::OutOfRange(format!(
                "region {region:?} exceeds {}x{} level of texture {id}",
                level.width, level.height
            )));
        }
        let row_bytes = region.width as usize * pixel_size;
        if pixels.len() != row_bytes * region.height as usize {
            return Err(GraphicsError::InvalidArgument(format!(
                "expected {} bytes of pixels, got {}",
                row_bytes * region.height as usize,
                pixels.len()
            )));
        }
        for (row, source) in pixels.chunks_exact(row_bytes.max(1)).enumerate() {
            let start =
                ((region.y as usize + row) * level.width as usize + region.x as usize) * pixel_size;
            level.data[start..start + row_bytes].copy_from_slice(source);
        }
        Ok(())
    }

    fn read_texture(&self, id: ResourceId, region: &TextureRegion) -> GraphicsResult<Vec<u8>> {
        let textures = self.textures.lock();
        let storage = textures.get(&id).ok_or_else(|| unknown("texture", id))?;
        let pixel_size = storage.format.pixel_size() as usize;
        let level = storage.level(id, region.mip_level)?;
        if !region.fits_within(level.width, level.height) {
            return Err(GraphicsError::OutOfRange(format!(
                "region {region:?} exceeds {}x{} level of texture {id}",
                level.width, level.height
            )));
        }
        let row_bytes = region.width as usize * pixel_size;
        let mut pixels = Vec::with_capacity(row_bytes * region.height as usize);
        for row in 0..region.height as usize {
            let start =
                ((region.y as usize + row) * level.width as usize + region.x as usize) * pixel_size;
            pixels.extend_from_slice(&level.data[start..start + row_bytes]);
        }
        Ok(pixels)
    }

    fn compile_program(&self, source: &ProgramSource<'_>) -> Result<ProgramInfo, String> {
        log::trace!("DummyBackend: compiling program {}", source.location);
        let stages = [
            ("vertex", source.vertex_source),
            ("fragment", source.fragment_source),
        ];
        for (stage, text) in stages {
            if text.trim().is_empty() {
                return Err(format!("{}: empty {stage} shader", source.location));
            }
            let directive = text
                .lines()
                .find(|line| line.trim_start().starts_with(ERROR_DIRECTIVE));
            if let Some(line) = directive {
                return Err(format!("{}: {stage} shader: {}", source.location, line.trim()));
            }
        }

        // A real compiler strips unreferenced uniforms, so only names that
        // appear in the source text are reported as active.
        let used = |name: &str| {
            source.vertex_source.contains(name) || source.fragment_source.contains(name)
        };
        Ok(ProgramInfo {
            active_uniforms: source
                .uniforms
                .iter()
                .map(|uniform| uniform.name.clone())
                .filter(|name| used(name))
                .collect(),
            active_samplers: source
                .samplers
                .iter()
                .filter(|name| used(name))
                .cloned()
                .collect(),
        })
    }

    fn draw(&self, call: DrawCall) -> GraphicsResult<()> {
        log::trace!(
            "DummyBackend: draw {:?} with {} in pass {}",
            call.primitive,
            call.pipeline,
            call.pass
        );
        self.draws.lock().push(call);
        Ok(())
    }

    fn present(&self, texture: ResourceId) -> GraphicsResult<()> {
        if !self.textures.lock().contains_key(&texture) {
            return Err(unknown("texture", texture));
        }
        log::trace!("DummyBackend: presenting texture {texture}");
        self.presented.lock().push(texture);
        Ok(())
    }

    fn create_fence(&self) -> GpuFence {
        match self.fence_mode {
            FenceMode::Immediate => GpuFence::signaled(),
            FenceMode::Delayed(latency) => GpuFence::with_deadline(Instant::now() + latency),
            FenceMode::Manual => {
                let (fence, signal) = GpuFence::pending();
                self.pending_fences.lock().push(signal);
                fence
            }
        }
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);
