//! Graphics device.
//!
//! The [`GpuDevice`] is the main interface for creating GPU resources. It
//! wraps a [`GpuBackend`] and is shared as `Arc<GpuDevice>`; resources keep a
//! weak reference back to it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::backend::{AdapterInfo, GpuBackend, ResourceId};
use crate::command::CommandEncoder;
use crate::config::DeviceParameters;
use crate::error::{GraphicsError, GraphicsResult};
use crate::pipeline::{CompiledRenderPipeline, RenderPipeline, ShaderSourceFn};
use crate::resources::{BufferShared, GpuBuffer, GpuTexture, GpuTextureView, TextureShared};
use crate::types::{BufferDescriptor, TextureDescriptor};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_size: u32,
    /// Required alignment of uniform buffer offsets.
    pub uniform_offset_alignment: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
}

impl From<&DeviceParameters> for DeviceCapabilities {
    fn from(params: &DeviceParameters) -> Self {
        Self {
            max_texture_size: params.max_texture_size,
            uniform_offset_alignment: params.uniform_offset_alignment.max(1),
            max_buffer_size: params.max_buffer_size,
        }
    }
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self::from(&DeviceParameters::default())
    }
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GpuDevice` is `Send + Sync` and can be safely shared across threads.
/// All creation methods use interior mutability where needed.
///
/// # Example
///
/// ```ignore
/// let device = GpuDevice::dummy(DeviceParameters::default());
///
/// let buffer = device.create_buffer(
///     &BufferDescriptor::new(BufferType::Vertices, BufferUsage::StaticWrite, 1024),
/// )?;
/// let texture = device.create_texture(
///     &TextureDescriptor::new(TextureFormat::Rgba8, 1920, 1080).with_label("main"),
/// )?;
/// ```
pub struct GpuDevice {
    backend: Arc<dyn GpuBackend>,
    adapter: AdapterInfo,
    capabilities: DeviceCapabilities,
    extensions: Vec<String>,
    debugging_enabled: bool,
    debug_capacity: usize,
    debug_messages: Mutex<VecDeque<String>>,
    next_id: AtomicU64,
    // Track allocated resources (weak references for counting/debugging)
    buffers: RwLock<Vec<Weak<BufferShared>>>,
    textures: RwLock<Vec<Weak<TextureShared>>>,
    pipelines: Mutex<HashMap<String, Arc<CompiledRenderPipeline>>>,
    open_attachments: Mutex<HashSet<ResourceId>>,
}

impl GpuDevice {
    /// Create a device driving `backend`.
    pub fn new(backend: Arc<dyn GpuBackend>, params: &DeviceParameters) -> Arc<Self> {
        let adapter = backend.adapter_info();
        log::info!(
            "GpuDevice: created on {}",
            adapter.implementation_information()
        );
        Arc::new(Self {
            backend,
            adapter,
            capabilities: DeviceCapabilities::from(params),
            extensions: params.enabled_extensions.clone(),
            debugging_enabled: params.debugging_enabled,
            debug_capacity: params.debug_message_capacity,
            debug_messages: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
            pipelines: Mutex::new(HashMap::new()),
            open_attachments: Mutex::new(HashSet::new()),
        })
    }

    /// Create a device on a fresh [`DummyBackend`](crate::backend::DummyBackend).
    #[cfg(feature = "dummy")]
    pub fn dummy(params: DeviceParameters) -> Arc<Self> {
        let backend = Arc::new(crate::backend::DummyBackend::new(params.fence_mode));
        Self::new(backend, &params)
    }

    /// The backend this device drives.
    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    fn allocate_id(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Maximum texture dimension.
    pub fn max_texture_size(&self) -> u32 {
        self.capabilities.max_texture_size
    }

    /// Required alignment of uniform buffer offsets.
    pub fn uniform_offset_alignment(&self) -> u32 {
        self.capabilities.uniform_offset_alignment
    }

    /// Round `offset` up to the uniform offset alignment.
    pub fn align_uniform_offset(&self, offset: u64) -> u64 {
        let alignment = u64::from(self.capabilities.uniform_offset_alignment);
        offset.div_ceil(alignment) * alignment
    }

    /// Backend extensions reported as enabled.
    pub fn enabled_extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Adapter description.
    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// One-line description of vendor, renderer, backend and version.
    pub fn implementation_information(&self) -> String {
        self.adapter.implementation_information()
    }

    pub fn vendor(&self) -> &str {
        &self.adapter.vendor
    }

    pub fn renderer(&self) -> &str {
        &self.adapter.renderer
    }

    pub fn version(&self) -> &str {
        &self.adapter.version
    }

    pub fn backend_name(&self) -> &str {
        &self.adapter.backend_name
    }

    /// Returns true if debug messages are collected.
    pub fn is_debugging_enabled(&self) -> bool {
        self.debugging_enabled
    }

    /// Record a debug message. Only the most recent messages are kept.
    pub fn push_debug_message(&self, message: impl Into<String>) {
        if !self.debugging_enabled || self.debug_capacity == 0 {
            return;
        }
        let message = message.into();
        log::debug!("GpuDevice: {}", message);
        let mut messages = self.debug_messages.lock();
        while messages.len() >= self.debug_capacity {
            messages.pop_front();
        }
        messages.push_back(message);
    }

    /// Take the debug messages collected since the last call, oldest first.
    pub fn last_debug_messages(&self) -> Vec<String> {
        self.debug_messages.lock().drain(..).collect()
    }

    /// Create a zero-filled GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if the size is zero or
    /// exceeds device limits.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> GraphicsResult<GpuBuffer> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidArgument(
                "buffer size cannot be zero".to_string(),
            ));
        }
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidArgument(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        let id = self.allocate_id();
        self.backend.create_buffer(id, descriptor)?;
        let buffer = GpuBuffer::new(Arc::downgrade(self), id, descriptor);

        // Track it
        let mut buffers = self.buffers.write();
        buffers.retain(|weak| weak.strong_count() > 0);
        buffers.push(Arc::downgrade(buffer.shared()));

        log::trace!(
            "GpuDevice: created buffer {}, type={:?}, usage={:?}, size={}",
            descriptor.display_label(),
            descriptor.buffer_type,
            descriptor.usage,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a buffer holding `data`.
    ///
    /// `descriptor.size` must equal `data.len()`.
    pub fn create_buffer_with_data(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> GraphicsResult<GpuBuffer> {
        if descriptor.size != data.len() as u64 {
            return Err(GraphicsError::InvalidArgument(format!(
                "buffer {} declares {} bytes but {} were given",
                descriptor.display_label(),
                descriptor.size,
                data.len()
            )));
        }
        let buffer = self.create_buffer(descriptor)?;
        self.backend.write_buffer(buffer.id(), 0, data)?;
        Ok(buffer)
    }

    /// Create a GPU texture.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if a dimension is zero or
    /// exceeds device limits, or the mip count is outside
    /// `1..=floor(log2(max(width, height))) + 1`.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> GraphicsResult<GpuTexture> {
        let max_dim = self.capabilities.max_texture_size;
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(GraphicsError::InvalidArgument(
                "texture dimensions cannot be zero".to_string(),
            ));
        }
        if descriptor.width > max_dim || descriptor.height > max_dim {
            return Err(GraphicsError::InvalidArgument(format!(
                "texture {}x{} exceeds maximum {max_dim}",
                descriptor.width, descriptor.height
            )));
        }
        let max_mips = TextureDescriptor::max_mip_levels(descriptor.width, descriptor.height);
        if descriptor.mip_levels == 0 || descriptor.mip_levels > max_mips {
            return Err(GraphicsError::InvalidArgument(format!(
                "texture {} requests {} mip levels, allowed 1..={max_mips}",
                descriptor.display_label(),
                descriptor.mip_levels
            )));
        }

        let id = self.allocate_id();
        self.backend.create_texture(id, descriptor)?;
        let texture = GpuTexture::new(Arc::downgrade(self), id, descriptor);

        let mut textures = self.textures.write();
        textures.retain(|weak| weak.strong_count() > 0);
        textures.push(Arc::downgrade(texture.shared()));

        log::trace!(
            "GpuDevice: created texture {}, format={:?}, size={}x{}, mips={}",
            descriptor.display_label(),
            descriptor.format,
            descriptor.width,
            descriptor.height,
            descriptor.mip_levels
        );

        Ok(texture)
    }

    /// View of every mip level of `texture`.
    pub fn create_texture_view(&self, texture: &GpuTexture) -> GraphicsResult<GpuTextureView> {
        texture.create_view()
    }

    /// View of `mip_levels` levels of `texture` starting at `base_mip`.
    pub fn create_texture_view_range(
        &self,
        texture: &GpuTexture,
        base_mip: u32,
        mip_levels: u32,
    ) -> GraphicsResult<GpuTextureView> {
        texture.create_mip_view(base_mip, mip_levels)
    }

    /// Create a command encoder.
    pub fn create_command_encoder(self: &Arc<Self>) -> CommandEncoder {
        CommandEncoder::new(Arc::clone(self))
    }

    /// Compile `pipeline` from its inline sources, or return the cached result
    /// for its location.
    pub fn precompile_pipeline(&self, pipeline: &RenderPipeline) -> Arc<CompiledRenderPipeline> {
        let mut cache = self.pipelines.lock();
        if let Some(compiled) = cache.get(&pipeline.location) {
            return Arc::clone(compiled);
        }
        let compiled = Arc::new(CompiledRenderPipeline::compile(
            self.backend.as_ref(),
            pipeline.clone(),
            None,
        ));
        self.note_compilation(&compiled);
        cache.insert(pipeline.location.clone(), Arc::clone(&compiled));
        compiled
    }

    /// Compile `pipeline` with sources supplied by `sources`, replacing any
    /// cached result for its location.
    pub fn precompile_pipeline_with_source(
        &self,
        pipeline: &RenderPipeline,
        sources: ShaderSourceFn<'_>,
    ) -> Arc<CompiledRenderPipeline> {
        let compiled = Arc::new(CompiledRenderPipeline::compile(
            self.backend.as_ref(),
            pipeline.clone(),
            Some(sources),
        ));
        self.note_compilation(&compiled);
        self.pipelines
            .lock()
            .insert(pipeline.location.clone(), Arc::clone(&compiled));
        compiled
    }

    fn note_compilation(&self, compiled: &CompiledRenderPipeline) {
        if let Some(error) = compiled.error() {
            self.push_debug_message(format!(
                "pipeline {} failed to compile: {error}",
                compiled.location()
            ));
        }
    }

    /// Drop every cached compiled pipeline.
    pub fn clear_pipeline_cache(&self) {
        let mut cache = self.pipelines.lock();
        log::debug!("GpuDevice: clearing {} cached pipelines", cache.len());
        cache.clear();
        self.backend.clear_program_cache();
    }

    /// Number of cached compiled pipelines.
    pub fn cached_pipeline_count(&self) -> usize {
        self.pipelines.lock().len()
    }

    /// Get the number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|buffer| !buffer.is_released())
            .count()
    }

    /// Get the number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|texture| !texture.is_released())
            .count()
    }

    /// Mark attachments as used by an open render pass.
    ///
    /// Fails with [`GraphicsError::AttachmentInUse`] without registering
    /// anything if one of them is already in use.
    pub(crate) fn acquire_attachments(
        &self,
        attachments: &[(ResourceId, &str)],
    ) -> GraphicsResult<()> {
        let mut open = self.open_attachments.lock();
        if let Some((_, label)) = attachments.iter().find(|(id, _)| open.contains(id)) {
            return Err(GraphicsError::AttachmentInUse(label.to_string()));
        }
        open.extend(attachments.iter().map(|(id, _)| *id));
        Ok(())
    }

    pub(crate) fn release_attachments(&self, attachments: &[ResourceId]) {
        let mut open = self.open_attachments.lock();
        for id in attachments {
            open.remove(id);
        }
    }
}

impl std::fmt::Debug for GpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDevice")
            .field("backend", &self.adapter.backend_name)
            .field("capabilities", &self.capabilities)
            .field("buffers", &self.buffer_count())
            .field("textures", &self.texture_count())
            .finish()
    }
}

// Ensure GpuDevice is Send + Sync
static_assertions::assert_impl_all!(GpuDevice: Send, Sync);
