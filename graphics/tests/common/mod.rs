//! Common utilities for integration tests.
//!
//! Every test runs against the dummy backend, which keeps resource contents in
//! CPU memory so results can be read back and compared.

use std::sync::Arc;

use amber_graphics::{
    BufferDescriptor, BufferType, BufferUsage, DeviceManager, DeviceParameters, DummyBackend,
    FenceMode, GpuBuffer, GpuDevice, GpuTexture, TextureDescriptor, TextureFormat,
};

/// Install the test logger once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test context providing a device on an inspectable dummy backend.
pub struct TestContext {
    /// The backend behind the device.
    pub backend: Arc<DummyBackend>,
    /// Graphics device for creating resources.
    pub device: Arc<GpuDevice>,
    /// Manager holding `device`.
    #[allow(dead_code)]
    pub manager: DeviceManager,
}

impl TestContext {
    /// Create a context whose fences behave according to `fence_mode`.
    pub fn new(fence_mode: FenceMode) -> Self {
        init_logging();
        let params = DeviceParameters::new().with_fence_mode(fence_mode);
        let backend = Arc::new(DummyBackend::new(fence_mode));
        let device = GpuDevice::new(backend.clone(), &params);
        let manager = DeviceManager::with_device(Arc::clone(&device));
        Self {
            backend,
            device,
            manager,
        }
    }

    /// Create a buffer of the given type, usage and size.
    pub fn create_buffer(
        &self,
        buffer_type: BufferType,
        usage: BufferUsage,
        size: u64,
    ) -> GpuBuffer {
        self.device
            .create_buffer(&BufferDescriptor::new(buffer_type, usage, size))
            .expect("Failed to create buffer")
    }

    /// Create a buffer the CPU can read back.
    pub fn create_readback_buffer(&self, size: u64) -> GpuBuffer {
        self.create_buffer(BufferType::PixelPack, BufferUsage::StaticRead, size)
    }

    /// Create a single-level texture.
    pub fn create_texture(
        &self,
        label: &str,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> GpuTexture {
        self.device
            .create_texture(&TextureDescriptor::new(format, width, height).with_label(label))
            .expect("Failed to create texture")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new(FenceMode::Immediate)
    }
}

/// Generate a recognizable byte pattern.
#[allow(dead_code)]
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}
