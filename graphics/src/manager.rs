//! Process-level access to the active device.
//!
//! [`DeviceManager`] is the context object code passes around instead of a
//! global: it is empty until the host installs a device, and every consumer
//! that needs a device asks it for one.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::device::GpuDevice;
use crate::error::{GraphicsError, GraphicsResult};

/// Holder of the active [`GpuDevice`].
///
/// # Example
///
/// ```ignore
/// let manager = DeviceManager::new();
/// assert!(manager.required_device().is_err());
///
/// manager.set_device(GpuDevice::dummy(DeviceParameters::default()));
/// let device = manager.required_device()?;
/// ```
#[derive(Debug, Default)]
pub struct DeviceManager {
    device: RwLock<Option<Arc<GpuDevice>>>,
}

impl DeviceManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager holding `device`.
    pub fn with_device(device: Arc<GpuDevice>) -> Self {
        Self {
            device: RwLock::new(Some(device)),
        }
    }

    /// Install `device`, returning the previously installed one.
    pub fn set_device(&self, device: Arc<GpuDevice>) -> Option<Arc<GpuDevice>> {
        log::info!("DeviceManager: using {}", device.implementation_information());
        self.device.write().replace(device)
    }

    /// The active device, if any.
    pub fn device(&self) -> Option<Arc<GpuDevice>> {
        self.device.read().clone()
    }

    /// The active device.
    ///
    /// Fails with [`GraphicsError::NotInitialized`] before [`set_device`](Self::set_device).
    pub fn required_device(&self) -> GraphicsResult<Arc<GpuDevice>> {
        self.device().ok_or_else(|| {
            GraphicsError::NotInitialized("no device set on the device manager".to_string())
        })
    }

    /// Returns true once a device is installed.
    pub fn is_initialized(&self) -> bool {
        self.device.read().is_some()
    }

    /// Remove the active device, returning it.
    pub fn clear_device(&self) -> Option<Arc<GpuDevice>> {
        self.device.write().take()
    }
}

static_assertions::assert_impl_all!(DeviceManager: Send, Sync);
