//! GPU texture resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{ResourceId, SampledTexture};
use crate::device::GpuDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::{
    AddressMode, FilterMode, SamplerState, TextureDescriptor, TextureFormat, TextureRegion,
};

#[derive(Debug)]
pub(crate) struct TextureShared {
    id: ResourceId,
    label: String,
    format: TextureFormat,
    width: u32,
    height: u32,
    mip_levels: u32,
    sampler: Mutex<SamplerState>,
    released: AtomicBool,
    device: Weak<GpuDevice>,
}

impl TextureShared {
    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(device) = self.device.upgrade() {
            device.backend().destroy_texture(self.id);
        }
        log::trace!("GpuTexture: released {} ({})", self.label, self.id);
        true
    }
}

fn mip_size(size: u32, mip_level: u32) -> u32 {
    size.checked_shr(mip_level).unwrap_or(0).max(1)
}

/// A 2D GPU texture with a chain of mip levels.
///
/// Textures are created by [`GpuDevice::create_texture`]. Sampling parameters
/// live on the texture and can be changed at any time; the new values take
/// effect the next time the texture is bound.
///
/// # Example
///
/// ```ignore
/// let desc = TextureDescriptor::new(TextureFormat::Rgba8, 256, 256)
///     .with_label("atlas")
///     .with_mip_levels(4);
/// let texture = device.create_texture(&desc)?;
/// assert_eq!(texture.width(2), 64);
/// ```
pub struct GpuTexture {
    shared: Arc<TextureShared>,
}

impl GpuTexture {
    /// Create a new texture handle (called by GpuDevice).
    pub(crate) fn new(
        device: Weak<GpuDevice>,
        id: ResourceId,
        descriptor: &TextureDescriptor,
    ) -> Self {
        Self {
            shared: Arc::new(TextureShared {
                id,
                label: descriptor.display_label().to_string(),
                format: descriptor.format,
                width: descriptor.width,
                height: descriptor.height,
                mip_levels: descriptor.mip_levels,
                sampler: Mutex::new(SamplerState::default()),
                released: AtomicBool::new(false),
                device,
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<TextureShared> {
        &self.shared
    }

    /// Backend identifier.
    pub fn id(&self) -> ResourceId {
        self.shared.id
    }

    /// Get the texture label.
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Pixel format.
    pub fn format(&self) -> TextureFormat {
        self.shared.format
    }

    /// Width of a mip level.
    pub fn width(&self, mip_level: u32) -> u32 {
        mip_size(self.shared.width, mip_level)
    }

    /// Height of a mip level.
    pub fn height(&self, mip_level: u32) -> u32 {
        mip_size(self.shared.height, mip_level)
    }

    /// Number of mip levels.
    pub fn mip_levels(&self) -> u32 {
        self.shared.mip_levels
    }

    /// Region covering all of `mip_level`.
    pub fn region(&self, mip_level: u32) -> TextureRegion {
        TextureRegion::full(self.shared.width, self.shared.height, mip_level)
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<GpuDevice>> {
        self.shared.device.upgrade()
    }

    /// Current sampling parameters.
    pub fn sampler_state(&self) -> SamplerState {
        *self.shared.sampler.lock()
    }

    /// Set the same wrapping mode for both axes.
    pub fn set_address_mode(&self, mode: AddressMode) {
        self.set_address_mode_uv(mode, mode);
    }

    /// Set the wrapping mode per axis.
    pub fn set_address_mode_uv(&self, u: AddressMode, v: AddressMode) {
        let mut sampler = self.shared.sampler.lock();
        sampler.address_mode_u = u;
        sampler.address_mode_v = v;
    }

    /// Use `filter` for both minification and magnification.
    pub fn set_texture_filter(&self, filter: FilterMode, use_mipmaps: bool) {
        self.set_texture_filter_min_mag(filter, filter, use_mipmaps);
    }

    /// Set the filters and whether mip levels are sampled.
    pub fn set_texture_filter_min_mag(&self, min: FilterMode, mag: FilterMode, use_mipmaps: bool) {
        let mut sampler = self.shared.sampler.lock();
        sampler.min_filter = min;
        sampler.mag_filter = mag;
        sampler.use_mipmaps = use_mipmaps;
    }

    /// Returns true once the texture has been released.
    pub fn is_closed(&self) -> bool {
        self.shared.is_released()
    }

    pub(crate) fn ensure_live(&self) -> GraphicsResult<()> {
        if self.is_closed() {
            return Err(GraphicsError::ResourceReleased(format!(
                "texture {}",
                self.shared.label
            )));
        }
        Ok(())
    }

    /// Release the texture. Views of it become invalid.
    pub fn close(&mut self) -> GraphicsResult<()> {
        if !self.shared.release() {
            return Err(GraphicsError::ResourceReleased(format!(
                "texture {} closed twice",
                self.shared.label
            )));
        }
        Ok(())
    }

    /// View of every mip level.
    pub fn create_view(&self) -> GraphicsResult<GpuTextureView> {
        self.create_mip_view(0, self.shared.mip_levels)
    }

    /// View of `mip_levels` levels starting at `base_mip`.
    ///
    /// Fails with [`GraphicsError::OutOfRange`] unless `mip_levels >= 1` and
    /// `base_mip + mip_levels` does not exceed the texture's mip count.
    pub fn create_mip_view(
        &self,
        base_mip: u32,
        mip_levels: u32,
    ) -> GraphicsResult<GpuTextureView> {
        self.ensure_live()?;
        let in_range = mip_levels >= 1
            && base_mip
                .checked_add(mip_levels)
                .is_some_and(|end| end <= self.shared.mip_levels);
        if !in_range {
            return Err(GraphicsError::OutOfRange(format!(
                "mip view {base_mip}..+{mip_levels} of texture {} with {} levels",
                self.shared.label, self.shared.mip_levels
            )));
        }
        Ok(GpuTextureView {
            label: format!("{} view", self.shared.label),
            target: ViewTarget {
                texture: Arc::downgrade(&self.shared),
                base_mip,
                mip_levels,
            },
            closed: false,
        })
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTexture")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .field("format", &self.shared.format)
            .field("width", &self.shared.width)
            .field("height", &self.shared.height)
            .field("mip_levels", &self.shared.mip_levels)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The part of a view that bindings hold on to.
#[derive(Debug, Clone)]
pub(crate) struct ViewTarget {
    texture: Weak<TextureShared>,
    base_mip: u32,
    mip_levels: u32,
}

/// Resolved attachment or sampler target.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedView {
    pub(crate) id: ResourceId,
    pub(crate) label: String,
    pub(crate) format: TextureFormat,
    pub(crate) base_mip: u32,
    pub(crate) mip_levels: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) sampler: SamplerState,
}

impl ResolvedView {
    pub(crate) fn sampled(&self) -> SampledTexture {
        SampledTexture {
            texture: self.id,
            base_mip: self.base_mip,
            mip_levels: self.mip_levels,
            sampler: self.sampler,
        }
    }
}

impl ViewTarget {
    fn texture(&self) -> Option<Arc<TextureShared>> {
        self.texture
            .upgrade()
            .filter(|texture| !texture.is_released())
    }

    pub(crate) fn resolve(&self) -> GraphicsResult<ResolvedView> {
        let texture = self.texture().ok_or_else(|| {
            GraphicsError::ResourceReleased("view of a released texture".to_string())
        })?;
        let sampler = *texture.sampler.lock();
        Ok(ResolvedView {
            id: texture.id,
            label: texture.label.clone(),
            format: texture.format,
            base_mip: self.base_mip,
            mip_levels: self.mip_levels,
            width: mip_size(texture.width, self.base_mip),
            height: mip_size(texture.height, self.base_mip),
            sampler,
        })
    }
}

/// A view of a contiguous range of a texture's mip levels.
///
/// Views are used as render pass attachments and sampler bindings. Closing a
/// view does not affect the texture; releasing the texture invalidates the
/// view.
#[derive(Debug)]
pub struct GpuTextureView {
    label: String,
    target: ViewTarget,
    closed: bool,
}

impl GpuTextureView {
    /// First mip level of the view.
    pub fn base_mip_level(&self) -> u32 {
        self.target.base_mip
    }

    /// Number of mip levels in the view.
    pub fn mip_levels(&self) -> u32 {
        self.target.mip_levels
    }

    /// Identifier of the viewed texture, if it is still alive.
    pub fn texture_id(&self) -> Option<ResourceId> {
        self.target.texture().map(|texture| texture.id)
    }

    /// Debug label, derived from the texture's.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label of the viewed texture, if it is still alive.
    pub fn texture_label(&self) -> Option<String> {
        self.target.texture().map(|texture| texture.label.clone())
    }

    /// Width of mip level `mip_level` of the view, or 0 if the texture is gone.
    pub fn width(&self, mip_level: u32) -> u32 {
        self.target.texture().map_or(0, |texture| {
            mip_size(texture.width, self.target.base_mip.saturating_add(mip_level))
        })
    }

    /// Height of mip level `mip_level` of the view, or 0 if the texture is gone.
    pub fn height(&self, mip_level: u32) -> u32 {
        self.target.texture().map_or(0, |texture| {
            mip_size(texture.height, self.target.base_mip.saturating_add(mip_level))
        })
    }

    /// Returns true while the view is open and the texture alive.
    pub fn is_valid(&self) -> bool {
        !self.closed && self.target.texture().is_some()
    }

    /// Returns true once the view has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the view.
    pub fn close(&mut self) -> GraphicsResult<()> {
        if self.closed {
            return Err(GraphicsError::ResourceReleased(
                "texture view closed twice".to_string(),
            ));
        }
        self.closed = true;
        Ok(())
    }

    pub(crate) fn target(&self) -> GraphicsResult<&ViewTarget> {
        if self.closed {
            return Err(GraphicsError::ResourceReleased(
                "texture view is closed".to_string(),
            ));
        }
        Ok(&self.target)
    }
}

static_assertions::assert_impl_all!(GpuTexture: Send, Sync);
static_assertions::assert_impl_all!(GpuTextureView: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_texture(width: u32, height: u32, mips: u32) -> GpuTexture {
        let desc = TextureDescriptor::new(TextureFormat::Rgba8, width, height)
            .with_label("test")
            .with_mip_levels(mips);
        GpuTexture::new(Weak::new(), ResourceId(1), &desc)
    }

    #[test]
    fn test_mip_sizes_shrink() {
        let texture = detached_texture(300, 16, 9);
        let widths: Vec<u32> = (0..9).map(|mip| texture.width(mip)).collect();
        assert_eq!(widths, vec![300, 150, 75, 37, 18, 9, 4, 2, 1]);
        assert_eq!(texture.height(4), 1);
        assert_eq!(texture.height(8), 1);
        assert!(widths.windows(2).all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn test_sampler_state_setters() {
        let texture = detached_texture(4, 4, 1);
        assert_eq!(texture.sampler_state(), SamplerState::default());

        texture.set_address_mode_uv(AddressMode::ClampToEdge, AddressMode::Repeat);
        texture.set_texture_filter_min_mag(FilterMode::Linear, FilterMode::Nearest, false);

        let state = texture.sampler_state();
        assert_eq!(state.address_mode_u, AddressMode::ClampToEdge);
        assert_eq!(state.address_mode_v, AddressMode::Repeat);
        assert_eq!(state.min_filter, FilterMode::Linear);
        assert!(!state.use_mipmaps);

        texture.set_address_mode(AddressMode::ClampToEdge);
        texture.set_texture_filter(FilterMode::Nearest, true);
        let state = texture.sampler_state();
        assert_eq!(state.address_mode_v, AddressMode::ClampToEdge);
        assert_eq!(state.mag_filter, FilterMode::Nearest);
    }

    #[test]
    fn test_mip_view_range() {
        let texture = detached_texture(64, 64, 4);
        let view = texture.create_mip_view(1, 3).unwrap();
        assert_eq!(view.width(0), 32);
        assert_eq!(view.width(2), 8);

        assert!(matches!(
            texture.create_mip_view(2, 3),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            texture.create_mip_view(0, 0),
            Err(GraphicsError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_view_invalid_after_texture_close() {
        let mut texture = detached_texture(8, 8, 1);
        let mut view = texture.create_view().unwrap();
        assert!(view.is_valid());

        view.close().unwrap();
        assert!(!view.is_valid());
        assert!(!texture.is_closed());

        let other = texture.create_view().unwrap();
        texture.close().unwrap();
        assert!(!other.is_valid());
        assert!(other.target().unwrap().resolve().is_err());
        assert!(texture.create_view().is_err());
    }
}
