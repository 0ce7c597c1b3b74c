//! Texture types and descriptors.

/// Pixel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA.
    #[default]
    Rgba8,
    /// 8-bit single red channel.
    Red8,
    /// 32-bit float depth.
    Depth32,
}

impl TextureFormat {
    /// Size of one pixel in bytes.
    pub fn pixel_size(&self) -> u32 {
        match self {
            Self::Rgba8 | Self::Depth32 => 4,
            Self::Red8 => 1,
        }
    }

    /// Returns true if the format can be used as a color attachment.
    pub fn has_color_aspect(&self) -> bool {
        matches!(self, Self::Rgba8 | Self::Red8)
    }

    /// Returns true if the format can be used as a depth attachment.
    pub fn has_depth_aspect(&self) -> bool {
        matches!(self, Self::Depth32)
    }
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Coordinates wrap around.
    #[default]
    Repeat,
    /// Coordinates are clamped to the edge texel.
    ClampToEdge,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Linear interpolation between texels.
    Linear,
}

/// Sampling parameters attached to a texture.
///
/// Changes are picked up the next time the texture is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    /// Address mode for U.
    pub address_mode_u: AddressMode,
    /// Address mode for V.
    pub address_mode_v: AddressMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Whether mip levels are sampled.
    pub use_mipmaps: bool,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Linear,
            use_mipmaps: true,
        }
    }
}

/// Descriptor for creating a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Pixel format.
    pub format: TextureFormat,
    /// Width of mip level 0.
    pub width: u32,
    /// Height of mip level 0.
    pub height: u32,
    /// Number of mip levels.
    pub mip_levels: u32,
}

impl TextureDescriptor {
    /// Create a new single-mip texture descriptor.
    pub fn new(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            label: None,
            format,
            width,
            height,
            mip_levels: 1,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_levels = count;
        self
    }

    /// Largest mip count a `width` x `height` texture can have before a level
    /// would shrink below 1x1.
    pub fn max_mip_levels(width: u32, height: u32) -> u32 {
        let largest = width.max(height).max(1);
        u32::BITS - largest.leading_zeros()
    }

    pub(crate) fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed texture>")
    }
}

/// A rectangle inside one mip level of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureRegion {
    /// Mip level the region refers to.
    pub mip_level: u32,
    /// Left edge in texels.
    pub x: u32,
    /// Top edge in texels.
    pub y: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl TextureRegion {
    /// Create a region.
    pub fn new(mip_level: u32, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            mip_level,
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of mip level `mip_level` of a `width` x `height` texture.
    pub fn full(width: u32, height: u32, mip_level: u32) -> Self {
        let shrink = |size: u32| size.checked_shr(mip_level).unwrap_or(0).max(1);
        Self::new(mip_level, 0, 0, shrink(width), shrink(height))
    }

    /// Number of texels covered.
    pub fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns true if the region fits inside a `width` x `height` level.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}
