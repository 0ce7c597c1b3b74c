//! Fixed-function pipeline state: blending, depth testing, write masks.

use bitflags::bitflags;

/// Source blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFactor {
    ConstantAlpha,
    ConstantColor,
    DstAlpha,
    DstColor,
    One,
    OneMinusConstantAlpha,
    OneMinusConstantColor,
    OneMinusDstAlpha,
    OneMinusDstColor,
    OneMinusSrcAlpha,
    OneMinusSrcColor,
    SrcAlpha,
    SrcAlphaSaturate,
    SrcColor,
    Zero,
}

/// Destination blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestFactor {
    ConstantAlpha,
    ConstantColor,
    DstAlpha,
    DstColor,
    One,
    OneMinusConstantAlpha,
    OneMinusConstantColor,
    OneMinusDstAlpha,
    OneMinusDstColor,
    OneMinusSrcAlpha,
    OneMinusSrcColor,
    SrcAlpha,
    SrcColor,
    Zero,
}

/// Separate color/alpha blend equation factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunction {
    pub source_color: SourceFactor,
    pub dest_color: DestFactor,
    pub source_alpha: SourceFactor,
    pub dest_alpha: DestFactor,
}

impl BlendFunction {
    pub const LIGHTNING: Self = Self::uniform(SourceFactor::SrcAlpha, DestFactor::One);
    pub const GLINT: Self = Self::new(
        SourceFactor::SrcColor,
        DestFactor::One,
        SourceFactor::Zero,
        DestFactor::One,
    );
    pub const OVERLAY: Self = Self::new(
        SourceFactor::SrcAlpha,
        DestFactor::One,
        SourceFactor::One,
        DestFactor::Zero,
    );
    pub const TRANSLUCENT: Self = Self::new(
        SourceFactor::SrcAlpha,
        DestFactor::OneMinusSrcAlpha,
        SourceFactor::One,
        DestFactor::OneMinusSrcAlpha,
    );
    pub const ADDITIVE: Self = Self::uniform(SourceFactor::One, DestFactor::One);
    pub const PANORAMA: Self = Self::new(
        SourceFactor::SrcAlpha,
        DestFactor::OneMinusSrcAlpha,
        SourceFactor::One,
        DestFactor::Zero,
    );
    pub const ENTITY_OUTLINE_BLIT: Self = Self::new(
        SourceFactor::SrcAlpha,
        DestFactor::OneMinusSrcAlpha,
        SourceFactor::Zero,
        DestFactor::One,
    );

    /// Create a blend function with separate color and alpha factors.
    pub const fn new(
        source_color: SourceFactor,
        dest_color: DestFactor,
        source_alpha: SourceFactor,
        dest_alpha: DestFactor,
    ) -> Self {
        Self {
            source_color,
            dest_color,
            source_alpha,
            dest_alpha,
        }
    }

    /// Create a blend function that uses the same factors for color and alpha.
    pub const fn uniform(source: SourceFactor, dest: DestFactor) -> Self {
        Self::new(source, dest, source, dest)
    }
}

/// Depth comparison applied before a fragment is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthTestFunction {
    /// Depth testing disabled.
    NoDepthTest,
    Equal,
    #[default]
    LessEqual,
    Less,
    Greater,
}

impl DepthTestFunction {
    /// Returns true if a depth attachment is needed for this test.
    pub fn wants_depth_texture(&self) -> bool {
        *self != Self::NoDepthTest
    }
}

bitflags! {
    /// Color channels a pipeline writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const COLOR = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Rectangle that limits rasterization inside a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    /// Create a scissor rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_blend() {
        let blend = BlendFunction::ADDITIVE;
        assert_eq!(blend.source_color, blend.source_alpha);
        assert_eq!(blend.dest_color, DestFactor::One);
    }

    #[test]
    fn test_depth_test_wants_texture() {
        assert!(!DepthTestFunction::NoDepthTest.wants_depth_texture());
        assert!(DepthTestFunction::LessEqual.wants_depth_texture());
    }

    #[test]
    fn test_color_write_mask() {
        assert_eq!(ColorWriteMask::default(), ColorWriteMask::all());
        assert!(!ColorWriteMask::COLOR.contains(ColorWriteMask::ALPHA));
    }
}
