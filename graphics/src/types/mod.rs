//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage classifications, fixed-function
//! state and descriptor structs used throughout the graphics system.

mod buffer;
mod shader;
mod state;
mod texture;

pub use buffer::{BufferDescriptor, BufferType, BufferUsage};
pub use shader::{ShaderType, UniformType};
pub use state::{
    BlendFunction, ColorWriteMask, DepthTestFunction, DestFactor, ScissorRect, SourceFactor,
};
pub use texture::{
    AddressMode, FilterMode, SamplerState, TextureDescriptor, TextureFormat, TextureRegion,
};
