//! Vertex formats and primitive assembly.
//!
//! - [`VertexFormat`] - Ordered, named vertex elements with computed offsets
//! - [`DrawMode`] - How vertices form primitives, and how many indices they need
//! - [`IndexType`] - 16- or 32-bit indices

mod draw;
mod format;

pub use draw::{DrawMode, IndexType};
pub use format::{
    VertexElementType, VertexElementUsage, VertexFormat, VertexFormatBuilder,
    VertexFormatElement,
};
