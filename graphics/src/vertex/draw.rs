//! Primitive assembly modes and index widths.

use crate::error::{GraphicsError, GraphicsResult};

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Line list of two vertices per segment.
    ///
    /// Wide lines are expanded to quads, so index generation treats every
    /// four vertices as one quad.
    Lines,
    /// Connected line strip.
    LineStrip,
    /// One-pixel line list.
    DebugLines,
    /// One-pixel connected line strip.
    DebugLineStrip,
    /// Triangle list.
    Triangles,
    /// Triangle strip.
    TriangleStrip,
    /// Triangle fan.
    TriangleFan,
    /// Quad list, expanded to two triangles per quad.
    Quads,
}

impl DrawMode {
    /// Vertices making up the first primitive.
    pub fn first_vertex_count(&self) -> u32 {
        match self {
            Self::Quads => 4,
            Self::Lines | Self::LineStrip | Self::DebugLines | Self::DebugLineStrip => 2,
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan => 3,
        }
    }

    /// Vertices each further primitive adds.
    pub fn additional_vertex_count(&self) -> u32 {
        match self {
            Self::Quads => 4,
            Self::Lines | Self::DebugLines => 2,
            Self::Triangles => 3,
            Self::LineStrip | Self::DebugLineStrip | Self::TriangleStrip | Self::TriangleFan => 1,
        }
    }

    /// Returns true if consecutive primitives share vertices.
    pub fn share_vertices(&self) -> bool {
        matches!(
            self,
            Self::LineStrip | Self::DebugLineStrip | Self::TriangleStrip | Self::TriangleFan
        )
    }

    /// Number of indices needed to draw `vertex_count` vertices.
    ///
    /// `Lines` and `Quads` expand every four vertices into six indices (two
    /// triangles); every other mode uses one index per vertex.
    pub fn index_count(&self, vertex_count: u32) -> u32 {
        match self {
            Self::Lines | Self::Quads => vertex_count / 4 * 6,
            _ => vertex_count,
        }
    }

    /// Build the index buffer contents for `vertex_count` vertices.
    ///
    /// Quad-based modes emit `0 1 2 2 3 0` per quad; the rest emit a
    /// sequential run. Fails with [`GraphicsError::OutOfRange`] if the largest
    /// index does not fit `index_type`.
    pub fn generate_indices(
        &self,
        vertex_count: u32,
        index_type: IndexType,
    ) -> GraphicsResult<Vec<u8>> {
        let max_index = vertex_count.saturating_sub(1);
        if index_type == IndexType::Short && max_index > u32::from(u16::MAX) {
            return Err(GraphicsError::OutOfRange(format!(
                "{vertex_count} vertices cannot be addressed with 16-bit indices"
            )));
        }

        let indices: Vec<u32> = match self {
            Self::Lines | Self::Quads => (0..vertex_count / 4)
                .flat_map(|quad| {
                    let base = quad * 4;
                    [base, base + 1, base + 2, base + 2, base + 3, base]
                })
                .collect(),
            _ => (0..vertex_count).collect(),
        };

        Ok(match index_type {
            IndexType::Short => {
                let narrow: Vec<u16> = indices.iter().map(|&index| index as u16).collect();
                bytemuck::cast_slice(&narrow).to_vec()
            }
            IndexType::Int => bytemuck::cast_slice(&indices).to_vec(),
        })
    }
}

/// Width of index buffer entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices.
    Short,
    /// 32-bit indices.
    Int,
}

impl IndexType {
    /// Size of one index in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Short => 2,
            Self::Int => 4,
        }
    }

    /// Narrowest index type able to address `max_index`.
    pub fn smallest_for(max_index: u32) -> Self {
        if max_index & 0xFFFF_0000 != 0 {
            Self::Int
        } else {
            Self::Short
        }
    }
}
