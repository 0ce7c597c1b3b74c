//! Vertex format definitions.
//!
//! A [`VertexFormat`] is an ordered list of named [`VertexFormatElement`]s
//! packed back to back, optionally with padding. Formats are compared
//! structurally, so two formats built from the same elements in the same order
//! are interchangeable.
//!
//! # Example
//!
//! ```ignore
//! let format = VertexFormat::builder()
//!     .add("Position", VertexFormatElement::POSITION)
//!     .add("Color", VertexFormatElement::COLOR)
//!     .add("Normal", VertexFormatElement::NORMAL)
//!     .padding(1)
//!     .build()?;
//! assert_eq!(format.vertex_size(), 20);
//! ```

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::GpuDevice;
use crate::error::{GraphicsError, GraphicsResult};
use crate::manager::DeviceManager;
use crate::resources::{GpuBuffer, GpuBufferSlice};
use crate::types::{BufferDescriptor, BufferType, BufferUsage};

/// Component type of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    Float,
    UByte,
    Byte,
    UShort,
    Short,
    UInt,
    Int,
}

impl VertexElementType {
    /// Size of one component in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::UByte | Self::Byte => 1,
            Self::UShort | Self::Short => 2,
            Self::Float | Self::UInt | Self::Int => 4,
        }
    }
}

/// What a vertex element is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementUsage {
    Position,
    Normal,
    Color,
    Uv,
    Generic,
}

/// One attribute of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormatElement {
    /// Unique id in `0..MAX_ELEMENTS`, used as a bit in element masks.
    pub id: u8,
    /// Index among elements of the same usage (UV0, UV1, ...).
    pub index: u8,
    pub ty: VertexElementType,
    pub usage: VertexElementUsage,
    /// Number of components.
    pub count: u8,
}

impl VertexFormatElement {
    /// Number of distinct element ids.
    pub const MAX_ELEMENTS: usize = 32;

    pub const POSITION: Self = Self::new(
        0,
        0,
        VertexElementType::Float,
        VertexElementUsage::Position,
        3,
    );
    pub const COLOR: Self = Self::new(
        1,
        0,
        VertexElementType::UByte,
        VertexElementUsage::Color,
        4,
    );
    pub const UV0: Self = Self::new(
        2,
        0,
        VertexElementType::Float,
        VertexElementUsage::Uv,
        2,
    );
    pub const UV1: Self = Self::new(
        3,
        1,
        VertexElementType::Short,
        VertexElementUsage::Uv,
        2,
    );
    pub const UV2: Self = Self::new(
        4,
        2,
        VertexElementType::Short,
        VertexElementUsage::Uv,
        2,
    );
    pub const NORMAL: Self = Self::new(
        5,
        0,
        VertexElementType::Byte,
        VertexElementUsage::Normal,
        3,
    );

    /// Create an element.
    pub const fn new(
        id: u8,
        index: u8,
        ty: VertexElementType,
        usage: VertexElementUsage,
        count: u8,
    ) -> Self {
        Self {
            id,
            index,
            ty,
            usage,
            count,
        }
    }

    /// Mask bit of this element.
    pub fn bit(&self) -> u32 {
        1u32.checked_shl(u32::from(self.id)).unwrap_or(0)
    }

    /// Size of the whole element in bytes.
    pub fn size_in_bytes(&self) -> u32 {
        self.ty.size() * u32::from(self.count)
    }
}

impl std::fmt::Display for VertexFormatElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:?}{} ({:?})",
            self.count, self.usage, self.index, self.ty
        )
    }
}

#[derive(Debug, Default)]
struct ImmediateBuffers {
    vertex: Option<GpuBuffer>,
    index: Option<GpuBuffer>,
}

/// An immutable vertex layout.
pub struct VertexFormat {
    elements: Vec<VertexFormatElement>,
    names: Vec<String>,
    offsets_by_element: [i32; VertexFormatElement::MAX_ELEMENTS],
    vertex_size: u32,
    elements_mask: u32,
    immediate: Mutex<ImmediateBuffers>,
}

impl VertexFormat {
    /// Offset reported for elements the format does not contain.
    pub const UNKNOWN_ELEMENT: i32 = -1;

    /// Start building a format.
    pub fn builder() -> VertexFormatBuilder {
        VertexFormatBuilder::default()
    }

    fn assemble(entries: Vec<(String, VertexFormatElement, u32)>, vertex_size: u32) -> Self {
        let mut offsets_by_element = [Self::UNKNOWN_ELEMENT; VertexFormatElement::MAX_ELEMENTS];
        let mut elements = Vec::with_capacity(entries.len());
        let mut names = Vec::with_capacity(entries.len());
        let mut elements_mask = 0;

        for (name, element, offset) in entries {
            offsets_by_element[usize::from(element.id)] = offset as i32;
            elements_mask |= element.bit();
            elements.push(element);
            names.push(name);
        }

        Self {
            elements,
            names,
            offsets_by_element,
            vertex_size,
            elements_mask,
            immediate: Mutex::new(ImmediateBuffers::default()),
        }
    }

    /// Position only.
    pub fn position() -> Self {
        Self::standard(&[("Position", VertexFormatElement::POSITION)], 0)
    }

    /// Position and packed color.
    pub fn position_color() -> Self {
        Self::standard(
            &[
                ("Position", VertexFormatElement::POSITION),
                ("Color", VertexFormatElement::COLOR),
            ],
            0,
        )
    }

    /// Position and texture coordinates.
    pub fn position_tex() -> Self {
        Self::standard(
            &[
                ("Position", VertexFormatElement::POSITION),
                ("UV0", VertexFormatElement::UV0),
            ],
            0,
        )
    }

    /// Position, texture coordinates and packed color.
    pub fn position_tex_color() -> Self {
        Self::standard(
            &[
                ("Position", VertexFormatElement::POSITION),
                ("UV0", VertexFormatElement::UV0),
                ("Color", VertexFormatElement::COLOR),
            ],
            0,
        )
    }

    /// Position, packed color and normal, padded to 20 bytes.
    pub fn position_color_normal() -> Self {
        Self::standard(
            &[
                ("Position", VertexFormatElement::POSITION),
                ("Color", VertexFormatElement::COLOR),
                ("Normal", VertexFormatElement::NORMAL),
            ],
            1,
        )
    }

    fn standard(elements: &[(&str, VertexFormatElement)], padding: u32) -> Self {
        let mut offset = 0;
        let entries: Vec<(String, VertexFormatElement, u32)> = elements
            .iter()
            .map(|(name, element)| {
                let entry = (name.to_string(), *element, offset);
                offset += element.size_in_bytes();
                entry
            })
            .collect();
        Self::assemble(entries, offset + padding)
    }

    /// Stride of one vertex in bytes.
    pub fn vertex_size(&self) -> u32 {
        self.vertex_size
    }

    /// Elements in declaration order.
    pub fn elements(&self) -> &[VertexFormatElement] {
        &self.elements
    }

    /// Attribute names in declaration order.
    pub fn element_attribute_names(&self) -> &[String] {
        &self.names
    }

    /// Byte offset of every element id, [`UNKNOWN_ELEMENT`](Self::UNKNOWN_ELEMENT) if absent.
    pub fn offsets_by_element(&self) -> &[i32; VertexFormatElement::MAX_ELEMENTS] {
        &self.offsets_by_element
    }

    /// Byte offset of `element`, if present.
    pub fn offset(&self, element: VertexFormatElement) -> Option<u32> {
        self.offsets_by_element
            .get(usize::from(element.id))
            .and_then(|&offset| u32::try_from(offset).ok())
    }

    /// Returns true if the format contains `element`.
    pub fn contains(&self, element: VertexFormatElement) -> bool {
        self.elements_mask & element.bit() != 0
    }

    /// Bit set of contained element ids.
    pub fn elements_mask(&self) -> u32 {
        self.elements_mask
    }

    /// Attribute name of `element`, if present.
    pub fn element_name(&self, element: VertexFormatElement) -> Option<&str> {
        self.elements
            .iter()
            .position(|candidate| *candidate == element)
            .map(|index| self.names[index].as_str())
    }

    /// Upload vertices into this format's scratch vertex buffer.
    ///
    /// The buffer is overwritten in place when `data` fits, and released and
    /// recreated otherwise. The returned slice covers exactly `data`.
    pub fn upload_immediate_vertex_buffer(
        &self,
        manager: &DeviceManager,
        data: &[u8],
    ) -> GraphicsResult<GpuBufferSlice> {
        let device = manager.required_device()?;
        let label = format!("Immediate vertex buffer for {self}");
        let mut immediate = self.immediate.lock();
        upload_scratch(&device, &mut immediate.vertex, label, BufferType::Vertices, data)
    }

    /// Upload indices into this format's scratch index buffer.
    pub fn upload_immediate_index_buffer(
        &self,
        manager: &DeviceManager,
        data: &[u8],
    ) -> GraphicsResult<GpuBufferSlice> {
        let device = manager.required_device()?;
        let label = format!("Immediate index buffer for {self}");
        let mut immediate = self.immediate.lock();
        upload_scratch(&device, &mut immediate.index, label, BufferType::Indices, data)
    }

    /// Release both scratch buffers.
    pub fn release_immediate_buffers(&self) {
        let mut immediate = self.immediate.lock();
        immediate.vertex = None;
        immediate.index = None;
    }
}

fn upload_scratch(
    device: &Arc<GpuDevice>,
    slot: &mut Option<GpuBuffer>,
    label: String,
    buffer_type: BufferType,
    data: &[u8],
) -> GraphicsResult<GpuBufferSlice> {
    if data.is_empty() {
        return Err(GraphicsError::InvalidArgument(format!(
            "empty upload to {label}"
        )));
    }

    let reusable = slot.as_ref().is_some_and(|buffer| {
        !buffer.is_closed() && buffer.belongs_to(device) && buffer.size() >= data.len() as u64
    });

    match slot.as_ref() {
        Some(buffer) if reusable => {
            device.create_command_encoder().write_to_buffer(buffer, data, 0)?;
        }
        _ => {
            if let Some(mut old) = slot.take() {
                if !old.is_closed() {
                    old.close()?;
                }
            }
            let size = data.len() as u64;
            let descriptor = BufferDescriptor::new(buffer_type, BufferUsage::DynamicWrite, size)
                .with_label(label);
            *slot = Some(device.create_buffer_with_data(&descriptor, data)?);
        }
    }

    match slot.as_ref() {
        Some(buffer) => buffer.slice(0, data.len() as u64),
        None => Err(GraphicsError::InvalidState(
            "scratch buffer missing after upload".to_string(),
        )),
    }
}

impl PartialEq for VertexFormat {
    fn eq(&self, other: &Self) -> bool {
        self.elements_mask == other.elements_mask
            && self.vertex_size == other.vertex_size
            && self.names == other.names
            && self.offsets_by_element == other.offsets_by_element
    }
}

impl Eq for VertexFormat {}

impl Hash for VertexFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.elements_mask.hash(state);
        self.offsets_by_element.hash(state);
    }
}

impl std::fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VertexFormat[{}]", self.names.join(", "))
    }
}

impl std::fmt::Debug for VertexFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexFormat")
            .field("names", &self.names)
            .field("elements", &self.elements)
            .field("vertex_size", &self.vertex_size)
            .finish()
    }
}

/// Builder for [`VertexFormat`].
#[derive(Debug, Clone, Default)]
pub struct VertexFormatBuilder {
    entries: Vec<(String, VertexFormatElement, u32)>,
    offset: u32,
}

impl VertexFormatBuilder {
    /// Append an element at the current offset.
    pub fn add(mut self, name: impl Into<String>, element: VertexFormatElement) -> Self {
        self.entries.push((name.into(), element, self.offset));
        self.offset += element.size_in_bytes();
        self
    }

    /// Skip `bytes` bytes.
    pub fn padding(mut self, bytes: u32) -> Self {
        self.offset += bytes;
        self
    }

    /// Finish the format.
    ///
    /// Fails with [`GraphicsError::InvalidArgument`] if a name or an element
    /// appears twice, or an element id is out of range.
    pub fn build(self) -> GraphicsResult<VertexFormat> {
        let mut seen_mask = 0u32;
        for (index, (name, element, _)) in self.entries.iter().enumerate() {
            if usize::from(element.id) >= VertexFormatElement::MAX_ELEMENTS {
                return Err(GraphicsError::InvalidArgument(format!(
                    "element id {} of {name} exceeds {}",
                    element.id,
                    VertexFormatElement::MAX_ELEMENTS
                )));
            }
            if seen_mask & element.bit() != 0 {
                return Err(GraphicsError::InvalidArgument(format!(
                    "duplicate element {element} ({name})"
                )));
            }
            if self.entries[..index].iter().any(|(other, _, _)| other == name) {
                return Err(GraphicsError::InvalidArgument(format!(
                    "duplicate attribute name {name}"
                )));
            }
            seen_mask |= element.bit();
        }
        Ok(VertexFormat::assemble(self.entries, self.offset))
    }
}

static_assertions::assert_impl_all!(VertexFormat: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(format: &VertexFormat) -> u64 {
        let mut hasher = DefaultHasher::new();
        format.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_standard_sizes() {
        assert_eq!(VertexFormat::position().vertex_size(), 12);
        assert_eq!(VertexFormat::position_color().vertex_size(), 16);
        assert_eq!(VertexFormat::position_tex().vertex_size(), 20);
        assert_eq!(VertexFormat::position_tex_color().vertex_size(), 24);
        assert_eq!(VertexFormat::position_color_normal().vertex_size(), 20);
    }

    #[test]
    fn test_offsets() {
        let format = VertexFormat::position_tex_color();
        assert_eq!(format.offset(VertexFormatElement::POSITION), Some(0));
        assert_eq!(format.offset(VertexFormatElement::UV0), Some(12));
        assert_eq!(format.offset(VertexFormatElement::COLOR), Some(20));
        assert_eq!(format.offset(VertexFormatElement::NORMAL), None);
        assert_eq!(
            format.offsets_by_element()[usize::from(VertexFormatElement::NORMAL.id)],
            VertexFormat::UNKNOWN_ELEMENT
        );
    }

    #[test]
    fn test_mask_and_names() {
        let format = VertexFormat::position_color();
        assert_eq!(format.elements_mask(), 0b11);
        assert!(format.contains(VertexFormatElement::COLOR));
        assert!(!format.contains(VertexFormatElement::UV0));
        assert_eq!(format.element_name(VertexFormatElement::COLOR), Some("Color"));
        assert_eq!(format.to_string(), "VertexFormat[Position, Color]");
    }

    #[test]
    fn test_builder_matches_standard() {
        let built = VertexFormat::builder()
            .add("Position", VertexFormatElement::POSITION)
            .add("Color", VertexFormatElement::COLOR)
            .add("Normal", VertexFormatElement::NORMAL)
            .padding(1)
            .build()
            .unwrap();
        let standard = VertexFormat::position_color_normal();
        assert_eq!(built, standard);
        assert_eq!(hash_of(&built), hash_of(&standard));
    }

    #[test]
    fn test_structural_inequality() {
        let renamed = VertexFormat::builder()
            .add("Pos", VertexFormatElement::POSITION)
            .build()
            .unwrap();
        assert_ne!(renamed, VertexFormat::position());
        assert_ne!(VertexFormat::position_tex(), VertexFormat::position_color());
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let duplicate_element = VertexFormat::builder()
            .add("Position", VertexFormatElement::POSITION)
            .add("Position2", VertexFormatElement::POSITION)
            .build();
        assert!(matches!(
            duplicate_element,
            Err(GraphicsError::InvalidArgument(_))
        ));

        let duplicate_name = VertexFormat::builder()
            .add("Position", VertexFormatElement::POSITION)
            .add("Position", VertexFormatElement::UV0)
            .build();
        assert!(matches!(
            duplicate_name,
            Err(GraphicsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_upload_requires_device() {
        let manager = DeviceManager::new();
        let format = VertexFormat::position();
        assert!(matches!(
            format.upload_immediate_vertex_buffer(&manager, &[0; 12]),
            Err(GraphicsError::NotInitialized(_))
        ));
    }
}
