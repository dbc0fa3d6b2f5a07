use std::fmt;
use std::rc::Rc;

use log::debug;
use serde_derive::{Deserialize, Serialize};

use crate::driver::{DropObject, Driver, DriverError, ObjectId};
use crate::resource::{Resource, ResourceKind};

/// The type of the components of a vertex attribute, as stored in a vertex buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    Float,
}

impl AttributeType {
    pub(crate) fn gl_id(&self) -> u32 {
        match self {
            AttributeType::Byte => glow::BYTE,
            AttributeType::UnsignedByte => glow::UNSIGNED_BYTE,
            AttributeType::Short => glow::SHORT,
            AttributeType::UnsignedShort => glow::UNSIGNED_SHORT,
            AttributeType::Int => glow::INT,
            AttributeType::UnsignedInt => glow::UNSIGNED_INT,
            AttributeType::HalfFloat => glow::HALF_FLOAT,
            AttributeType::Float => glow::FLOAT,
        }
    }

    /// The size of a single component in bytes.
    pub fn size_in_bytes(&self) -> u32 {
        match self {
            AttributeType::Byte | AttributeType::UnsignedByte => 1,
            AttributeType::Short | AttributeType::UnsignedShort | AttributeType::HalfFloat => 2,
            AttributeType::Int | AttributeType::UnsignedInt | AttributeType::Float => 4,
        }
    }
}

/// Describes how one vertex attribute is laid out within a vertex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct VertexAttributeDescriptor {
    /// The number of components, `1` to `4`.
    pub component_count: u8,
    pub component_type: AttributeType,
    /// The byte offset of the attribute from the start of the vertex.
    pub offset: u32,
    /// Whether integer components are mapped onto `[0, 1]` (unsigned) or `[-1, 1]` (signed) when
    /// read by a shader.
    #[serde(default)]
    pub normalized: bool,
}

impl VertexAttributeDescriptor {
    /// The number of bytes the attribute occupies within a vertex.
    pub fn size_in_bytes(&self) -> u32 {
        self.component_count as u32 * self.component_type.size_in_bytes()
    }
}

/// A vertex array object: the attribute layout used to pull vertices out of vertex buffer binding
/// point `0`.
///
/// Attribute `n` of the layout is assigned to shader input location `n`.
pub struct VertexLayout {
    id: ObjectId,
    attributes: Vec<VertexAttributeDescriptor>,
    stride: u32,
    driver: Rc<dyn Driver>,
}

impl VertexLayout {
    /// Creates a vertex array object with the `attributes` enabled on consecutive locations.
    ///
    /// Returns [DriverError::InvalidValue] without creating anything if an attribute has a
    /// component count outside of `1..=4`, or if an attribute would end beyond `u32::MAX` bytes
    /// into the vertex. An empty attribute list is valid.
    pub fn new(
        driver: &Rc<dyn Driver>,
        attributes: &[VertexAttributeDescriptor],
    ) -> Result<Self, DriverError> {
        if attributes
            .iter()
            .any(|a| a.component_count == 0 || a.component_count > 4)
        {
            return Err(DriverError::InvalidValue);
        }

        let mut stride = 0;

        for attribute in attributes {
            let end = attribute
                .offset
                .checked_add(attribute.size_in_bytes())
                .ok_or(DriverError::InvalidValue)?;

            stride = stride.max(end);
        }

        let id = driver.create_vertex_array(attributes)?;

        debug!(
            "Created vertex layout {} with {} attributes",
            id,
            attributes.len()
        );

        Ok(VertexLayout {
            id,
            attributes: attributes.to_vec(),
            stride,
            driver: driver.clone(),
        })
    }

    pub fn attributes(&self) -> &[VertexAttributeDescriptor] {
        &self.attributes
    }

    /// The byte offset at which the attribute that extends furthest into the vertex ends.
    ///
    /// This is the smallest stride at which vertices can be packed for this layout.
    pub fn stride(&self) -> u32 {
        self.stride
    }
}

impl Resource for VertexLayout {
    const KIND: ResourceKind = ResourceKind::VertexLayout;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VertexLayout")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("stride", &self.stride)
            .finish()
    }
}

impl Drop for VertexLayout {
    fn drop(&mut self) {
        debug!("Dropping vertex layout {}", self.id);

        self.driver.drop_object(DropObject::VertexArray(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::RecordingDriver;

    const POSITION: VertexAttributeDescriptor = VertexAttributeDescriptor {
        component_count: 2,
        component_type: AttributeType::Float,
        offset: 0,
        normalized: false,
    };

    const COLOR: VertexAttributeDescriptor = VertexAttributeDescriptor {
        component_count: 4,
        component_type: AttributeType::UnsignedByte,
        offset: 8,
        normalized: true,
    };

    #[test]
    fn test_stride() {
        let driver: Rc<dyn Driver> = Rc::new(RecordingDriver::new());

        let empty = VertexLayout::new(&driver, &[]).unwrap();
        let position = VertexLayout::new(&driver, &[POSITION]).unwrap();
        let position_color = VertexLayout::new(&driver, &[POSITION, COLOR]).unwrap();

        assert_eq!(empty.stride(), 0);
        assert_eq!(position.stride(), 8);
        assert_eq!(position_color.stride(), 12);
        assert_eq!(position_color.attributes(), &[POSITION, COLOR]);
    }

    #[test]
    fn test_rejects_invalid_component_count() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();

        let mut invalid = POSITION;

        invalid.component_count = 5;

        assert_eq!(
            VertexLayout::new(&driver, &[POSITION, invalid]).unwrap_err(),
            DriverError::InvalidValue
        );
        assert!(recording.calls().is_empty());
    }

    #[test]
    fn test_rejects_overflowing_offset() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();

        let far = VertexAttributeDescriptor {
            component_count: 4,
            component_type: AttributeType::Float,
            offset: u32::MAX - 4,
            normalized: false,
        };

        assert_eq!(
            VertexLayout::new(&driver, &[POSITION, far]).unwrap_err(),
            DriverError::InvalidValue
        );
        assert!(recording.calls().is_empty());

        let last = VertexAttributeDescriptor {
            offset: u32::MAX - 16,
            ..far
        };

        assert_eq!(
            VertexLayout::new(&driver, &[last]).unwrap().stride(),
            u32::MAX
        );
    }

    #[test]
    fn test_descriptor_normalized_defaults_to_false() {
        let descriptor: VertexAttributeDescriptor = serde_json::from_str(
            r#"{ "component_count": 2, "component_type": "half-float", "offset": 4 }"#,
        )
        .unwrap();

        assert_eq!(descriptor.component_type, AttributeType::HalfFloat);
        assert!(!descriptor.normalized);
        assert_eq!(descriptor.size_in_bytes(), 4);
    }
}
