use std::fmt;
use std::marker;
use std::mem;
use std::rc::Rc;

use bytemuck::Pod;
use log::debug;
use serde_derive::{Deserialize, Serialize};

use crate::driver::{DropObject, Driver, DriverError, ObjectId};
use crate::fixed_buffer::{FixedBuffer, SizeMismatch};
use crate::resource::{Resource, ResourceKind};

/// The binding target a buffer object is intended for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BufferTarget {
    Vertex,
    Element,
    ShaderStorage,
}

impl fmt::Display for BufferTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BufferTarget::Vertex => f.write_str("vertex"),
            BufferTarget::Element => f.write_str("element"),
            BufferTarget::ShaderStorage => f.write_str("shader storage"),
        }
    }
}

/// Hint to the driver about how the data store of a buffer will be accessed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
    StaticRead,
    DynamicRead,
    StreamRead,
    StaticCopy,
    DynamicCopy,
    StreamCopy,
}

impl BufferUsage {
    pub(crate) fn gl_id(&self) -> u32 {
        match self {
            BufferUsage::StaticDraw => glow::STATIC_DRAW,
            BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
            BufferUsage::StreamDraw => glow::STREAM_DRAW,
            BufferUsage::StaticRead => glow::STATIC_READ,
            BufferUsage::DynamicRead => glow::DYNAMIC_READ,
            BufferUsage::StreamRead => glow::STREAM_READ,
            BufferUsage::StaticCopy => glow::STATIC_COPY,
            BufferUsage::DynamicCopy => glow::DYNAMIC_COPY,
            BufferUsage::StreamCopy => glow::STREAM_COPY,
        }
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        BufferUsage::StaticDraw
    }
}

/// Marker trait for the kinds of [Buffer].
pub trait BufferKind {
    const TARGET: BufferTarget;

    const RESOURCE_KIND: ResourceKind;
}

/// Marker for buffers that hold vertex data.
pub enum Vertex {}

impl BufferKind for Vertex {
    const TARGET: BufferTarget = BufferTarget::Vertex;

    const RESOURCE_KIND: ResourceKind = ResourceKind::VertexBuffer;
}

/// Marker for buffers that hold vertex indices.
pub enum Element {}

impl BufferKind for Element {
    const TARGET: BufferTarget = BufferTarget::Element;

    const RESOURCE_KIND: ResourceKind = ResourceKind::ElementBuffer;
}

/// Marker for buffers that back shader storage blocks.
pub enum ShaderStorage {}

impl BufferKind for ShaderStorage {
    const TARGET: BufferTarget = BufferTarget::ShaderStorage;

    const RESOURCE_KIND: ResourceKind = ResourceKind::ShaderStorageBuffer;
}

pub type VertexBuffer = Buffer<Vertex>;

pub type ElementBuffer = Buffer<Element>;

pub type ShaderStorageBuffer = Buffer<ShaderStorage>;

/// A GPU buffer object of kind `K`.
///
/// A new buffer has an empty data store; [upload](Buffer::upload) replaces the data store, which
/// may change its size.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use retained_gl::driver::{Driver, RecordingDriver};
/// use retained_gl::resource::{BufferUsage, VertexBuffer};
/// use retained_gl::FixedBuffer;
///
/// # fn main() -> Result<(), retained_gl::driver::DriverError> {
/// let driver: Rc<dyn Driver> = Rc::new(RecordingDriver::new());
/// let mut buffer = VertexBuffer::new(&driver, BufferUsage::StaticDraw)?;
///
/// buffer.upload(&FixedBuffer::from(vec![[0.0f32, 1.0], [1.0, 0.0]]))?;
///
/// assert_eq!(buffer.size_in_bytes(), 16);
/// # Ok(())
/// # }
/// ```
pub struct Buffer<K> {
    id: ObjectId,
    size_in_bytes: usize,
    usage: BufferUsage,
    driver: Rc<dyn Driver>,
    _marker: marker::PhantomData<K>,
}

impl<K> Buffer<K>
where
    K: BufferKind,
{
    pub fn new(driver: &Rc<dyn Driver>, usage: BufferUsage) -> Result<Self, DriverError> {
        let id = driver.create_buffer(K::TARGET)?;

        debug!("Created {} {}", K::RESOURCE_KIND, id);

        Ok(Buffer {
            id,
            size_in_bytes: 0,
            usage,
            driver: driver.clone(),
            _marker: marker::PhantomData,
        })
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Replaces the data store of the buffer with a copy of `data`.
    pub fn upload<T>(&mut self, data: &FixedBuffer<T>) -> Result<(), DriverError>
    where
        T: Pod,
    {
        self.upload_bytes(data.as_bytes())
    }

    /// Replaces the data store of the buffer with a copy of `data`.
    pub fn upload_slice<T>(&mut self, data: &[T]) -> Result<(), DriverError>
    where
        T: Pod,
    {
        self.upload_bytes(bytemuck::cast_slice(data))
    }

    fn upload_bytes(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        self.driver.buffer_data(self.id, bytes, self.usage)?;
        self.size_in_bytes = bytes.len();

        Ok(())
    }

    /// Reads the data store of the buffer back as elements of type `T`.
    ///
    /// Returns [DriverError::SizeMismatch] if the size of the data store is not a whole multiple
    /// of the size of `T`.
    pub fn download<T>(&self) -> Result<FixedBuffer<T>, DriverError>
    where
        T: Pod,
    {
        let element_size = mem::size_of::<T>();

        if self.size_in_bytes == 0 || element_size == 0 {
            return Ok(FixedBuffer::zeroed(0));
        }

        let len = self.size_in_bytes / element_size;

        if len * element_size != self.size_in_bytes {
            return Err(SizeMismatch {
                expected: self.size_in_bytes,
                actual: len * element_size,
            }
            .into());
        }

        let mut data = FixedBuffer::zeroed(len);

        self.driver.read_buffer(self.id, 0, data.as_bytes_mut())?;

        Ok(data)
    }
}

impl<K> Resource for Buffer<K>
where
    K: BufferKind,
{
    const KIND: ResourceKind = K::RESOURCE_KIND;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl<K> fmt::Debug for Buffer<K>
where
    K: BufferKind,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("target", &K::TARGET)
            .field("id", &self.id)
            .field("size_in_bytes", &self.size_in_bytes)
            .field("usage", &self.usage)
            .finish()
    }
}

impl<K> Drop for Buffer<K> {
    fn drop(&mut self) {
        self.driver.drop_object(DropObject::Buffer(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::{Call, RecordingDriver};

    #[test]
    fn test_upload_download() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let mut buffer = ShaderStorageBuffer::new(&driver, BufferUsage::DynamicCopy).unwrap();

        assert_eq!(buffer.download::<u32>().unwrap().len(), 0);

        buffer.upload_slice(&[1u32, 2, 3]).unwrap();

        assert_eq!(buffer.size_in_bytes(), 12);
        assert_eq!(buffer.download::<u32>().unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(
            recording.calls()[1],
            Call::BufferData {
                buffer: buffer.id(),
                len: 12,
                usage: BufferUsage::DynamicCopy,
            }
        );
    }

    #[test]
    fn test_download_size_mismatch() {
        let driver: Rc<dyn Driver> = Rc::new(RecordingDriver::new());
        let mut buffer = VertexBuffer::new(&driver, BufferUsage::StaticDraw).unwrap();

        buffer.upload_slice(&[0u8; 6]).unwrap();

        assert_eq!(
            buffer.download::<u32>().unwrap_err(),
            DriverError::SizeMismatch(SizeMismatch {
                expected: 6,
                actual: 4
            })
        );
    }

    #[test]
    fn test_buffer_kinds() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();

        let _vertex = VertexBuffer::new(&driver, BufferUsage::StaticDraw).unwrap();
        let element = ElementBuffer::new(&driver, BufferUsage::StaticDraw).unwrap();

        assert_eq!(ElementBuffer::KIND, ResourceKind::ElementBuffer);
        assert_eq!(
            recording.calls(),
            vec![
                Call::CreateBuffer(BufferTarget::Vertex),
                Call::CreateBuffer(BufferTarget::Element)
            ]
        );

        drop(element);

        assert_eq!(recording.live_objects(), 1);
    }
}
