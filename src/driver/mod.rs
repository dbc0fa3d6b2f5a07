//! The immediate-mode GPU API that the resource wrappers and the binding cache talk to.
//!
//! All GPU objects are identified by non-zero integer handles ([ObjectId]). A handle of `0` means
//! "no object" in the OpenGL API and is never handed out by a [Driver]; live resource wrappers
//! therefore always hold a valid handle.
//!
//! Two drivers are provided:
//!
//! - [GlowDriver] issues real OpenGL calls through [glow]; it is created from the platform's GL
//!   function loader.
//! - [RecordingDriver] allocates handles in-process, records every call and can be told to fail.
//!   It is used to test code that sits on top of a [Driver].

use std::fmt;
use std::num::NonZeroU32;

use failure::Fail;
use serde_derive::{Deserialize, Serialize};

use crate::fixed_buffer::SizeMismatch;
use crate::resource::{BufferTarget, BufferUsage, PixelFormat, VertexAttributeDescriptor};

#[cfg(not(target_arch = "wasm32"))]
mod glow_driver;
#[cfg(not(target_arch = "wasm32"))]
pub use self::glow_driver::GlowDriver;

mod recording;
pub use self::recording::{Call, FailurePoint, RecordingDriver};

/// A driver-assigned handle for a GPU object.
pub type ObjectId = NonZeroU32;

/// The programmable stage a shader object belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn gl_id(&self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A GPU object that is to be destroyed, see [Driver::drop_object].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DropObject {
    Buffer(ObjectId),
    Framebuffer(ObjectId),
    Program(ObjectId),
    Shader(ObjectId),
    Texture(ObjectId),
    VertexArray(ObjectId),
}

impl DropObject {
    pub fn id(&self) -> ObjectId {
        match *self {
            DropObject::Buffer(id) => id,
            DropObject::Framebuffer(id) => id,
            DropObject::Program(id) => id,
            DropObject::Shader(id) => id,
            DropObject::Texture(id) => id,
            DropObject::VertexArray(id) => id,
        }
    }
}

/// The calls the resource wrappers and the binding cache issue against the GPU.
///
/// Creation calls either return a valid handle or a [DriverError]; they never retry. Bind calls
/// ([use_program](Driver::use_program), [bind_vertex_array](Driver::bind_vertex_array)) are only
/// ever issued for handles that were previously returned by this driver and have not been
/// dropped; a driver may treat a violation of that contract as fatal.
///
/// Calls that create or configure an object must leave the driver's current bindings as they
/// found them, so that a binding cache that sits on top of the driver stays accurate.
pub trait Driver {
    /// Creates a shader object for the `stage` and compiles `source` into it.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ObjectId, DriverError>;

    /// Creates a program object and links the two (already compiled) shader objects into it.
    ///
    /// The shader objects are not consumed; the caller remains responsible for dropping them.
    fn link_program(
        &self,
        vertex_shader: ObjectId,
        fragment_shader: ObjectId,
    ) -> Result<ObjectId, DriverError>;

    /// Makes `program` the current program.
    fn use_program(&self, program: ObjectId);

    /// Creates a vertex array object with the `attributes` enabled on consecutive locations
    /// starting at `0`, all sourced from vertex buffer binding point `0`.
    fn create_vertex_array(
        &self,
        attributes: &[VertexAttributeDescriptor],
    ) -> Result<ObjectId, DriverError>;

    /// Makes `vertex_array` the current vertex array object.
    fn bind_vertex_array(&self, vertex_array: ObjectId);

    /// Creates an empty buffer object intended for use with the `target`.
    fn create_buffer(&self, target: BufferTarget) -> Result<ObjectId, DriverError>;

    /// Replaces the data store of `buffer` with a copy of `data`.
    fn buffer_data(
        &self,
        buffer: ObjectId,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<(), DriverError>;

    /// Copies `destination.len()` bytes, starting at `offset`, out of the data store of `buffer`.
    fn read_buffer(
        &self,
        buffer: ObjectId,
        offset: usize,
        destination: &mut [u8],
    ) -> Result<(), DriverError>;

    /// Creates a 2D texture object without any image storage.
    fn create_texture(&self) -> Result<ObjectId, DriverError>;

    /// Allocates image storage of the given dimensions for `texture` and optionally fills it with
    /// `data` (tightly packed rows in the `format`).
    fn texture_image(
        &self,
        texture: ObjectId,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) -> Result<(), DriverError>;

    /// Creates a framebuffer object.
    fn create_framebuffer(&self) -> Result<ObjectId, DriverError>;

    /// Destroys a GPU object.
    fn drop_object(&self, object: DropObject);
}

/// Error reported by a [Driver] when a GPU object could not be created or updated.
#[derive(Clone, PartialEq, Debug, Fail)]
pub enum DriverError {
    #[fail(display = "{} shader failed to compile: {}", stage, log)]
    ShaderCompilation { stage: ShaderStage, log: String },
    #[fail(display = "program failed to link: {}", log)]
    ProgramLinking { log: String },
    #[fail(display = "driver failed to create object: {}", _0)]
    ObjectCreation(String),
    #[fail(display = "driver rejected an enum argument")]
    InvalidEnum,
    #[fail(display = "driver rejected a numeric argument")]
    InvalidValue,
    #[fail(display = "operation is not allowed in the current driver state")]
    InvalidOperation,
    #[fail(display = "driver ran out of memory")]
    OutOfMemory,
    #[fail(display = "driver reported error code {:#x}", _0)]
    Code(u32),
    #[fail(display = "data does not match the declared size: {}", _0)]
    SizeMismatch(SizeMismatch),
}

impl DriverError {
    /// Maps an OpenGL error code to a [DriverError], or `None` for `NO_ERROR`.
    pub fn from_gl_error(code: u32) -> Option<Self> {
        match code {
            glow::NO_ERROR => None,
            glow::INVALID_ENUM => Some(DriverError::InvalidEnum),
            glow::INVALID_VALUE => Some(DriverError::InvalidValue),
            glow::INVALID_OPERATION => Some(DriverError::InvalidOperation),
            glow::OUT_OF_MEMORY => Some(DriverError::OutOfMemory),
            code => Some(DriverError::Code(code)),
        }
    }
}

impl From<SizeMismatch> for DriverError {
    fn from(error: SizeMismatch) -> Self {
        DriverError::SizeMismatch(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gl_error() {
        assert_eq!(DriverError::from_gl_error(glow::NO_ERROR), None);
        assert_eq!(
            DriverError::from_gl_error(glow::INVALID_ENUM),
            Some(DriverError::InvalidEnum)
        );
        assert_eq!(
            DriverError::from_gl_error(glow::OUT_OF_MEMORY),
            Some(DriverError::OutOfMemory)
        );
        assert_eq!(
            DriverError::from_gl_error(0x0507),
            Some(DriverError::Code(0x0507))
        );
    }

    #[test]
    fn test_shader_compilation_display() {
        let error = DriverError::ShaderCompilation {
            stage: ShaderStage::Fragment,
            log: "0:1: syntax error".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "fragment shader failed to compile: 0:1: syntax error"
        );
    }
}
