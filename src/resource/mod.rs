//! Owning wrappers around GPU objects.
//!
//! Every wrapper holds exactly one live driver handle together with a reference to the [Driver]
//! that created it. Wrappers are move-only; dropping one destroys the GPU object it owns.
//!
//! [Driver]: crate::driver::Driver

use std::fmt;

use crate::driver::ObjectId;

pub mod buffer;
pub mod framebuffer;
pub mod program;
pub mod shader;
pub mod texture;
pub mod vertex_layout;

pub use self::buffer::{
    Buffer, BufferKind, BufferTarget, BufferUsage, ElementBuffer, ShaderStorageBuffer,
    VertexBuffer,
};
pub use self::framebuffer::Framebuffer;
pub use self::program::Program;
pub use self::shader::{FragmentShader, VertexShader};
pub use self::texture::{PixelFormat, Texture, UnsupportedChannelCount};
pub use self::vertex_layout::{AttributeType, VertexAttributeDescriptor, VertexLayout};

/// The kinds of GPU resource the crate manages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ResourceKind {
    Program,
    VertexShader,
    FragmentShader,
    VertexLayout,
    VertexBuffer,
    ElementBuffer,
    ShaderStorageBuffer,
    Texture,
    Framebuffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResourceKind::Program => "program",
            ResourceKind::VertexShader => "vertex shader",
            ResourceKind::FragmentShader => "fragment shader",
            ResourceKind::VertexLayout => "vertex layout",
            ResourceKind::VertexBuffer => "vertex buffer",
            ResourceKind::ElementBuffer => "element buffer",
            ResourceKind::ShaderStorageBuffer => "shader storage buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::Framebuffer => "framebuffer",
        };

        f.write_str(name)
    }
}

/// Implemented by every owning GPU object wrapper.
pub trait Resource {
    /// The kind of GPU object this type wraps.
    const KIND: ResourceKind;

    /// The driver handle of the wrapped object.
    ///
    /// Two live resources never share a handle; a handle may be reused by the driver once the
    /// resource that held it has been dropped.
    fn id(&self) -> ObjectId;
}
