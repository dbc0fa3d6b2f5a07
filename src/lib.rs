//! A catalogue of named OpenGL resources with an active-binding cache.
//!
//! A [Context] is bootstrapped from a [ContextDescriptor](descriptor::ContextDescriptor): it
//! creates a framebuffer, a set of vertex layouts, a set of shader programs and a `default` buffer
//! of every kind plus a `default` texture, and then activates a default program and vertex layout.
//! Resources are looked up by name; making a program or vertex layout current through the context
//! only reaches the driver when a different one was current before.
//!
//! [FixedBuffer] stages data for upload into buffers and textures, and receives data read back
//! from buffers.

pub mod binding;
pub mod context;
pub mod descriptor;
pub mod driver;
pub mod fixed_buffer;
pub mod registry;
pub mod resource;

pub use crate::binding::Bindings;
pub use crate::context::{BootstrapCause, BootstrapError, BootstrapStep, Context};
pub use crate::fixed_buffer::{FixedBuffer, OutOfRange, SizeMismatch};
pub use crate::registry::{Catalogue, Registry, UnknownResource};
