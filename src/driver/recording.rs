use std::cell::{Cell, RefCell};
use std::num::NonZeroU32;

use fnv::{FnvHashMap, FnvHashSet};

use crate::driver::{DropObject, Driver, DriverError, ObjectId, ShaderStage};
use crate::resource::{BufferTarget, BufferUsage, PixelFormat, VertexAttributeDescriptor};

/// A call issued against a [RecordingDriver].
#[derive(Clone, PartialEq, Debug)]
pub enum Call {
    CompileShader(ShaderStage),
    LinkProgram {
        vertex_shader: ObjectId,
        fragment_shader: ObjectId,
    },
    UseProgram(ObjectId),
    CreateVertexArray(Vec<VertexAttributeDescriptor>),
    BindVertexArray(ObjectId),
    CreateBuffer(BufferTarget),
    BufferData {
        buffer: ObjectId,
        len: usize,
        usage: BufferUsage,
    },
    ReadBuffer {
        buffer: ObjectId,
        offset: usize,
        len: usize,
    },
    CreateTexture,
    TextureImage {
        texture: ObjectId,
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    CreateFramebuffer,
    DropObject(DropObject),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Kind {
    Buffer,
    Framebuffer,
    Program,
    Shader(ShaderStage),
    Texture,
    VertexArray,
}

impl Kind {
    fn matches(&self, object: &DropObject) -> bool {
        match (self, object) {
            (Kind::Buffer, DropObject::Buffer(_)) => true,
            (Kind::Framebuffer, DropObject::Framebuffer(_)) => true,
            (Kind::Program, DropObject::Program(_)) => true,
            (Kind::Shader(_), DropObject::Shader(_)) => true,
            (Kind::Texture, DropObject::Texture(_)) => true,
            (Kind::VertexArray, DropObject::VertexArray(_)) => true,
            _ => false,
        }
    }
}

/// A point at which a [RecordingDriver] can be told to fail, see [RecordingDriver::fail_at].
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FailurePoint {
    /// Compiling any shader whose source contains the given text.
    ShaderSource(String),
    /// Linking any program.
    ProgramLink,
    /// Creating any vertex array object.
    VertexArray,
    /// Creating any buffer object for the given target.
    Buffer(BufferTarget),
    /// Creating any texture object.
    Texture,
    /// Creating any framebuffer object.
    Framebuffer,
}

/// A [Driver] that keeps all GPU objects in-process and records every call made against it.
///
/// Handles are allocated in increasing order starting at `1`; the handle of a dropped object is
/// reused by the next object that is created, as an OpenGL implementation is free to do.
///
/// Binding an object that does not exist (never created, already dropped, or of the wrong kind) is
/// a violation of the [Driver] contract and panics.
///
/// # Example
///
/// ```
/// use retained_gl::driver::{Driver, RecordingDriver, ShaderStage};
///
/// let driver = RecordingDriver::new();
/// let shader = driver.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
///
/// assert_eq!(shader.get(), 1);
/// assert_eq!(driver.live_objects(), 1);
/// ```
#[derive(Default, Debug)]
pub struct RecordingDriver {
    next_id: Cell<u32>,
    free_ids: RefCell<Vec<ObjectId>>,
    objects: RefCell<FnvHashMap<ObjectId, Kind>>,
    buffer_data: RefCell<FnvHashMap<ObjectId, Vec<u8>>>,
    failure_points: RefCell<FnvHashSet<FailurePoint>>,
    calls: RefCell<Vec<Call>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        RecordingDriver::default()
    }

    /// Makes every subsequent call that matches `point` fail, until [clear_failures] is called.
    ///
    /// [clear_failures]: RecordingDriver::clear_failures
    pub fn fail_at(&self, point: FailurePoint) {
        self.failure_points.borrow_mut().insert(point);
    }

    pub fn clear_failures(&self) {
        self.failure_points.borrow_mut().clear();
    }

    /// Returns a copy of all calls recorded so far, in the order they were issued.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Returns the number of recorded calls for which `predicate` returns `true`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    /// Returns the number of `use_program` calls issued so far.
    pub fn use_program_count(&self) -> usize {
        self.count(|call| match call {
            Call::UseProgram(_) => true,
            _ => false,
        })
    }

    /// Returns the number of `bind_vertex_array` calls issued so far.
    pub fn bind_vertex_array_count(&self) -> usize {
        self.count(|call| match call {
            Call::BindVertexArray(_) => true,
            _ => false,
        })
    }

    /// Returns the number of `drop_object` calls issued so far.
    pub fn drop_count(&self) -> usize {
        self.count(|call| match call {
            Call::DropObject(_) => true,
            _ => false,
        })
    }

    /// Returns the number of objects that have been created but not yet dropped.
    pub fn live_objects(&self) -> usize {
        self.objects.borrow().len()
    }

    /// Returns `true` if an object with the `id` currently exists.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.objects.borrow().contains_key(&id)
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn fails_at(&self, point: &FailurePoint) -> bool {
        self.failure_points.borrow().contains(point)
    }

    fn allocate(&self, kind: Kind) -> ObjectId {
        let id = self.free_ids.borrow_mut().pop().unwrap_or_else(|| {
            let next = self.next_id.get() + 1;

            self.next_id.set(next);

            match NonZeroU32::new(next) {
                Some(id) => id,
                None => panic!("handle space exhausted"),
            }
        });

        self.objects.borrow_mut().insert(id, kind);

        id
    }

    fn kind_of(&self, id: ObjectId) -> Option<Kind> {
        self.objects.borrow().get(&id).copied()
    }

    fn expect_buffer(&self, buffer: ObjectId) -> Result<(), DriverError> {
        match self.kind_of(buffer) {
            Some(Kind::Buffer) => Ok(()),
            _ => Err(DriverError::InvalidOperation),
        }
    }
}

impl Driver for RecordingDriver {
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ObjectId, DriverError> {
        self.record(Call::CompileShader(stage));

        let rejected = self
            .failure_points
            .borrow()
            .iter()
            .any(|point| match point {
                FailurePoint::ShaderSource(text) => source.contains(text.as_str()),
                _ => false,
            });

        if rejected || source.trim().is_empty() {
            return Err(DriverError::ShaderCompilation {
                stage,
                log: "0:1: source rejected".to_string(),
            });
        }

        Ok(self.allocate(Kind::Shader(stage)))
    }

    fn link_program(
        &self,
        vertex_shader: ObjectId,
        fragment_shader: ObjectId,
    ) -> Result<ObjectId, DriverError> {
        self.record(Call::LinkProgram {
            vertex_shader,
            fragment_shader,
        });

        if self.kind_of(vertex_shader) != Some(Kind::Shader(ShaderStage::Vertex)) {
            return Err(DriverError::ProgramLinking {
                log: format!("{} is not a vertex shader", vertex_shader),
            });
        }

        if self.kind_of(fragment_shader) != Some(Kind::Shader(ShaderStage::Fragment)) {
            return Err(DriverError::ProgramLinking {
                log: format!("{} is not a fragment shader", fragment_shader),
            });
        }

        if self.fails_at(&FailurePoint::ProgramLink) {
            return Err(DriverError::ProgramLinking {
                log: "link rejected".to_string(),
            });
        }

        Ok(self.allocate(Kind::Program))
    }

    fn use_program(&self, program: ObjectId) {
        if self.kind_of(program) != Some(Kind::Program) {
            panic!("bound {}, which is not a live program object", program);
        }

        self.record(Call::UseProgram(program));
    }

    fn create_vertex_array(
        &self,
        attributes: &[VertexAttributeDescriptor],
    ) -> Result<ObjectId, DriverError> {
        self.record(Call::CreateVertexArray(attributes.to_vec()));

        if self.fails_at(&FailurePoint::VertexArray) {
            return Err(DriverError::OutOfMemory);
        }

        Ok(self.allocate(Kind::VertexArray))
    }

    fn bind_vertex_array(&self, vertex_array: ObjectId) {
        if self.kind_of(vertex_array) != Some(Kind::VertexArray) {
            panic!(
                "bound {}, which is not a live vertex array object",
                vertex_array
            );
        }

        self.record(Call::BindVertexArray(vertex_array));
    }

    fn create_buffer(&self, target: BufferTarget) -> Result<ObjectId, DriverError> {
        self.record(Call::CreateBuffer(target));

        if self.fails_at(&FailurePoint::Buffer(target)) {
            return Err(DriverError::InvalidEnum);
        }

        let id = self.allocate(Kind::Buffer);

        self.buffer_data.borrow_mut().insert(id, Vec::new());

        Ok(id)
    }

    fn buffer_data(
        &self,
        buffer: ObjectId,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<(), DriverError> {
        self.record(Call::BufferData {
            buffer,
            len: data.len(),
            usage,
        });
        self.expect_buffer(buffer)?;
        self.buffer_data.borrow_mut().insert(buffer, data.to_vec());

        Ok(())
    }

    fn read_buffer(
        &self,
        buffer: ObjectId,
        offset: usize,
        destination: &mut [u8],
    ) -> Result<(), DriverError> {
        self.record(Call::ReadBuffer {
            buffer,
            offset,
            len: destination.len(),
        });
        self.expect_buffer(buffer)?;

        let store = self.buffer_data.borrow();
        let data = store.get(&buffer).ok_or(DriverError::InvalidOperation)?;
        let end = match offset.checked_add(destination.len()) {
            Some(end) if end <= data.len() => end,
            _ => return Err(DriverError::InvalidValue),
        };

        destination.copy_from_slice(&data[offset..end]);

        Ok(())
    }

    fn create_texture(&self) -> Result<ObjectId, DriverError> {
        self.record(Call::CreateTexture);

        if self.fails_at(&FailurePoint::Texture) {
            return Err(DriverError::OutOfMemory);
        }

        Ok(self.allocate(Kind::Texture))
    }

    fn texture_image(
        &self,
        texture: ObjectId,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) -> Result<(), DriverError> {
        self.record(Call::TextureImage {
            texture,
            width,
            height,
            format,
        });

        if self.kind_of(texture) != Some(Kind::Texture) {
            return Err(DriverError::InvalidOperation);
        }

        if let Some(data) = data {
            let expected = width as usize * height as usize * format.channel_count();

            if data.len() != expected {
                return Err(DriverError::InvalidValue);
            }
        }

        Ok(())
    }

    fn create_framebuffer(&self) -> Result<ObjectId, DriverError> {
        self.record(Call::CreateFramebuffer);

        if self.fails_at(&FailurePoint::Framebuffer) {
            return Err(DriverError::ObjectCreation(
                "framebuffer rejected".to_string(),
            ));
        }

        Ok(self.allocate(Kind::Framebuffer))
    }

    fn drop_object(&self, object: DropObject) {
        self.record(Call::DropObject(object));

        let id = object.id();
        let mut objects = self.objects.borrow_mut();

        match objects.get(&id) {
            Some(kind) if kind.matches(&object) => {
                objects.remove(&id);
                self.buffer_data.borrow_mut().remove(&id);
                self.free_ids.borrow_mut().push(id);
            }
            _ => panic!("dropped {:?}, which is not a live object of that kind", object),
        }
    }
}
