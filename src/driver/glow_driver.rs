use std::ffi::c_void;
use std::num::NonZeroU32;

use glow::{
    HasContext, NativeBuffer, NativeFramebuffer, NativeProgram, NativeShader, NativeTexture,
    NativeVertexArray,
};
use log::debug;

use crate::driver::{DropObject, Driver, DriverError, ObjectId, ShaderStage};
use crate::resource::{BufferTarget, BufferUsage, PixelFormat, VertexAttributeDescriptor};

/// A [Driver] that issues OpenGL 4.6 core calls through a [glow::Context].
///
/// Buffer uploads and downloads go through the `COPY_WRITE_BUFFER` and `COPY_READ_BUFFER` targets,
/// so that filling an element buffer never modifies the element buffer binding of whichever vertex
/// array object happens to be bound.
pub struct GlowDriver {
    gl: glow::Context,
}

impl GlowDriver {
    /// Loads the OpenGL function pointers with `loader` (for example the windowing library's
    /// `get_proc_address`).
    ///
    /// # Unsafety
    ///
    /// The OpenGL context the functions are loaded for must be current on the calling thread, and
    /// must stay current for as long as the driver and any resource created through it are used.
    pub unsafe fn from_loader_function<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        GlowDriver {
            gl: glow::Context::from_loader_function(loader),
        }
    }

    /// Wraps an existing [glow::Context].
    ///
    /// # Unsafety
    ///
    /// See [from_loader_function](GlowDriver::from_loader_function).
    pub unsafe fn from_glow_context(gl: glow::Context) -> Self {
        GlowDriver { gl }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn check_error(&self) -> Result<(), DriverError> {
        match DriverError::from_gl_error(unsafe { self.gl.get_error() }) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    unsafe fn binding(&self, parameter: u32) -> Option<NonZeroU32> {
        NonZeroU32::new(self.gl.get_parameter_i32(parameter) as u32)
    }
}

impl Driver for GlowDriver {
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ObjectId, DriverError> {
        let gl = &self.gl;

        unsafe {
            let shader = gl
                .create_shader(stage.gl_id())
                .map_err(DriverError::ObjectCreation)?;

            gl.shader_source(shader, source);
            gl.compile_shader(shader);

            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);

                gl.delete_shader(shader);

                return Err(DriverError::ShaderCompilation { stage, log });
            }

            Ok(shader.0)
        }
    }

    fn link_program(
        &self,
        vertex_shader: ObjectId,
        fragment_shader: ObjectId,
    ) -> Result<ObjectId, DriverError> {
        let gl = &self.gl;
        let vertex_shader = NativeShader(vertex_shader);
        let fragment_shader = NativeShader(fragment_shader);

        unsafe {
            let program = gl.create_program().map_err(DriverError::ObjectCreation)?;

            gl.attach_shader(program, vertex_shader);
            gl.attach_shader(program, fragment_shader);
            gl.link_program(program);
            gl.detach_shader(program, vertex_shader);
            gl.detach_shader(program, fragment_shader);

            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);

                gl.delete_program(program);

                return Err(DriverError::ProgramLinking { log });
            }

            Ok(program.0)
        }
    }

    fn use_program(&self, program: ObjectId) {
        unsafe {
            self.gl.use_program(Some(NativeProgram(program)));
        }
    }

    fn create_vertex_array(
        &self,
        attributes: &[VertexAttributeDescriptor],
    ) -> Result<ObjectId, DriverError> {
        let gl = &self.gl;

        unsafe {
            let vertex_array = gl
                .create_vertex_array()
                .map_err(DriverError::ObjectCreation)?;
            let previous = self.binding(glow::VERTEX_ARRAY_BINDING);

            gl.bind_vertex_array(Some(vertex_array));

            for (location, attribute) in attributes.iter().enumerate() {
                let location = location as u32;

                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_format_f32(
                    location,
                    attribute.component_count as i32,
                    attribute.component_type.gl_id(),
                    attribute.normalized,
                    attribute.offset,
                );
                gl.vertex_attrib_binding(location, 0);
            }

            gl.bind_vertex_array(previous.map(NativeVertexArray));

            if let Err(error) = self.check_error() {
                gl.delete_vertex_array(vertex_array);

                return Err(error);
            }

            Ok(vertex_array.0)
        }
    }

    fn bind_vertex_array(&self, vertex_array: ObjectId) {
        unsafe {
            self.gl
                .bind_vertex_array(Some(NativeVertexArray(vertex_array)));
        }
    }

    fn create_buffer(&self, target: BufferTarget) -> Result<ObjectId, DriverError> {
        let gl = &self.gl;

        unsafe {
            let buffer = gl.create_buffer().map_err(DriverError::ObjectCreation)?;
            let previous = self.binding(glow::COPY_WRITE_BUFFER_BINDING);

            // Binding once turns the reserved name into an actual buffer object.
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(buffer));
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, previous.map(NativeBuffer));

            if let Err(error) = self.check_error() {
                gl.delete_buffer(buffer);

                return Err(error);
            }

            debug!("Created {} buffer object {}", target, buffer.0);

            Ok(buffer.0)
        }
    }

    fn buffer_data(
        &self,
        buffer: ObjectId,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<(), DriverError> {
        let gl = &self.gl;

        unsafe {
            let previous = self.binding(glow::COPY_WRITE_BUFFER_BINDING);

            gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(NativeBuffer(buffer)));
            gl.buffer_data_u8_slice(glow::COPY_WRITE_BUFFER, data, usage.gl_id());
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, previous.map(NativeBuffer));
        }

        self.check_error()
    }

    fn read_buffer(
        &self,
        buffer: ObjectId,
        offset: usize,
        destination: &mut [u8],
    ) -> Result<(), DriverError> {
        let gl = &self.gl;

        unsafe {
            let previous = self.binding(glow::COPY_READ_BUFFER_BINDING);

            gl.bind_buffer(glow::COPY_READ_BUFFER, Some(NativeBuffer(buffer)));
            gl.get_buffer_sub_data(glow::COPY_READ_BUFFER, offset as i32, destination);
            gl.bind_buffer(glow::COPY_READ_BUFFER, previous.map(NativeBuffer));
        }

        self.check_error()
    }

    fn create_texture(&self) -> Result<ObjectId, DriverError> {
        let gl = &self.gl;

        unsafe {
            let texture = gl.create_texture().map_err(DriverError::ObjectCreation)?;
            let previous = self.binding(glow::TEXTURE_BINDING_2D);

            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.bind_texture(glow::TEXTURE_2D, previous.map(NativeTexture));

            if let Err(error) = self.check_error() {
                gl.delete_texture(texture);

                return Err(error);
            }

            Ok(texture.0)
        }
    }

    fn texture_image(
        &self,
        texture: ObjectId,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) -> Result<(), DriverError> {
        let gl = &self.gl;

        unsafe {
            let previous = self.binding(glow::TEXTURE_BINDING_2D);

            gl.bind_texture(glow::TEXTURE_2D, Some(NativeTexture(texture)));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format.gl_internal_format() as i32,
                width as i32,
                height as i32,
                0,
                format.gl_format(),
                glow::UNSIGNED_BYTE,
                data,
            );
            gl.bind_texture(glow::TEXTURE_2D, previous.map(NativeTexture));
        }

        self.check_error()
    }

    fn create_framebuffer(&self) -> Result<ObjectId, DriverError> {
        let framebuffer = unsafe { self.gl.create_framebuffer() }
            .map_err(DriverError::ObjectCreation)?;

        Ok(framebuffer.0)
    }

    fn drop_object(&self, object: DropObject) {
        let gl = &self.gl;

        unsafe {
            match object {
                DropObject::Buffer(id) => gl.delete_buffer(NativeBuffer(id)),
                DropObject::Framebuffer(id) => gl.delete_framebuffer(NativeFramebuffer(id)),
                DropObject::Program(id) => gl.delete_program(NativeProgram(id)),
                DropObject::Shader(id) => gl.delete_shader(NativeShader(id)),
                DropObject::Texture(id) => gl.delete_texture(NativeTexture(id)),
                DropObject::VertexArray(id) => gl.delete_vertex_array(NativeVertexArray(id)),
            }
        }
    }
}
