use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::driver::{DropObject, Driver, DriverError, ObjectId, ShaderStage};
use crate::resource::{Resource, ResourceKind};

/// A compiled vertex stage, waiting to be linked into a [Program](crate::resource::Program).
pub struct VertexShader {
    id: ObjectId,
    driver: Rc<dyn Driver>,
}

impl VertexShader {
    /// Compiles `source` into a new vertex shader object.
    ///
    /// Returns [DriverError::ShaderCompilation] with the driver's info log if the source does not
    /// compile.
    pub fn compile(driver: &Rc<dyn Driver>, source: &str) -> Result<Self, DriverError> {
        let id = driver.compile_shader(ShaderStage::Vertex, source)?;

        debug!("Compiled vertex shader {}", id);

        Ok(VertexShader {
            id,
            driver: driver.clone(),
        })
    }
}

impl Resource for VertexShader {
    const KIND: ResourceKind = ResourceKind::VertexShader;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for VertexShader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VertexShader").field("id", &self.id).finish()
    }
}

impl Drop for VertexShader {
    fn drop(&mut self) {
        self.driver.drop_object(DropObject::Shader(self.id));
    }
}

/// A compiled fragment stage, waiting to be linked into a [Program](crate::resource::Program).
pub struct FragmentShader {
    id: ObjectId,
    driver: Rc<dyn Driver>,
}

impl FragmentShader {
    /// Compiles `source` into a new fragment shader object.
    ///
    /// Returns [DriverError::ShaderCompilation] with the driver's info log if the source does not
    /// compile.
    pub fn compile(driver: &Rc<dyn Driver>, source: &str) -> Result<Self, DriverError> {
        let id = driver.compile_shader(ShaderStage::Fragment, source)?;

        debug!("Compiled fragment shader {}", id);

        Ok(FragmentShader {
            id,
            driver: driver.clone(),
        })
    }
}

impl Resource for FragmentShader {
    const KIND: ResourceKind = ResourceKind::FragmentShader;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for FragmentShader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FragmentShader").field("id", &self.id).finish()
    }
}

impl Drop for FragmentShader {
    fn drop(&mut self) {
        self.driver.drop_object(DropObject::Shader(self.id));
    }
}
