use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::driver::{DropObject, Driver, DriverError, ObjectId};
use crate::resource::{FragmentShader, Resource, ResourceKind, VertexShader};

/// A linked shader program.
///
/// A program is built from exactly one [VertexShader] and one [FragmentShader]. The stages are
/// consumed by [Program::link]: their shader objects are destroyed as soon as linking has
/// finished, whether it succeeded or not.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use retained_gl::driver::{Driver, RecordingDriver};
/// use retained_gl::resource::{FragmentShader, Program, VertexShader};
///
/// # fn main() -> Result<(), retained_gl::driver::DriverError> {
/// let driver: Rc<dyn Driver> = Rc::new(RecordingDriver::new());
///
/// let program = Program::link(
///     &driver,
///     VertexShader::compile(&driver, "void main() {}")?,
///     FragmentShader::compile(&driver, "void main() {}")?,
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct Program {
    id: ObjectId,
    driver: Rc<dyn Driver>,
}

impl Program {
    pub fn link(
        driver: &Rc<dyn Driver>,
        vertex_shader: VertexShader,
        fragment_shader: FragmentShader,
    ) -> Result<Self, DriverError> {
        let id = driver.link_program(vertex_shader.id(), fragment_shader.id())?;

        debug!(
            "Linked program {} from shaders {} and {}",
            id,
            vertex_shader.id(),
            fragment_shader.id()
        );

        Ok(Program {
            id,
            driver: driver.clone(),
        })
    }
}

impl Resource for Program {
    const KIND: ResourceKind = ResourceKind::Program;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Program").field("id", &self.id).finish()
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        debug!("Dropping program {}", self.id);

        self.driver.drop_object(DropObject::Program(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::{Call, FailurePoint, RecordingDriver};

    fn stages(driver: &Rc<dyn Driver>) -> (VertexShader, FragmentShader) {
        (
            VertexShader::compile(driver, "void main() {}").unwrap(),
            FragmentShader::compile(driver, "void main() {}").unwrap(),
        )
    }

    #[test]
    fn test_link_consumes_stages() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let (vertex, fragment) = stages(&driver);

        let program = Program::link(&driver, vertex, fragment).unwrap();

        assert_eq!(recording.live_objects(), 1);
        assert!(recording.is_live(program.id()));

        drop(program);

        assert_eq!(recording.live_objects(), 0);
    }

    #[test]
    fn test_failed_link_still_releases_stages() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let (vertex, fragment) = stages(&driver);

        recording.fail_at(FailurePoint::ProgramLink);

        match Program::link(&driver, vertex, fragment) {
            Err(DriverError::ProgramLinking { .. }) => (),
            other => panic!("expected a linking error, got {:?}", other),
        }

        assert_eq!(recording.live_objects(), 0);
        assert_eq!(recording.drop_count(), 2);
    }

    #[test]
    fn test_stage_failure_short_circuits() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();

        let result = (|| -> Result<Program, DriverError> {
            let vertex = VertexShader::compile(&driver, "")?;
            let fragment = FragmentShader::compile(&driver, "void main() {}")?;

            Program::link(&driver, vertex, fragment)
        })();

        assert!(result.is_err());
        assert_eq!(
            recording.count(|call| match call {
                Call::LinkProgram { .. } => true,
                _ => false,
            }),
            0
        );
    }
}
