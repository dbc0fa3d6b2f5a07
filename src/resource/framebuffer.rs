use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::driver::{DropObject, Driver, DriverError, ObjectId};
use crate::resource::{Resource, ResourceKind};

/// A framebuffer object.
pub struct Framebuffer {
    id: ObjectId,
    driver: Rc<dyn Driver>,
}

impl Framebuffer {
    pub fn new(driver: &Rc<dyn Driver>) -> Result<Self, DriverError> {
        let id = driver.create_framebuffer()?;

        debug!("Created framebuffer {}", id);

        Ok(Framebuffer {
            id,
            driver: driver.clone(),
        })
    }
}

impl Resource for Framebuffer {
    const KIND: ResourceKind = ResourceKind::Framebuffer;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Framebuffer").field("id", &self.id).finish()
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        debug!("Dropping framebuffer {}", self.id);

        self.driver.drop_object(DropObject::Framebuffer(self.id));
    }
}
