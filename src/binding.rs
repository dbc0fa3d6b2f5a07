//! Tracks which resource of each exchangeable kind is currently bound, so that redundant bind
//! calls never reach the driver.

use log::{debug, trace};

use crate::driver::{Driver, ObjectId};
use crate::resource::{Program, Resource, VertexLayout};

/// A resource kind of which the driver holds exactly one "current" object at a time.
pub trait Exchangeable: Resource {
    #[doc(hidden)]
    fn slot(bindings: &Bindings) -> Option<ObjectId>;

    #[doc(hidden)]
    fn slot_mut(bindings: &mut Bindings) -> &mut Option<ObjectId>;

    /// Issues the driver call that makes this resource current.
    fn bind(&self, driver: &dyn Driver);
}

impl Exchangeable for Program {
    fn slot(bindings: &Bindings) -> Option<ObjectId> {
        bindings.program
    }

    fn slot_mut(bindings: &mut Bindings) -> &mut Option<ObjectId> {
        &mut bindings.program
    }

    fn bind(&self, driver: &dyn Driver) {
        driver.use_program(self.id());
    }
}

impl Exchangeable for VertexLayout {
    fn slot(bindings: &Bindings) -> Option<ObjectId> {
        bindings.vertex_layout
    }

    fn slot_mut(bindings: &mut Bindings) -> &mut Option<ObjectId> {
        &mut bindings.vertex_layout
    }

    fn bind(&self, driver: &dyn Driver) {
        driver.bind_vertex_array(self.id());
    }
}

/// The active-binding cache.
///
/// Holds the handle of the currently bound object for every [Exchangeable] kind, or `None` if
/// nothing has been bound through the cache yet. A `None` slot never matches a resource, so the
/// first [set_active](Bindings::set_active) for a kind always reaches the driver.
///
/// The cache assumes it is the only party that changes these bindings on its driver.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Bindings {
    program: Option<ObjectId>,
    vertex_layout: Option<ObjectId>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Makes `resource` the current resource of its kind.
    ///
    /// Issues the bind call on the `driver` and returns `true` if `resource` was not already
    /// current; otherwise does nothing and returns `false`.
    pub fn set_active<R>(&mut self, driver: &dyn Driver, resource: &R) -> bool
    where
        R: Exchangeable,
    {
        let id = resource.id();
        let slot = R::slot_mut(self);

        if *slot == Some(id) {
            trace!("{} {} already active", R::KIND, id);

            false
        } else {
            debug!("Binding {} {}", R::KIND, id);

            resource.bind(driver);
            *slot = Some(id);

            true
        }
    }

    /// Returns the handle of the current resource of kind `R`, if any was bound through this cache.
    pub fn active<R>(&self) -> Option<ObjectId>
    where
        R: Exchangeable,
    {
        R::slot(self)
    }

    /// Clears the slot for kind `R` if it currently holds `id`.
    ///
    /// Must be called when the resource with that handle is destroyed, as the driver may hand the
    /// same handle to a new object.
    pub fn forget<R>(&mut self, id: ObjectId)
    where
        R: Exchangeable,
    {
        let slot = R::slot_mut(self);

        if *slot == Some(id) {
            *slot = None;
        }
    }

    /// Clears every slot, so that the next [set_active](Bindings::set_active) for any kind binds
    /// unconditionally.
    pub fn reset(&mut self) {
        *self = Bindings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::rc::Rc;

    use crate::driver::RecordingDriver;
    use crate::resource::{FragmentShader, VertexShader};

    fn program(driver: &Rc<dyn Driver>) -> Program {
        Program::link(
            driver,
            VertexShader::compile(driver, "void main() {}").unwrap(),
            FragmentShader::compile(driver, "void main() {}").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_set_active_twice_binds_once() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let program = program(&driver);
        let mut bindings = Bindings::new();

        assert_eq!(bindings.active::<Program>(), None);
        assert!(bindings.set_active(&*driver, &program));
        assert!(!bindings.set_active(&*driver, &program));
        assert_eq!(bindings.active::<Program>(), Some(program.id()));
        assert_eq!(recording.use_program_count(), 1);
    }

    #[test]
    fn test_alternating_resources_bind_every_time() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let r1 = program(&driver);
        let r2 = program(&driver);
        let mut bindings = Bindings::new();

        bindings.set_active(&*driver, &r1);
        bindings.set_active(&*driver, &r2);
        bindings.set_active(&*driver, &r1);

        assert_eq!(recording.use_program_count(), 3);
    }

    #[test]
    fn test_slots_are_independent() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let program = program(&driver);
        let layout = VertexLayout::new(&driver, &[]).unwrap();
        let mut bindings = Bindings::new();

        bindings.set_active(&*driver, &program);
        bindings.set_active(&*driver, &layout);
        bindings.set_active(&*driver, &program);

        assert_eq!(recording.use_program_count(), 1);
        assert_eq!(recording.bind_vertex_array_count(), 1);
        assert_eq!(bindings.active::<VertexLayout>(), Some(layout.id()));
    }

    #[test]
    fn test_forget_and_reset() {
        let recording = Rc::new(RecordingDriver::new());
        let driver: Rc<dyn Driver> = recording.clone();
        let program = program(&driver);
        let layout = VertexLayout::new(&driver, &[]).unwrap();
        let mut bindings = Bindings::new();

        bindings.set_active(&*driver, &program);
        bindings.set_active(&*driver, &layout);

        bindings.forget::<Program>(layout.id());

        assert_eq!(bindings.active::<Program>(), Some(program.id()));

        bindings.forget::<Program>(program.id());

        assert_eq!(bindings.active::<Program>(), None);
        assert_eq!(bindings.active::<VertexLayout>(), Some(layout.id()));

        bindings.reset();

        assert_eq!(bindings, Bindings::new());
        assert!(bindings.set_active(&*driver, &layout));
    }
}
