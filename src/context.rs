use std::fmt;
use std::rc::Rc;

use failure::Fail;
use log::{debug, info};

use crate::binding::{Bindings, Exchangeable};
use crate::descriptor::ContextDescriptor;
use crate::driver::{Driver, DriverError, ObjectId};
use crate::registry::{Catalogued, Registry, UnknownResource};
use crate::resource::{
    ElementBuffer, Framebuffer, FragmentShader, Program, Resource, ShaderStorageBuffer, Texture,
    VertexAttributeDescriptor, VertexBuffer, VertexLayout, VertexShader,
};

/// The stages of [Context::bootstrap], in the order in which they run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BootstrapStep {
    Framebuffer,
    VertexLayouts,
    Programs,
    DefaultResources,
    Activation,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BootstrapStep::Framebuffer => f.write_str("framebuffer"),
            BootstrapStep::VertexLayouts => f.write_str("vertex layouts"),
            BootstrapStep::Programs => f.write_str("programs"),
            BootstrapStep::DefaultResources => f.write_str("default resources"),
            BootstrapStep::Activation => f.write_str("activation"),
        }
    }
}

/// The reason a [BootstrapError] occurred.
#[derive(Clone, PartialEq, Debug, Fail)]
pub enum BootstrapCause {
    #[fail(display = "{}", _0)]
    Driver(#[fail(cause)] DriverError),
    #[fail(display = "{}", _0)]
    UnknownResource(#[fail(cause)] UnknownResource),
    #[fail(display = "no vertex attribute named `{}`", _0)]
    UnknownAttribute(String),
    #[fail(display = "no vertex source named `{}`", _0)]
    UnknownVertexSource(String),
    #[fail(display = "no fragment source named `{}`", _0)]
    UnknownFragmentSource(String),
}

impl From<DriverError> for BootstrapCause {
    fn from(error: DriverError) -> Self {
        BootstrapCause::Driver(error)
    }
}

impl From<UnknownResource> for BootstrapCause {
    fn from(error: UnknownResource) -> Self {
        BootstrapCause::UnknownResource(error)
    }
}

/// Error returned by [Context::bootstrap], identifying the step and the named resource that
/// failed.
#[derive(Clone, PartialEq, Debug, Fail)]
#[fail(display = "bootstrap failed at {} (`{}`): {}", step, resource, cause)]
pub struct BootstrapError {
    pub step: BootstrapStep,
    pub resource: String,
    #[fail(cause)]
    pub cause: BootstrapCause,
}

trait BootstrapResultExt<T> {
    fn at(self, step: BootstrapStep, resource: &str) -> Result<T, BootstrapError>;
}

impl<T, E> BootstrapResultExt<T> for Result<T, E>
where
    E: Into<BootstrapCause>,
{
    fn at(self, step: BootstrapStep, resource: &str) -> Result<T, BootstrapError> {
        self.map_err(|error| BootstrapError {
            step,
            resource: resource.to_string(),
            cause: error.into(),
        })
    }
}

/// A catalogue of named GPU resources together with the binding cache for its driver.
///
/// A context is created with [Context::bootstrap], which builds every resource its
/// [ContextDescriptor] names. The context owns all resources in its [Registry] and destroys them
/// when it is dropped.
///
/// All calls must be made on the thread on which the driver's context is current; a context is
/// neither `Send` nor `Sync`.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use retained_gl::descriptor::ContextDescriptor;
/// use retained_gl::driver::RecordingDriver;
/// use retained_gl::resource::Program;
/// use retained_gl::Context;
///
/// # fn main() -> Result<(), failure::Error> {
/// let driver = Rc::new(RecordingDriver::new());
/// let mut context = Context::bootstrap(driver.clone(), &ContextDescriptor::default())?;
///
/// context.set_active::<Program>("PosColor")?;
/// context.set_active::<Program>("PosColor")?;
///
/// // One bind during the bootstrap (`Pos`) and one for `PosColor`.
/// assert_eq!(driver.use_program_count(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Context {
    registry: Registry,
    bindings: Bindings,
    framebuffer: Framebuffer,
    driver: Rc<dyn Driver>,
}

impl Context {
    /// Builds every resource named by the `descriptor` and activates its default program and
    /// vertex layout.
    ///
    /// The steps run in the order of [BootstrapStep]. If any step fails, every resource that was
    /// already built is destroyed and the error names the step and the resource that failed.
    pub fn bootstrap(
        driver: Rc<dyn Driver>,
        descriptor: &ContextDescriptor,
    ) -> Result<Self, BootstrapError> {
        let framebuffer =
            Framebuffer::new(&driver).at(BootstrapStep::Framebuffer, "framebuffer")?;

        let mut context = Context {
            registry: Registry::new(),
            bindings: Bindings::new(),
            framebuffer,
            driver,
        };

        context.build_vertex_layouts(descriptor)?;
        context.build_programs(descriptor)?;
        context.build_default_resources(descriptor)?;

        if let Some(name) = &descriptor.default_program {
            context
                .set_active::<Program>(name)
                .at(BootstrapStep::Activation, name)?;
        }

        if let Some(name) = &descriptor.default_layout {
            context
                .set_active::<VertexLayout>(name)
                .at(BootstrapStep::Activation, name)?;
        }

        info!(
            "Bootstrapped context with {} vertex layouts and {} programs",
            context.registry.vertex_layouts().len(),
            context.registry.programs().len()
        );

        Ok(context)
    }

    fn build_vertex_layouts(
        &mut self,
        descriptor: &ContextDescriptor,
    ) -> Result<(), BootstrapError> {
        self.registry.reserve::<VertexLayout>(descriptor.layouts.len());

        for layout in &descriptor.layouts {
            let step = BootstrapStep::VertexLayouts;

            let attributes = layout
                .attributes
                .iter()
                .map(|name| {
                    descriptor
                        .attribute(name)
                        .copied()
                        .ok_or_else(|| BootstrapCause::UnknownAttribute(name.clone()))
                })
                .collect::<Result<Vec<VertexAttributeDescriptor>, _>>()
                .at(step, &layout.name)?;

            let vertex_layout =
                VertexLayout::new(&self.driver, &attributes).at(step, &layout.name)?;

            self.insert(layout.name.as_str(), vertex_layout);
        }

        Ok(())
    }

    fn build_programs(&mut self, descriptor: &ContextDescriptor) -> Result<(), BootstrapError> {
        self.registry.reserve::<Program>(descriptor.programs.len());

        for variant in &descriptor.programs {
            let step = BootstrapStep::Programs;

            let vertex_source = descriptor
                .vertex_source(&variant.vertex)
                .ok_or_else(|| BootstrapCause::UnknownVertexSource(variant.vertex.clone()))
                .at(step, &variant.name)?;
            let fragment_source = descriptor
                .fragment_source(&variant.fragment)
                .ok_or_else(|| BootstrapCause::UnknownFragmentSource(variant.fragment.clone()))
                .at(step, &variant.name)?;

            let program = link(&self.driver, vertex_source, fragment_source)
                .at(step, &variant.name)?;

            self.insert(variant.name.as_str(), program);
        }

        Ok(())
    }

    fn build_default_resources(
        &mut self,
        descriptor: &ContextDescriptor,
    ) -> Result<(), BootstrapError> {
        let step = BootstrapStep::DefaultResources;
        let usage = descriptor.default_buffer_usage;

        let buffer = ShaderStorageBuffer::new(&self.driver, usage).at(step, "default")?;
        self.insert("default", buffer);

        let buffer = VertexBuffer::new(&self.driver, usage).at(step, "default")?;
        self.insert("default", buffer);

        let buffer = ElementBuffer::new(&self.driver, usage).at(step, "default")?;
        self.insert("default", buffer);

        let texture = Texture::new(&self.driver).at(step, "default")?;
        self.insert("default", texture);

        Ok(())
    }

    pub fn driver(&self) -> &Rc<dyn Driver> {
        &self.driver
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Borrows the registry, the binding cache and the driver separately, so that a resource
    /// borrowed from the registry can be passed to [Bindings::set_active].
    pub fn split(&mut self) -> (&Registry, &mut Bindings, &dyn Driver) {
        (&self.registry, &mut self.bindings, &*self.driver)
    }

    pub fn get<R>(&self, name: &str) -> Result<&R, UnknownResource>
    where
        R: Catalogued,
    {
        self.registry.get(name)
    }

    /// Returns a mutable reference to the resource, for example to upload data into a buffer.
    ///
    /// The resource may be replaced through the reference, so a program or vertex layout handed
    /// out here is no longer considered current.
    pub fn get_mut<R>(&mut self, name: &str) -> Result<&mut R, UnknownResource>
    where
        R: Catalogued,
    {
        let resource = self.registry.get_mut::<R>(name)?;

        R::release(&mut self.bindings, resource.id());

        Ok(resource)
    }

    /// Stores `resource` under `name`, destroying any resource of the same kind that was stored
    /// under that name before. Returns `true` if a resource was replaced.
    pub fn insert<R, N>(&mut self, name: N, resource: R) -> bool
    where
        R: Catalogued,
        N: Into<String>,
    {
        let name = name.into();

        if let Ok(previous) = self.registry.get::<R>(&name) {
            R::release(&mut self.bindings, previous.id());
        }

        self.registry.insert(name, resource)
    }

    /// Takes the resource stored under `name` out of the context.
    pub fn remove<R>(&mut self, name: &str) -> Option<R>
    where
        R: Catalogued,
    {
        let resource = self.registry.remove::<R>(name)?;

        R::release(&mut self.bindings, resource.id());

        Some(resource)
    }

    pub fn reserve<R>(&mut self, additional: usize)
    where
        R: Catalogued,
    {
        self.registry.reserve::<R>(additional);
    }

    /// Makes the resource stored under `name` current, unless it already is.
    ///
    /// Returns whether a bind call was issued to the driver.
    pub fn set_active<R>(&mut self, name: &str) -> Result<bool, UnknownResource>
    where
        R: Catalogued + Exchangeable,
    {
        let resource = self.registry.get::<R>(name)?;

        Ok(self.bindings.set_active(&*self.driver, resource))
    }

    /// Returns the handle of the current resource of kind `R`.
    pub fn active<R>(&self) -> Option<ObjectId>
    where
        R: Exchangeable,
    {
        self.bindings.active::<R>()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("framebuffer", &self.framebuffer)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        debug!("Dropping context");
    }
}

fn link(
    driver: &Rc<dyn Driver>,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<Program, DriverError> {
    let vertex_shader = VertexShader::compile(driver, vertex_source)?;
    let fragment_shader = FragmentShader::compile(driver, fragment_source)?;

    Program::link(driver, vertex_shader, fragment_shader)
}
