//! Named catalogues of GPU resources, one per resource kind.

use std::ops::Index;

use failure::Fail;
use fnv::FnvHashMap;
use log::warn;

use crate::binding::Bindings;
use crate::driver::ObjectId;
use crate::resource::{
    ElementBuffer, Program, Resource, ResourceKind, ShaderStorageBuffer, Texture, VertexBuffer,
    VertexLayout,
};

/// Error returned when a resource is looked up by a name that is not in the catalogue.
#[derive(Clone, PartialEq, Eq, Debug, Fail)]
#[fail(display = "no {} named `{}`", kind, name)]
pub struct UnknownResource {
    pub kind: ResourceKind,
    pub name: String,
}

/// An insertion-ordered mapping from names to resources of kind `R`.
///
/// Names are unique. The catalogue owns its resources: a resource is destroyed when it is
/// replaced, when the catalogue is dropped, or, if removed with [remove](Catalogue::remove), when
/// the caller drops it.
pub struct Catalogue<R> {
    entries: Vec<(String, R)>,
    index: FnvHashMap<String, usize>,
}

impl<R> Catalogue<R>
where
    R: Resource,
{
    pub fn new() -> Self {
        Catalogue {
            entries: Vec::new(),
            index: FnvHashMap::default(),
        }
    }

    /// Stores `resource` under `name`.
    ///
    /// If the name is already taken, the resource stored under it is destroyed before the new one
    /// takes its place; the entry keeps its original position. Returns `true` in that case.
    pub fn insert<N>(&mut self, name: N, resource: R) -> bool
    where
        N: Into<String>,
    {
        let name = name.into();

        if let Some(&position) = self.index.get(&name) {
            warn!(
                "Replacing {} `{}` ({} -> {})",
                R::KIND,
                name,
                self.entries[position].1.id(),
                resource.id()
            );

            // Assigning drops the previous resource, which destroys its GPU object.
            self.entries[position].1 = resource;

            true
        } else {
            self.index.insert(name.clone(), self.entries.len());
            self.entries.push((name, resource));

            false
        }
    }

    pub fn get(&self, name: &str) -> Result<&R, UnknownResource> {
        match self.index.get(name).copied() {
            Some(position) => Ok(&self.entries[position].1),
            None => Err(self.unknown(name)),
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut R, UnknownResource> {
        match self.index.get(name).copied() {
            Some(position) => Ok(&mut self.entries[position].1),
            None => Err(self.unknown(name)),
        }
    }

    /// Removes the resource stored under `name` and hands ownership of it to the caller.
    pub fn remove(&mut self, name: &str) -> Option<R> {
        let position = self.index.remove(name)?;
        let (_, resource) = self.entries.remove(position);

        for index in self.index.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }

        Some(resource)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Reserves capacity for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
        self.index.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.entries
            .iter()
            .map(|(name, resource)| (name.as_str(), resource))
    }

    fn unknown(&self, name: &str) -> UnknownResource {
        UnknownResource {
            kind: R::KIND,
            name: name.to_string(),
        }
    }
}

impl<R> Default for Catalogue<R>
where
    R: Resource,
{
    fn default() -> Self {
        Catalogue::new()
    }
}

impl<'a, R> Index<&'a str> for Catalogue<R>
where
    R: Resource,
{
    type Output = R;

    fn index(&self, name: &'a str) -> &R {
        match self.get(name) {
            Ok(resource) => resource,
            Err(error) => panic!("{}", error),
        }
    }
}

/// A resource kind that has its own [Catalogue] in the [Registry].
pub trait Catalogued: Resource + Sized {
    fn catalogue(registry: &Registry) -> &Catalogue<Self>;

    fn catalogue_mut(registry: &mut Registry) -> &mut Catalogue<Self>;

    /// Called before a resource of this kind with the handle `id` leaves a context's registry.
    fn release(_bindings: &mut Bindings, _id: ObjectId) {}
}

macro_rules! catalogued {
    ($resource:ty, $field:ident) => {
        impl Catalogued for $resource {
            fn catalogue(registry: &Registry) -> &Catalogue<Self> {
                &registry.$field
            }

            fn catalogue_mut(registry: &mut Registry) -> &mut Catalogue<Self> {
                &mut registry.$field
            }
        }
    };
    ($resource:ty, $field:ident, exchangeable) => {
        impl Catalogued for $resource {
            fn catalogue(registry: &Registry) -> &Catalogue<Self> {
                &registry.$field
            }

            fn catalogue_mut(registry: &mut Registry) -> &mut Catalogue<Self> {
                &mut registry.$field
            }

            fn release(bindings: &mut Bindings, id: ObjectId) {
                bindings.forget::<Self>(id);
            }
        }
    };
}

catalogued!(Program, programs, exchangeable);
catalogued!(VertexLayout, vertex_layouts, exchangeable);
catalogued!(VertexBuffer, vertex_buffers);
catalogued!(ElementBuffer, element_buffers);
catalogued!(ShaderStorageBuffer, shader_storage_buffers);
catalogued!(Texture, textures);

/// One [Catalogue] per catalogued resource kind.
#[derive(Default)]
pub struct Registry {
    programs: Catalogue<Program>,
    vertex_layouts: Catalogue<VertexLayout>,
    vertex_buffers: Catalogue<VertexBuffer>,
    element_buffers: Catalogue<ElementBuffer>,
    shader_storage_buffers: Catalogue<ShaderStorageBuffer>,
    textures: Catalogue<Texture>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn catalogue<R>(&self) -> &Catalogue<R>
    where
        R: Catalogued,
    {
        R::catalogue(self)
    }

    pub fn catalogue_mut<R>(&mut self) -> &mut Catalogue<R>
    where
        R: Catalogued,
    {
        R::catalogue_mut(self)
    }

    /// See [Catalogue::insert].
    pub fn insert<R, N>(&mut self, name: N, resource: R) -> bool
    where
        R: Catalogued,
        N: Into<String>,
    {
        R::catalogue_mut(self).insert(name, resource)
    }

    pub fn get<R>(&self, name: &str) -> Result<&R, UnknownResource>
    where
        R: Catalogued,
    {
        R::catalogue(self).get(name)
    }

    pub fn get_mut<R>(&mut self, name: &str) -> Result<&mut R, UnknownResource>
    where
        R: Catalogued,
    {
        R::catalogue_mut(self).get_mut(name)
    }

    pub fn remove<R>(&mut self, name: &str) -> Option<R>
    where
        R: Catalogued,
    {
        R::catalogue_mut(self).remove(name)
    }

    pub fn contains<R>(&self, name: &str) -> bool
    where
        R: Catalogued,
    {
        R::catalogue(self).contains(name)
    }

    pub fn reserve<R>(&mut self, additional: usize)
    where
        R: Catalogued,
    {
        R::catalogue_mut(self).reserve(additional)
    }

    pub fn programs(&self) -> &Catalogue<Program> {
        &self.programs
    }

    pub fn vertex_layouts(&self) -> &Catalogue<VertexLayout> {
        &self.vertex_layouts
    }

    pub fn vertex_buffers(&self) -> &Catalogue<VertexBuffer> {
        &self.vertex_buffers
    }

    pub fn element_buffers(&self) -> &Catalogue<ElementBuffer> {
        &self.element_buffers
    }

    pub fn shader_storage_buffers(&self) -> &Catalogue<ShaderStorageBuffer> {
        &self.shader_storage_buffers
    }

    pub fn textures(&self) -> &Catalogue<Texture> {
        &self.textures
    }
}
