//! Describes the catalogue a [Context](crate::context::Context) is bootstrapped with.
//!
//! [ContextDescriptor::default] produces the standard catalogue: the `position`, `color` and
//! `tex_coord` attributes of [StandardVertex], the `empty`, `Pos`, `PosColor`, `PosTex` and
//! `PosColorTex` vertex layouts, and programs of the same names plus `polyline`, which pairs its
//! own vertex stage with the `Pos` fragment stage.

use bytemuck::{Pod, Zeroable};
use memoffset::offset_of;
use serde_derive::{Deserialize, Serialize};

use crate::resource::{AttributeType, BufferUsage, VertexAttributeDescriptor};

/// The vertex format the standard attributes describe.
#[derive(Clone, Copy, PartialEq, Default, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct StandardVertex {
    pub position: [f32; 2],
    pub color: [u8; 4],
    pub tex_coord: [f32; 2],
}

impl StandardVertex {
    pub fn position() -> VertexAttributeDescriptor {
        VertexAttributeDescriptor {
            component_count: 2,
            component_type: AttributeType::Float,
            offset: offset_of!(StandardVertex, position) as u32,
            normalized: false,
        }
    }

    pub fn color() -> VertexAttributeDescriptor {
        VertexAttributeDescriptor {
            component_count: 4,
            component_type: AttributeType::UnsignedByte,
            offset: offset_of!(StandardVertex, color) as u32,
            normalized: true,
        }
    }

    pub fn tex_coord() -> VertexAttributeDescriptor {
        VertexAttributeDescriptor {
            component_count: 2,
            component_type: AttributeType::Float,
            offset: offset_of!(StandardVertex, tex_coord) as u32,
            normalized: false,
        }
    }
}

/// A vertex attribute that layouts can refer to by name.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NamedAttribute {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: VertexAttributeDescriptor,
}

/// A vertex layout built from a list of named attributes, in location order.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LayoutVariant {
    pub name: String,
    pub attributes: Vec<String>,
}

/// Shader source text that programs can refer to by name.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NamedSource {
    pub name: String,
    pub source: String,
}

/// A program built from a named vertex source and a named fragment source.
///
/// Several programs may name the same fragment source.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ProgramVariant {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
}

/// The catalogue of resources a context is bootstrapped with.
///
/// Build a custom catalogue with [ContextDescriptor::begin]:
///
/// ```
/// use retained_gl::descriptor::{ContextDescriptor, StandardVertex};
///
/// let descriptor = ContextDescriptor::begin()
///     .attribute("position", StandardVertex::position())
///     .layout("Pos", &["position"])
///     .vertex_source("Pos", "void main() {}")
///     .fragment_source("Pos", "void main() {}")
///     .program("Pos", "Pos", "Pos")
///     .activate("Pos", "Pos")
///     .finish();
///
/// assert_eq!(descriptor.layouts.len(), 1);
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ContextDescriptor {
    pub attributes: Vec<NamedAttribute>,
    pub layouts: Vec<LayoutVariant>,
    pub vertex_sources: Vec<NamedSource>,
    pub fragment_sources: Vec<NamedSource>,
    pub programs: Vec<ProgramVariant>,
    /// The usage hint of the `default` buffers.
    #[serde(default)]
    pub default_buffer_usage: BufferUsage,
    /// The program that is made current once everything has been built.
    #[serde(default)]
    pub default_program: Option<String>,
    /// The vertex layout that is made current once everything has been built.
    #[serde(default)]
    pub default_layout: Option<String>,
}

impl ContextDescriptor {
    /// Starts building a descriptor with an empty catalogue.
    pub fn begin() -> ContextDescriptorBuilder {
        ContextDescriptorBuilder {
            descriptor: ContextDescriptor {
                attributes: Vec::new(),
                layouts: Vec::new(),
                vertex_sources: Vec::new(),
                fragment_sources: Vec::new(),
                programs: Vec::new(),
                default_buffer_usage: BufferUsage::default(),
                default_program: None,
                default_layout: None,
            },
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttributeDescriptor> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.descriptor)
    }

    pub fn vertex_source(&self, name: &str) -> Option<&str> {
        find_source(&self.vertex_sources, name)
    }

    pub fn fragment_source(&self, name: &str) -> Option<&str> {
        find_source(&self.fragment_sources, name)
    }
}

fn find_source<'a>(sources: &'a [NamedSource], name: &str) -> Option<&'a str> {
    sources
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.source.as_str())
}

impl Default for ContextDescriptor {
    fn default() -> Self {
        ContextDescriptor::begin()
            .attribute("position", StandardVertex::position())
            .attribute("color", StandardVertex::color())
            .attribute("tex_coord", StandardVertex::tex_coord())
            .layout("empty", &[])
            .layout("Pos", &["position"])
            .layout("PosColor", &["position", "color"])
            .layout("PosTex", &["position", "tex_coord"])
            .layout("PosColorTex", &["position", "color", "tex_coord"])
            .vertex_source("Pos", include_str!("shaders/Pos.vert.glsl"))
            .vertex_source("PosColor", include_str!("shaders/PosColor.vert.glsl"))
            .vertex_source("PosTex", include_str!("shaders/PosTex.vert.glsl"))
            .vertex_source("PosColorTex", include_str!("shaders/PosColorTex.vert.glsl"))
            .vertex_source("polyline", include_str!("shaders/polyline.vert.glsl"))
            .fragment_source("Pos", include_str!("shaders/Pos.frag.glsl"))
            .fragment_source("PosColor", include_str!("shaders/PosColor.frag.glsl"))
            .fragment_source("PosTex", include_str!("shaders/PosTex.frag.glsl"))
            .fragment_source("PosColorTex", include_str!("shaders/PosColorTex.frag.glsl"))
            .program("Pos", "Pos", "Pos")
            .program("PosColor", "PosColor", "PosColor")
            .program("PosTex", "PosTex", "PosTex")
            .program("PosColorTex", "PosColorTex", "PosColorTex")
            .program("polyline", "polyline", "Pos")
            .activate("Pos", "Pos")
            .finish()
    }
}

/// Builds a [ContextDescriptor], see [ContextDescriptor::begin].
///
/// Adding an entry under a name that is already taken replaces the earlier entry in place.
pub struct ContextDescriptorBuilder {
    descriptor: ContextDescriptor,
}

impl ContextDescriptorBuilder {
    pub fn attribute(mut self, name: &str, descriptor: VertexAttributeDescriptor) -> Self {
        upsert(
            &mut self.descriptor.attributes,
            NamedAttribute {
                name: name.to_string(),
                descriptor,
            },
            |a| &a.name,
        );

        self
    }

    pub fn layout(mut self, name: &str, attributes: &[&str]) -> Self {
        upsert(
            &mut self.descriptor.layouts,
            LayoutVariant {
                name: name.to_string(),
                attributes: attributes.iter().map(|a| a.to_string()).collect(),
            },
            |l| &l.name,
        );

        self
    }

    pub fn vertex_source(mut self, name: &str, source: &str) -> Self {
        upsert(
            &mut self.descriptor.vertex_sources,
            NamedSource {
                name: name.to_string(),
                source: source.to_string(),
            },
            |s| &s.name,
        );

        self
    }

    pub fn fragment_source(mut self, name: &str, source: &str) -> Self {
        upsert(
            &mut self.descriptor.fragment_sources,
            NamedSource {
                name: name.to_string(),
                source: source.to_string(),
            },
            |s| &s.name,
        );

        self
    }

    pub fn program(mut self, name: &str, vertex: &str, fragment: &str) -> Self {
        upsert(
            &mut self.descriptor.programs,
            ProgramVariant {
                name: name.to_string(),
                vertex: vertex.to_string(),
                fragment: fragment.to_string(),
            },
            |p| &p.name,
        );

        self
    }

    pub fn default_buffer_usage(mut self, usage: BufferUsage) -> Self {
        self.descriptor.default_buffer_usage = usage;

        self
    }

    /// Sets the program and vertex layout that are made current at the end of the bootstrap.
    pub fn activate(mut self, program: &str, layout: &str) -> Self {
        self.descriptor.default_program = Some(program.to_string());
        self.descriptor.default_layout = Some(layout.to_string());

        self
    }

    pub fn finish(self) -> ContextDescriptor {
        self.descriptor
    }
}

fn upsert<T, F>(entries: &mut Vec<T>, entry: T, name: F)
where
    F: Fn(&T) -> &String,
{
    match entries.iter().position(|e| name(e) == name(&entry)) {
        Some(position) => entries[position] = entry,
        None => entries.push(entry),
    }
}
