//! A minimal scene graph implementing the pickable capabilities.
//!
//! Applications with their own scene representation implement
//! [`PickHandle`] and [`RenderSurface`] directly; this module is a ready-made
//! implementation for simple scenes, tools and tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::handle::{PickHandle, PropertyBlock, RenderSurface};
use crate::material::Material;

static NEXT_INSTANCE_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates a process-unique, non-zero instance id.
pub fn next_instance_id() -> u32 {
    loop {
        let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
    }
}

/// A renderable surface with a material and per-instance overrides.
pub struct Surface {
    material: RwLock<Arc<Material>>,
    properties: RwLock<PropertyBlock>,
}

impl Surface {
    /// Creates a surface using `material`.
    pub fn new(material: Arc<Material>) -> Self {
        Self {
            material: RwLock::new(material),
            properties: RwLock::new(PropertyBlock::new()),
        }
    }
}

impl RenderSurface for Surface {
    fn property_block(&self) -> PropertyBlock {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_property_block(&self, block: PropertyBlock) {
        *self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner) = block;
    }

    fn material(&self) -> Arc<Material> {
        Arc::clone(&*self.material.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_material(&self, material: Arc<Material>) {
        *self.material.write().unwrap_or_else(PoisonError::into_inner) = material;
    }
}

/// A scene node owning surfaces and child nodes.
pub struct SceneNode {
    instance_id: u32,
    name: String,
    surfaces: Vec<Arc<Surface>>,
    children: RwLock<Vec<Arc<SceneNode>>>,
}

impl SceneNode {
    /// Creates an empty node with a freshly allocated instance id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_instance_id(next_instance_id(), name)
    }

    /// Creates an empty node with a caller-chosen instance id.
    ///
    /// The caller is responsible for keeping ids unique among live nodes.
    pub fn with_instance_id(instance_id: u32, name: impl Into<String>) -> Self {
        Self {
            instance_id,
            name: name.into(),
            surfaces: Vec::new(),
            children: RwLock::new(Vec::new()),
        }
    }

    /// Adds a surface. The renderer usually keeps a second reference to it.
    #[must_use]
    pub fn with_surface(mut self, surface: impl Into<Arc<Surface>>) -> Self {
        self.surfaces.push(surface.into());
        self
    }

    /// The node's own surfaces, excluding descendants.
    pub fn surfaces(&self) -> &[Arc<Surface>] {
        &self.surfaces
    }

    /// Attaches a child node.
    pub fn add_child(&self, child: Arc<SceneNode>) {
        self.children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(child);
    }

    /// Returns the child nodes.
    pub fn children(&self) -> Vec<Arc<SceneNode>> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PickHandle for SceneNode {
    fn instance_id(&self) -> u32 {
        self.instance_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn visit_surfaces(&self, visitor: &mut dyn FnMut(&dyn RenderSurface)) {
        for surface in &self.surfaces {
            visitor(surface.as_ref());
        }
        for child in self.children() {
            child.visit_surfaces(visitor);
        }
    }
}
