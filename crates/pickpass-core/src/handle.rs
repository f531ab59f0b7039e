//! Capabilities required of anything that can be picked.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::IdColor;
use crate::material::Material;

/// Name of the per-instance color override carrying the id color.
pub const ID_COLOR_PROPERTY: &str = "_IdColor";

/// A single per-instance override value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    /// A scalar.
    Float(f32),
    /// An RGBA color with channels in `0.0..=1.0`.
    Color([f32; 4]),
    /// A four-component vector.
    Vector([f32; 4]),
}

impl PropertyValue {
    /// Interprets a color override as an id color.
    ///
    /// Channels are rounded the way an 8-bit unorm target stores them.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_id_color(&self) -> Option<IdColor> {
        match self {
            Self::Color(c) => Some(IdColor(
                c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
            )),
            _ => None,
        }
    }
}

/// Per-instance overrides applied on top of a surface's material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBlock {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyBlock {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a color override.
    pub fn set_color(&mut self, name: impl Into<String>, color: [f32; 4]) {
        self.values.insert(name.into(), PropertyValue::Color(color));
    }

    /// Sets a scalar override.
    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.values.insert(name.into(), PropertyValue::Float(value));
    }

    /// Sets a vector override.
    pub fn set_vector(&mut self, name: impl Into<String>, value: [f32; 4]) {
        self.values.insert(name.into(), PropertyValue::Vector(value));
    }

    /// Returns an override by name.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Returns the id color override, if this block carries one.
    pub fn id_color(&self) -> Option<IdColor> {
        self.get(ID_COLOR_PROPERTY)?.as_id_color()
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the block has no overrides.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A renderable surface of a pickable object.
///
/// Methods take `&self`: surfaces are shared with the renderer, so
/// implementations use interior mutability.
pub trait RenderSurface {
    /// Returns a copy of the current per-instance overrides.
    fn property_block(&self) -> PropertyBlock;

    /// Replaces the per-instance overrides.
    fn set_property_block(&self, block: PropertyBlock);

    /// Returns the current material.
    fn material(&self) -> Arc<Material>;

    /// Replaces the material.
    fn set_material(&self, material: Arc<Material>);
}

/// An object that can be registered for picking.
pub trait PickHandle: Send + Sync {
    /// Stable id, unique among live objects and never zero.
    fn instance_id(&self) -> u32;

    /// Human readable name, used for logging.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Visits this object's renderable surfaces, including those of its
    /// descendants.
    fn visit_surfaces(&self, visitor: &mut dyn FnMut(&dyn RenderSurface));
}
