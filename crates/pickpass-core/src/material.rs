//! Render-state descriptors and the pickable variant cache.
//!
//! A [`Material`] is the backend-agnostic description of how a surface is
//! shaded. The id pass is selected through a [`PassTag`] attached to the
//! material: only surfaces whose material carries the tag are drawn with
//! their id color, everything else ends up as background.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Selector routing a material into a replacement pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassTag {
    /// Tag name looked up on the material.
    pub key: String,
    /// Value the tag must have.
    pub value: String,
}

impl PassTag {
    /// Creates a new tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for PassTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl Default for PassTag {
    fn default() -> Self {
        Self::new("PickingPass", "Id")
    }
}

/// A render-state descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Name of the shader used for normal rendering.
    pub shader: String,
    /// Base color used for normal rendering.
    pub base_color: [f32; 4],
    /// Free-form tags read by render passes.
    pub tags: BTreeMap<String, String>,
}

impl Material {
    /// Creates a new untagged material.
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            base_color: [1.0; 4],
            tags: BTreeMap::new(),
        }
    }

    /// Sets the base color.
    #[must_use]
    pub fn with_base_color(mut self, color: [f32; 4]) -> Self {
        self.base_color = color;
        self
    }

    /// Sets a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Returns a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns true if this material is drawn by the pass `tag` selects.
    pub fn matches(&self, tag: &PassTag) -> bool {
        self.tag(&tag.key) == Some(tag.value.as_str())
    }
}

struct VariantEntry {
    // Held so the key address cannot be reused while the entry exists.
    original: Arc<Material>,
    variant: Arc<Material>,
}

/// Cache of pickable material variants.
///
/// Each distinct original material (by `Arc` identity) gets exactly one
/// duplicate tagged for the id pass, shared by every surface using that
/// original.
pub struct MaterialVariantCache {
    tag: PassTag,
    entries: HashMap<usize, VariantEntry>,
}

impl MaterialVariantCache {
    /// Creates an empty cache producing variants tagged with `tag`.
    pub fn new(tag: PassTag) -> Self {
        Self {
            tag,
            entries: HashMap::new(),
        }
    }

    /// The tag applied to every variant.
    pub fn tag(&self) -> &PassTag {
        &self.tag
    }

    /// Returns the pickable variant of `original`, creating it on first use.
    ///
    /// A material that already carries the tag is returned as is, so
    /// re-tagging a surface never produces a variant of a variant.
    pub fn get_or_create_variant(&mut self, original: &Arc<Material>) -> Arc<Material> {
        if original.matches(&self.tag) {
            return Arc::clone(original);
        }

        let key = Arc::as_ptr(original) as usize;
        let tag = &self.tag;
        let entry = self.entries.entry(key).or_insert_with(|| {
            let mut variant = Material::clone(original);
            variant.name = format!("{} (pickable)", original.name);
            variant.tags.insert(tag.key.clone(), tag.value.clone());
            log::debug!("created pickable variant of material '{}'", original.name);
            VariantEntry {
                original: Arc::clone(original),
                variant: Arc::new(variant),
            }
        });
        debug_assert!(Arc::ptr_eq(&entry.original, original));
        Arc::clone(&entry.variant)
    }

    /// Number of cached variants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no variant has been created.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Releases every cached variant. Safe to call any number of times.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("releasing {} pickable material variants", self.entries.len());
        }
        self.entries.clear();
    }
}

impl Default for MaterialVariantCache {
    fn default() -> Self {
        Self::new(PassTag::default())
    }
}

impl Drop for MaterialVariantCache {
    fn drop(&mut self) {
        self.clear();
    }
}
