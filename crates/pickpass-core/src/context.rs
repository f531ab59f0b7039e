//! The picking context shared by pickable objects and picking surfaces.
//!
//! The context is the composition root of the picking subsystem. It owns at
//! most one [`PickableRegistry`] and at most one [`MaterialVariantCache`];
//! both can be installed and torn down independently, and a second install
//! while one is active is rejected so the first stays authoritative.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::codec::PickId;
use crate::error::{PickError, Result};
use crate::handle::PickHandle;
use crate::material::{Material, MaterialVariantCache, PassTag};
use crate::registry::PickableRegistry;

/// Shared picking state. Usually held in an `Arc`.
pub struct PickingContext {
    registry: RwLock<Option<PickableRegistry>>,
    variants: Mutex<Option<MaterialVariantCache>>,
}

impl Default for PickingContext {
    fn default() -> Self {
        Self::new(PassTag::default())
    }
}

impl PickingContext {
    /// Creates a context with a registry and a variant cache producing
    /// materials tagged with `tag`.
    pub fn new(tag: PassTag) -> Self {
        Self {
            registry: RwLock::new(Some(PickableRegistry::new())),
            variants: Mutex::new(Some(MaterialVariantCache::new(tag))),
        }
    }

    /// Creates a context with neither a registry nor a variant cache.
    pub fn empty() -> Self {
        Self {
            registry: RwLock::new(None),
            variants: Mutex::new(None),
        }
    }

    /// Convenience for `Arc::new(PickingContext::default())`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ========== Registry ==========

    /// Installs a fresh registry.
    pub fn install_registry(&self) -> Result<()> {
        let mut slot = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            log::warn!("refusing to install a second pickable registry; keeping the active one");
            return Err(PickError::DuplicateRegistry);
        }
        *slot = Some(PickableRegistry::new());
        log::debug!("pickable registry installed");
        Ok(())
    }

    /// Tears down the registry. Safe to call when none is installed.
    pub fn teardown_registry(&self) {
        let previous = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(registry) = previous {
            log::debug!("pickable registry torn down with {} entries", registry.len());
        }
    }

    /// Returns whether a registry is installed.
    pub fn has_registry(&self) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Registers an object with the active registry.
    pub fn register(&self, handle: &Arc<dyn PickHandle>) -> Result<PickId> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .ok_or(PickError::NoRegistry)?
            .register(handle)
    }

    /// Unregisters an object. No-op without a registry.
    pub fn unregister(&self, handle: &dyn PickHandle) {
        if let Some(registry) = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            registry.unregister(handle);
        }
    }

    /// Resolves an id. `None` without a registry.
    pub fn lookup(&self, id: PickId) -> Option<Arc<dyn PickHandle>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()?
            .lookup(id)
    }

    /// Runs `f` with the registry, if one is installed.
    pub fn with_registry<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&PickableRegistry) -> R,
    {
        let guard = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(f)
    }

    // ========== Material variants ==========

    /// Installs a fresh variant cache tagging variants with `tag`.
    pub fn install_variant_cache(&self, tag: PassTag) -> Result<()> {
        let mut slot = self.variants.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            log::warn!("refusing to install a second material variant cache; keeping the active one");
            return Err(PickError::DuplicateVariantCache);
        }
        *slot = Some(MaterialVariantCache::new(tag));
        Ok(())
    }

    /// Tears down the variant cache, releasing every variant. Idempotent.
    pub fn teardown_variant_cache(&self) {
        let previous = self
            .variants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut cache) = previous {
            cache.clear();
        }
    }

    /// Returns whether a variant cache is installed.
    pub fn has_variant_cache(&self) -> bool {
        self.variants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The tag the variant cache stamps onto materials, if a cache is installed.
    pub fn variant_tag(&self) -> Option<PassTag> {
        self.variants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|cache| cache.tag().clone())
    }

    /// Returns the pickable variant of `original`.
    pub fn variant_for(&self, original: &Arc<Material>) -> Result<Arc<Material>> {
        self.with_variant_cache(|cache| cache.get_or_create_variant(original))
    }

    /// Runs `f` with exclusive access to the variant cache.
    pub fn with_variant_cache<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut MaterialVariantCache) -> R,
    {
        let mut guard = self.variants.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_mut().map(f).ok_or(PickError::NoVariantCache)
    }

    /// Tears down both the registry and the variant cache.
    pub fn shutdown(&self) {
        self.teardown_registry();
        self.teardown_variant_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneNode;

    #[test]
    fn test_duplicate_registry_is_rejected() {
        let context = PickingContext::default();
        let node: Arc<dyn PickHandle> = Arc::new(SceneNode::new("kept"));
        let id = context.register(&node).unwrap();

        assert!(matches!(
            context.install_registry(),
            Err(PickError::DuplicateRegistry)
        ));
        // The first registry is still the authoritative one.
        assert!(Arc::ptr_eq(&context.lookup(id).unwrap(), &node));
    }

    #[test]
    fn test_no_registry() {
        let context = PickingContext::empty();
        let node: Arc<dyn PickHandle> = Arc::new(SceneNode::new("orphan"));

        assert!(matches!(context.register(&node), Err(PickError::NoRegistry)));
        assert!(context.lookup(node.instance_id()).is_none());
        context.unregister(node.as_ref());
    }

    #[test]
    fn test_teardown_then_lookup_and_register() {
        let context = PickingContext::default();
        let node: Arc<dyn PickHandle> = Arc::new(SceneNode::new("a"));
        let id = context.register(&node).unwrap();

        context.teardown_registry();
        context.teardown_registry();

        assert!(context.lookup(id).is_none());
        assert!(matches!(context.register(&node), Err(PickError::NoRegistry)));
        context.unregister(node.as_ref());

        context.install_registry().unwrap();
        assert_eq!(context.register(&node).unwrap(), id);
    }

    #[test]
    fn test_variant_cache_lifecycle() {
        let context = PickingContext::empty();
        let clay = Arc::new(Material::new("clay", "lit"));
        assert!(matches!(
            context.variant_for(&clay),
            Err(PickError::NoVariantCache)
        ));

        context.install_variant_cache(PassTag::default()).unwrap();
        assert!(matches!(
            context.install_variant_cache(PassTag::default()),
            Err(PickError::DuplicateVariantCache)
        ));

        let a = context.variant_for(&clay).unwrap();
        let b = context.variant_for(&clay).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        context.shutdown();
        context.shutdown();
        assert!(!context.has_variant_cache());
        assert!(!context.has_registry());
    }
}
