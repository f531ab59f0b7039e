//! Composition root tying objects and surfaces to one picking context.

use std::sync::Arc;

use pickpass_core::{
    PickHandle, PickableObject, PickingBackend, PickingContext, PickingOptions, PickingSurface,
    Result,
};

/// Owns a [`PickingContext`] and hands it to everything it creates.
///
/// Objects and surfaces keep the context alive through their own `Arc`, so
/// they may outlive the system. [`PickingSystem::shutdown`] tears down the
/// registry and variant cache; anything still holding the context then
/// degrades to "nothing picked".
pub struct PickingSystem {
    context: Arc<PickingContext>,
    options: PickingOptions,
}

impl PickingSystem {
    /// Validates `options` and installs a registry and variant cache for
    /// `options.pass_tag`.
    pub fn new(options: PickingOptions) -> Result<Self> {
        options.validate()?;
        let context = Arc::new(PickingContext::new(options.pass_tag.clone()));
        log::debug!(
            "picking system ready (downscale {}, tag {}={})",
            options.downscale,
            options.pass_tag.key,
            options.pass_tag.value
        );
        Ok(Self { context, options })
    }

    /// Builds a system from JSON options.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(PickingOptions::from_json(json)?)
    }

    /// The shared context.
    pub fn context(&self) -> &Arc<PickingContext> {
        &self.context
    }

    /// The options the system was built with.
    pub fn options(&self) -> &PickingOptions {
        &self.options
    }

    /// Wraps `handle` and enables it.
    pub fn make_pickable(&self, handle: Arc<dyn PickHandle>) -> Result<PickableObject> {
        PickableObject::enabled(handle, Arc::clone(&self.context))
    }

    /// Creates a picking surface for one viewport.
    pub fn create_surface<B: PickingBackend>(&self) -> Result<PickingSurface<B>> {
        PickingSurface::new(Arc::clone(&self.context), self.options.clone())
    }

    /// Tears down the registry and the variant cache.
    pub fn shutdown(&self) {
        self.context.shutdown();
    }
}

impl Drop for PickingSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
