//! Scene objects taking part in picking.

use std::sync::Arc;

use crate::codec::{self, PickId};
use crate::context::PickingContext;
use crate::error::Result;
use crate::handle::{PickHandle, ID_COLOR_PROPERTY};

/// Lifecycle state of a [`PickableObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickableState {
    /// Not registered.
    #[default]
    Inactive,
    /// Enabled, but the object has no renderable surfaces.
    Idle,
    /// Registered under the given id, surfaces tagged.
    Active(PickId),
    /// Registration was refused; the object does not take part in picking.
    Disabled,
}

/// Makes a scene object pickable.
///
/// Enabling registers the object and tags each of its surfaces with the id
/// color and the pickable material variant. Disabling (or dropping)
/// unregisters it. Surface tagging is left in place on disable; it is
/// harmless once the id no longer resolves and is re-applied on enable.
pub struct PickableObject {
    handle: Arc<dyn PickHandle>,
    context: Arc<PickingContext>,
    state: PickableState,
}

impl PickableObject {
    /// Wraps `handle`. The object starts inactive.
    pub fn new(handle: Arc<dyn PickHandle>, context: Arc<PickingContext>) -> Self {
        Self {
            handle,
            context,
            state: PickableState::Inactive,
        }
    }

    /// Wraps `handle` and enables it right away.
    pub fn enabled(handle: Arc<dyn PickHandle>, context: Arc<PickingContext>) -> Result<Self> {
        let mut object = Self::new(handle, context);
        object.enable()?;
        Ok(object)
    }

    /// The wrapped object.
    pub fn handle(&self) -> &Arc<dyn PickHandle> {
        &self.handle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PickableState {
        self.state
    }

    /// The pick id while active.
    pub fn id(&self) -> Option<PickId> {
        match self.state {
            PickableState::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Registers the object and tags its surfaces.
    ///
    /// On failure the object is left [`PickableState::Disabled`] and the
    /// error is returned; call `enable` again once the context is ready.
    pub fn enable(&mut self) -> Result<PickableState> {
        if let PickableState::Active(_) = self.state {
            return Ok(self.state);
        }

        let mut surface_count = 0usize;
        self.handle.visit_surfaces(&mut |_| surface_count += 1);
        if surface_count == 0 {
            log::debug!("pickable '{}' has no surfaces, staying idle", self.handle.name());
            self.state = PickableState::Idle;
            return Ok(self.state);
        }

        let id = match self.context.register(&self.handle) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("disabling pickable '{}': {err}", self.handle.name());
                self.state = PickableState::Disabled;
                return Err(err);
            }
        };

        let id_color = codec::encode(id).to_unorm();
        let handle = &self.handle;
        let tagged = self.context.with_variant_cache(|cache| {
            handle.visit_surfaces(&mut |surface| {
                let mut block = surface.property_block();
                block.set_color(ID_COLOR_PROPERTY, id_color);
                surface.set_property_block(block);

                let variant = cache.get_or_create_variant(&surface.material());
                surface.set_material(variant);
            });
        });
        if let Err(err) = tagged {
            log::warn!("disabling pickable '{}': {err}", self.handle.name());
            self.context.unregister(self.handle.as_ref());
            self.state = PickableState::Disabled;
            return Err(err);
        }

        log::debug!(
            "pickable '{}' active as id {id} with {surface_count} surfaces",
            self.handle.name()
        );
        self.state = PickableState::Active(id);
        Ok(self.state)
    }

    /// Unregisters the object. Safe to call in any state.
    pub fn disable(&mut self) {
        if let PickableState::Active(_) = self.state {
            self.context.unregister(self.handle.as_ref());
        }
        self.state = PickableState::Inactive;
    }
}

impl Drop for PickableObject {
    fn drop(&mut self) {
        self.disable();
    }
}
