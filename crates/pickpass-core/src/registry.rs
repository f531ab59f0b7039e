//! Registry resolving decoded pick ids back to live objects.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::codec::{PickId, NO_PICK_ID};
use crate::error::{PickError, Result};
use crate::handle::PickHandle;

struct Entry {
    handle: Weak<dyn PickHandle>,
    /// Registrations of the same object not yet matched by an unregister.
    holders: usize,
}

impl Entry {
    fn is_same(&self, handle: &dyn PickHandle) -> bool {
        std::ptr::addr_eq(self.handle.as_ptr(), std::ptr::from_ref(handle))
    }
}

/// Map from pick id to the object that owns it.
///
/// The registry never keeps an object alive: entries are weak, and an entry
/// whose object has been dropped resolves to `None`. Registrations of one
/// object are counted, so the entry stays until every registration has been
/// undone.
#[derive(Default)]
pub struct PickableRegistry {
    entries: HashMap<PickId, Entry>,
}

impl PickableRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object and returns its pick id.
    ///
    /// The id is the object's instance id. Registering an object that is
    /// already present adds a registration to the existing entry. An entry
    /// left behind by a dropped object is replaced. A live entry owned by a
    /// different object is kept and the call fails with [`PickError::IdInUse`].
    pub fn register(&mut self, handle: &Arc<dyn PickHandle>) -> Result<PickId> {
        let id = handle.instance_id();
        if id == NO_PICK_ID {
            return Err(PickError::ReservedId);
        }

        match self.entries.get_mut(&id) {
            Some(entry) if entry.handle.strong_count() > 0 => {
                if !entry.is_same(handle.as_ref()) {
                    log::warn!(
                        "pickable '{}' reports id {id}, which belongs to another live object",
                        handle.name()
                    );
                    return Err(PickError::IdInUse(id));
                }
                entry.holders += 1;
            }
            _ => {
                self.entries.insert(
                    id,
                    Entry {
                        handle: Arc::downgrade(handle),
                        holders: 1,
                    },
                );
                log::debug!("registered pickable '{}' as id {id}", handle.name());
            }
        }
        Ok(id)
    }

    /// Undoes one registration of `handle`.
    ///
    /// The entry is removed once its last registration is undone. Entries
    /// owned by a different object with the same instance id are left alone.
    pub fn unregister(&mut self, handle: &dyn PickHandle) {
        let id = handle.instance_id();
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if !entry.is_same(handle) {
            return;
        }
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders == 0 {
            self.entries.remove(&id);
            log::debug!("unregistered pickable '{}' (id {id})", handle.name());
        }
    }

    /// Resolves an id to its object.
    ///
    /// Returns `None` for the background id, unknown ids and dropped objects.
    pub fn lookup(&self, id: PickId) -> Option<Arc<dyn PickHandle>> {
        if id == NO_PICK_ID {
            return None;
        }
        self.entries.get(&id)?.handle.upgrade()
    }

    /// Checks if an id is registered and its object still alive.
    pub fn contains(&self, id: PickId) -> bool {
        self.lookup(id).is_some()
    }

    /// Drops entries whose object no longer exists. Returns how many were removed.
    pub fn prune_dead(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.handle.strong_count() > 0);
        before - self.entries.len()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
