//! Core abstractions for pickpass.
//!
//! This crate provides the backend-agnostic half of collider-free picking:
//! - [`codec`]: id <-> color encoding
//! - [`PickableRegistry`] resolving ids back to objects
//! - [`MaterialVariantCache`] sharing one pickable material per original
//! - [`PickableObject`] lifecycle for scene objects
//! - [`PickingSurface`] driving the id pass and readback for a viewport
//! - [`PickingBackend`] describing what a renderer has to provide

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod codec;
pub mod context;
pub mod error;
pub mod handle;
pub mod material;
pub mod options;
pub mod pickable;
pub mod registry;
pub mod scene;
pub mod surface;

pub use backend::{
    ColorEncoding, IdPassSettings, PickingBackend, Readback, ReadbackStatus, RenderPath,
    TargetFormat, TextureFilter,
};
pub use codec::{decode, encode, IdColor, PickId, NO_PICK_ID};
pub use context::PickingContext;
pub use error::{PickError, Result};
pub use handle::{PickHandle, PropertyBlock, PropertyValue, RenderSurface, ID_COLOR_PROPERTY};
pub use material::{Material, MaterialVariantCache, PassTag};
pub use options::{PickingOptions, DOWNSCALE_RANGE};
pub use pickable::{PickableObject, PickableState};
pub use registry::PickableRegistry;
pub use scene::{SceneNode, Surface};
pub use surface::{HostFrame, PickingSurface};

// Re-export glam types for convenience
pub use glam::{UVec2, Vec2};
