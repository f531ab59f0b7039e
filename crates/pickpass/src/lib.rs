//! pickpass: collider-free object picking.
//!
//! Pickable objects are rendered into a small off-screen target with their
//! identity encoded as a flat color. The target is copied back to the host
//! without stalling the frame, and screen positions are resolved to objects
//! by decoding the texel underneath.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pickpass::*;
//!
//! fn main() -> Result<()> {
//!     init();
//!
//!     let system = PickingSystem::new(PickingOptions::default())?;
//!
//!     let material = Arc::new(Material::new("lit", "standard"));
//!     let node = Arc::new(SceneNode::new("cube").with_surface(Surface::new(material)));
//!     let _cube = system.make_pickable(node)?;
//!
//!     let mut backend = headless_backend(IdMeshScene::new())?;
//!     let mut surface = system.create_surface::<WgpuPickingBackend<IdMeshScene>>()?;
//!
//!     // Once per frame:
//!     surface.frame(&mut backend, UVec2::new(800, 600))?;
//!     if let Some(hit) = surface.pick_at(Vec2::new(400.0, 300.0)) {
//!         println!("picked {}", hit.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`pickpass_core`] holds the backend-agnostic parts: id codec, registry,
//!   material variant cache, pickable lifecycle and the picking surface.
//! - [`pickpass_render`] implements the render side on wgpu.
//! - [`PickingSystem`] wires one [`PickingContext`] to objects and surfaces.

mod system;

pub use pickpass_core::{
    backend::{
        ColorEncoding, IdPassSettings, PickingBackend, Readback, ReadbackStatus, RenderPath,
        TargetFormat, TextureFilter,
    },
    codec::{decode, encode, IdColor, PickId, NO_PICK_ID},
    context::PickingContext,
    error::{PickError, Result},
    handle::{PickHandle, PropertyBlock, PropertyValue, RenderSurface, ID_COLOR_PROPERTY},
    material::{Material, MaterialVariantCache, PassTag},
    options::{PickingOptions, DOWNSCALE_RANGE},
    pickable::{PickableObject, PickableState},
    registry::PickableRegistry,
    scene::{SceneNode, Surface},
    surface::{HostFrame, PickingSurface},
};

pub use pickpass_render::{
    HeadlessGpu, IdDrawContext, IdMesh, IdMeshScene, IdPassScene, IdTarget, RenderError,
    TextureReadback, ViewSettings, WgpuPickingBackend,
};

pub use glam::{Mat4, UVec2, Vec2, Vec3};

pub use system::PickingSystem;

/// Initializes logging.
///
/// Safe to call more than once; later calls leave the existing logger in place.
pub fn init() {
    let _ = env_logger::try_init();
    log::info!("pickpass initialized");
}

/// Creates a wgpu backend on a headless device, blocking until it is ready.
pub fn headless_backend<S: IdPassScene>(scene: S) -> Result<WgpuPickingBackend<S>> {
    let gpu = pollster::block_on(HeadlessGpu::new())?;
    Ok(WgpuPickingBackend::from_headless(gpu, scene))
}
