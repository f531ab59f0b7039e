//! wgpu backend for pickpass.
//!
//! This crate implements [`pickpass_core::PickingBackend`] on wgpu:
//! - [`IdTarget`]: the off-screen RGBA8 unorm id texture and its depth buffer
//! - [`IdPassPipeline`]: flat-color pipeline that writes each surface's id
//! - [`TextureReadback`]: copy to a mappable buffer, polled without blocking
//! - [`WgpuPickingBackend`]: ties them to an [`IdPassScene`]

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Index counts and texel sizes fit comfortably in u32
#![allow(clippy::cast_possible_truncation)]

pub mod backend;
pub mod error;
pub mod pipeline;
pub mod readback;
pub mod target;

pub use backend::{
    clear_color_of, HeadlessGpu, IdDrawContext, IdMesh, IdMeshScene, IdPassScene, ViewSettings,
    WgpuPickingBackend,
};
pub use error::{RenderError, RenderResult};
pub use pipeline::{IdCameraUniforms, IdDrawUniforms, IdPassPipeline};
pub use readback::{padded_bytes_per_row, strip_row_padding, TextureReadback};
pub use target::{target_format_of, IdTarget, ID_DEPTH_FORMAT, ID_TARGET_FORMAT};
