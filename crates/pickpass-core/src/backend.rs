//! Rendering capabilities consumed by the picking surface.
//!
//! The picking surface does not talk to a graphics API directly. A backend
//! creates the off-screen id target, renders the replacement pass into it
//! and copies it back to host memory. `pickpass-render` provides the wgpu
//! implementation.

use glam::UVec2;

use crate::codec::IdColor;
use crate::error::{PickError, Result};
use crate::material::PassTag;

/// How stored color values relate to the values a shader writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEncoding {
    /// Values are stored as written.
    Linear,
    /// Values are gamma encoded on store.
    Srgb,
}

/// Pixel format of an id target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    /// Number of color channels.
    pub channels: u8,
    /// Bits per channel.
    pub bits_per_channel: u8,
    /// Whether channels are normalized integers (unorm).
    pub normalized: bool,
    /// Color encoding applied on store.
    pub encoding: ColorEncoding,
}

impl TargetFormat {
    /// Four 8-bit linear unorm channels, the format ids are designed for.
    pub const RGBA8_UNORM: Self = Self {
        channels: 4,
        bits_per_channel: 8,
        normalized: true,
        encoding: ColorEncoding::Linear,
    };

    /// Four 8-bit sRGB channels. Not usable for ids.
    pub const RGBA8_UNORM_SRGB: Self = Self {
        encoding: ColorEncoding::Srgb,
        ..Self::RGBA8_UNORM
    };

    /// Returns true if every [`IdColor`] survives a store into this format.
    pub fn preserves_ids(&self) -> bool {
        self.channels == 4
            && self.bits_per_channel == 8
            && self.normalized
            && self.encoding == ColorEncoding::Linear
    }
}

/// Texture sampling used when the id target is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Point sampling.
    Nearest,
    /// Bilinear filtering.
    Linear,
}

/// Rendering path used for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Single forward pass, no intermediate buffers.
    Forward,
    /// Deferred shading with a G-buffer.
    Deferred,
}

/// View attributes forced while the id pass renders.
///
/// Every field has exactly one value under which ids survive the render
/// path; [`IdPassSettings::validate`] rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPassSettings {
    /// Solid clear color. Must decode to the background id.
    pub clear_color: IdColor,
    /// MSAA sample count. Averaging samples corrupts ids.
    pub sample_count: u32,
    /// Color blending. Mixing two ids yields a third.
    pub blending: bool,
    /// Sampling of the target.
    pub filter: TextureFilter,
    /// The id pass never needs a G-buffer.
    pub render_path: RenderPath,
}

impl Default for IdPassSettings {
    fn default() -> Self {
        Self {
            clear_color: IdColor::NONE,
            sample_count: 1,
            blending: false,
            filter: TextureFilter::Nearest,
            render_path: RenderPath::Forward,
        }
    }
}

impl IdPassSettings {
    /// Checks that ids will pass through the render unchanged.
    pub fn validate(&self) -> Result<()> {
        if self.clear_color != IdColor::NONE {
            return Err(PickError::UnsafeIdPass(format!(
                "clear color {:?} does not decode to the background id",
                self.clear_color.0
            )));
        }
        if self.sample_count != 1 {
            return Err(PickError::UnsafeIdPass(format!(
                "multisampling enabled ({} samples)",
                self.sample_count
            )));
        }
        if self.blending {
            return Err(PickError::UnsafeIdPass("blending enabled".into()));
        }
        if self.filter != TextureFilter::Nearest {
            return Err(PickError::UnsafeIdPass("target is filtered".into()));
        }
        if self.render_path != RenderPath::Forward {
            return Err(PickError::UnsafeIdPass("deferred render path".into()));
        }
        Ok(())
    }
}

/// Progress of an asynchronous readback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadbackStatus {
    /// Still in flight.
    Pending,
    /// Finished; tightly packed RGBA8 rows, top row first.
    Ready(Vec<u8>),
    /// Finished with an error.
    Failed(String),
}

/// An in-flight copy of an id target into host memory.
pub trait Readback {
    /// Checks for completion without blocking.
    ///
    /// Once `Ready` or `Failed` has been returned the readback is consumed
    /// and is not polled again.
    fn poll(&mut self) -> ReadbackStatus;
}

/// Graphics capabilities needed by [`crate::PickingSurface`].
pub trait PickingBackend {
    /// Off-screen color target the id pass renders into.
    type Target;
    /// Snapshot of the view's render target binding and attributes.
    type ViewState;
    /// Handle to an in-flight readback.
    type Readback: Readback;

    /// Allocates an id target of the given size.
    fn create_target(&mut self, size: UVec2) -> Result<Self::Target>;

    /// Reports the pixel format of `target`.
    fn target_format(&self, target: &Self::Target) -> TargetFormat;

    /// Captures the current binding and view attributes.
    fn save_view_state(&mut self) -> Self::ViewState;

    /// Restores a snapshot taken by [`Self::save_view_state`].
    fn restore_view_state(&mut self, state: Self::ViewState);

    /// Renders the scene into `target`, drawing materials matching `tag`
    /// with their id color and everything else as background.
    fn render_replacement(
        &mut self,
        target: &Self::Target,
        tag: &PassTag,
        settings: &IdPassSettings,
    ) -> Result<()>;

    /// Starts copying `target` into host memory.
    fn request_readback(&mut self, target: &Self::Target) -> Result<Self::Readback>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(IdPassSettings::default().validate().is_ok());
    }

    #[test]
    fn test_unsafe_settings_are_rejected() {
        let base = IdPassSettings::default();
        let cases = [
            IdPassSettings {
                clear_color: IdColor([0, 0, 0, 255]),
                ..base
            },
            IdPassSettings {
                sample_count: 4,
                ..base
            },
            IdPassSettings {
                blending: true,
                ..base
            },
            IdPassSettings {
                filter: TextureFilter::Linear,
                ..base
            },
            IdPassSettings {
                render_path: RenderPath::Deferred,
                ..base
            },
        ];
        for settings in cases {
            assert!(
                matches!(settings.validate(), Err(PickError::UnsafeIdPass(_))),
                "{settings:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_target_formats() {
        assert!(TargetFormat::RGBA8_UNORM.preserves_ids());
        assert!(!TargetFormat::RGBA8_UNORM_SRGB.preserves_ids());
        assert!(!TargetFormat {
            bits_per_channel: 16,
            ..TargetFormat::RGBA8_UNORM
        }
        .preserves_ids());
    }
}
