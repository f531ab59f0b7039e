//! Off-screen id target.

use glam::UVec2;
use pickpass_core::TargetFormat;

use crate::error::{RenderError, RenderResult};

/// Color format of the id target. Unorm, not sRGB, so ids are stored as written.
pub const ID_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Depth format used for occlusion between pickable surfaces.
pub const ID_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Id color texture plus its depth buffer.
pub struct IdTarget {
    size: UVec2,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

impl IdTarget {
    /// Creates a target of the given size.
    pub fn new(device: &wgpu::Device, size: UVec2) -> RenderResult<Self> {
        if size.x == 0 || size.y == 0 {
            return Err(RenderError::InvalidTargetSize {
                width: size.x,
                height: size.y,
            });
        }
        let extent = wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick Id Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ID_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick Id Depth Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ID_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            size,
            color,
            color_view,
            depth_view,
        })
    }

    /// Size in texels.
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// The id color texture.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.color
    }

    /// View used as the id pass color attachment.
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    /// View used as the id pass depth attachment.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// The target's format in backend-agnostic terms.
    pub fn format(&self) -> TargetFormat {
        target_format_of(self.color.format())
    }
}

/// Describes a wgpu color format for the id-safety check.
pub fn target_format_of(format: wgpu::TextureFormat) -> TargetFormat {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => TargetFormat::RGBA8_UNORM,
        wgpu::TextureFormat::Rgba8UnormSrgb => TargetFormat::RGBA8_UNORM_SRGB,
        wgpu::TextureFormat::Bgra8Unorm => TargetFormat {
            // Channel order differs from what the readback path expects.
            channels: 0,
            ..TargetFormat::RGBA8_UNORM
        },
        wgpu::TextureFormat::Bgra8UnormSrgb => TargetFormat {
            channels: 0,
            ..TargetFormat::RGBA8_UNORM_SRGB
        },
        _ => TargetFormat {
            channels: 0,
            bits_per_channel: 0,
            normalized: false,
            encoding: pickpass_core::ColorEncoding::Linear,
        },
    }
}
