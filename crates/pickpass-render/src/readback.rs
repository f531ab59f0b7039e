//! Non-blocking copy of the id target into host memory.
//!
//! A readback copies the whole target into a `MAP_READ` buffer and maps it.
//! Completion is checked with a non-blocking device poll; the map callback
//! may run on a driver thread, so its result is handed over through a shared
//! slot.

use std::sync::{Arc, Mutex, PoisonError};

use glam::UVec2;
use pickpass_core::{Readback, ReadbackStatus};

use crate::target::IdTarget;

const BYTES_PER_TEXEL: u32 = 4;

type MapSlot = Arc<Mutex<Option<Result<(), wgpu::BufferAsyncError>>>>;

/// Row pitch of the readback buffer for a target `width` texels wide.
///
/// `copy_texture_to_buffer` requires `bytes_per_row` to be a multiple of
/// `wgpu::COPY_BYTES_PER_ROW_ALIGNMENT` (256).
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_TEXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Removes the per-row padding from mapped readback data.
pub fn strip_row_padding(data: &[u8], size: UVec2, padded_row: u32) -> Vec<u8> {
    let row = (size.x * BYTES_PER_TEXEL) as usize;
    let padded_row = padded_row as usize;
    let mut pixels = Vec::with_capacity(row * size.y as usize);
    for chunk in data.chunks(padded_row).take(size.y as usize) {
        pixels.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
    pixels
}

/// An in-flight copy of an [`IdTarget`].
pub struct TextureReadback {
    device: wgpu::Device,
    buffer: wgpu::Buffer,
    size: UVec2,
    padded_row: u32,
    mapped: MapSlot,
}

impl TextureReadback {
    /// Submits the copy of `target` and starts mapping the result.
    pub fn start(device: &wgpu::Device, queue: &wgpu::Queue, target: &IdTarget) -> Self {
        let size = target.size();
        let padded_row = padded_bytes_per_row(size.x);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick Readback Buffer"),
            size: u64::from(padded_row) * u64::from(size.y),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pick Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(size.y),
                },
            },
            wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let mapped: MapSlot = Arc::default();
        let slot = Arc::clone(&mapped);
        buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        });

        Self {
            device: device.clone(),
            buffer,
            size,
            padded_row,
            mapped,
        }
    }

    /// Size of the copied target.
    pub fn size(&self) -> UVec2 {
        self.size
    }
}

impl Readback for TextureReadback {
    fn poll(&mut self) -> ReadbackStatus {
        // Drives map callbacks without waiting for outstanding work.
        let _ = self.device.poll(wgpu::PollType::Poll);

        let result = self
            .mapped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match result {
            None => ReadbackStatus::Pending,
            Some(Err(err)) => ReadbackStatus::Failed(err.to_string()),
            Some(Ok(())) => {
                let pixels = {
                    let data = self.buffer.slice(..).get_mapped_range();
                    strip_row_padding(&data, self.size, self.padded_row)
                };
                self.buffer.unmap();
                ReadbackStatus::Ready(pixels)
            }
        }
    }
}
