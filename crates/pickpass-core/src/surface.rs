//! Per-viewport picking surface.
//!
//! A [`PickingSurface`] is driven once per frame. Each frame it:
//!
//! 1. resizes its id target to `viewport / downscale` if needed,
//! 2. renders the id pass into the target with the view state saved and
//!    restored around it,
//! 3. pumps the readback: at most one copy is in flight, completion is
//!    polled and never waited on.
//!
//! Queries read the last completed copy, so results lag the screen by about
//! one frame.

use std::sync::Arc;

use glam::{UVec2, Vec2};

use crate::backend::{IdPassSettings, PickingBackend, Readback, ReadbackStatus};
use crate::codec::{IdColor, PickId, NO_PICK_ID};
use crate::context::PickingContext;
use crate::error::{PickError, Result};
use crate::handle::PickHandle;
use crate::options::PickingOptions;

/// A completed copy of the id target in host memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFrame {
    size: UVec2,
    pixels: Vec<u8>,
}

impl HostFrame {
    /// Size in texels.
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Raw RGBA8 texels, top row first.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the color stored at texel `(x, y)`.
    pub fn color_at(&self, texel: UVec2) -> Option<IdColor> {
        if texel.x >= self.size.x || texel.y >= self.size.y {
            return None;
        }
        let offset = (texel.y as usize * self.size.x as usize + texel.x as usize) * 4;
        IdColor::from_rgba8_slice(&self.pixels, offset)
    }
}

enum TransferState<R> {
    Idle,
    Pending(R),
}

/// Drives the id pass and readback for one viewport and answers pick queries.
pub struct PickingSurface<B: PickingBackend> {
    context: Arc<PickingContext>,
    options: PickingOptions,
    settings: IdPassSettings,
    size: UVec2,
    target: Option<B::Target>,
    host: Option<Arc<HostFrame>>,
    transfer: TransferState<B::Readback>,
    frames_received: u64,
}

impl<B: PickingBackend> PickingSurface<B> {
    /// Creates a surface.
    ///
    /// Fails if `options` are out of range, or if `options.pass_tag` differs
    /// from the tag the context's variant cache puts on pickable materials.
    pub fn new(context: Arc<PickingContext>, options: PickingOptions) -> Result<Self> {
        options.validate()?;
        match context.variant_tag() {
            Some(tag) if tag != options.pass_tag => {
                log::warn!(
                    "picking surface pass {} does not match variant tag {tag}",
                    options.pass_tag
                );
                return Err(PickError::PassTagMismatch {
                    surface: options.pass_tag.to_string(),
                    context: tag.to_string(),
                });
            }
            Some(_) => {}
            None => log::debug!("picking surface created before a variant cache is installed"),
        }
        Ok(Self {
            context,
            options,
            settings: IdPassSettings::default(),
            size: UVec2::ZERO,
            target: None,
            host: None,
            transfer: TransferState::Idle,
            frames_received: 0,
        })
    }

    /// Overrides the view attributes used for the id pass.
    ///
    /// The settings are validated before every render, so anything that
    /// would corrupt ids makes [`Self::frame`] fail instead.
    #[must_use]
    pub fn with_id_pass_settings(mut self, settings: IdPassSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The options this surface was created with.
    pub fn options(&self) -> &PickingOptions {
        &self.options
    }

    /// Current id target size. Zero before the first frame.
    pub fn target_size(&self) -> UVec2 {
        self.size
    }

    /// Returns true once a readback has completed for the current target.
    pub fn has_frame(&self) -> bool {
        self.host.is_some()
    }

    /// The last completed readback, shareable with other threads.
    pub fn latest_frame(&self) -> Option<Arc<HostFrame>> {
        self.host.clone()
    }

    /// Returns true while a readback is in flight.
    pub fn is_transfer_pending(&self) -> bool {
        matches!(self.transfer, TransferState::Pending(_))
    }

    /// Number of readbacks accepted so far.
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Runs one frame: resize, id pass, readback pump.
    pub fn frame(&mut self, backend: &mut B, viewport: UVec2) -> Result<()> {
        self.resize(backend, viewport)?;
        self.render_id_pass(backend)?;
        self.pump_transfer(backend);
        Ok(())
    }

    fn target_size_for(&self, viewport: UVec2) -> UVec2 {
        (viewport / self.options.downscale).max(UVec2::ONE)
    }

    fn resize(&mut self, backend: &mut B, viewport: UVec2) -> Result<()> {
        let size = self.target_size_for(viewport);
        if self.target.is_some() && size == self.size {
            return Ok(());
        }

        log::debug!(
            "picking target {}x{} -> {}x{} (viewport {}x{})",
            self.size.x,
            self.size.y,
            size.x,
            size.y,
            viewport.x,
            viewport.y
        );
        // Anything in flight was copied from the old target.
        self.transfer = TransferState::Idle;
        self.host = None;
        self.target = None;

        self.target = Some(backend.create_target(size)?);
        self.size = size;
        Ok(())
    }

    fn render_id_pass(&mut self, backend: &mut B) -> Result<()> {
        let Some(target) = self.target.as_ref() else {
            return Ok(());
        };

        self.settings.validate()?;
        let format = backend.target_format(target);
        if !format.preserves_ids() {
            return Err(PickError::UnsafeIdPass(format!(
                "target format {format:?} does not store ids exactly"
            )));
        }

        let saved = backend.save_view_state();
        let rendered = backend.render_replacement(target, &self.options.pass_tag, &self.settings);
        backend.restore_view_state(saved);
        rendered
    }

    fn pump_transfer(&mut self, backend: &mut B) {
        match std::mem::replace(&mut self.transfer, TransferState::Idle) {
            TransferState::Idle => self.request_transfer(backend),
            TransferState::Pending(mut readback) => match readback.poll() {
                ReadbackStatus::Pending => self.transfer = TransferState::Pending(readback),
                ReadbackStatus::Ready(pixels) => {
                    self.accept(pixels);
                    self.request_transfer(backend);
                }
                ReadbackStatus::Failed(reason) => {
                    log::warn!("picking readback failed, dropping frame: {reason}");
                    self.request_transfer(backend);
                }
            },
        }
    }

    fn request_transfer(&mut self, backend: &mut B) {
        debug_assert!(!self.is_transfer_pending());
        let Some(target) = self.target.as_ref() else {
            return;
        };
        match backend.request_readback(target) {
            Ok(readback) => self.transfer = TransferState::Pending(readback),
            Err(err) => log::warn!("could not start picking readback: {err}"),
        }
    }

    fn accept(&mut self, pixels: Vec<u8>) {
        let expected = self.size.x as usize * self.size.y as usize * 4;
        if pixels.len() != expected {
            log::warn!(
                "discarding picking readback of {} bytes, expected {expected}",
                pixels.len()
            );
            return;
        }
        // Swapped as a whole; readers never see a partially written frame.
        self.host = Some(Arc::new(HostFrame {
            size: self.size,
            pixels,
        }));
        self.frames_received += 1;
    }

    /// Returns the raw id visible at `screen` (in viewport pixels).
    ///
    /// `None` if no frame is available, the position is off target, or the
    /// texel is background.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn id_at(&self, screen: Vec2) -> Option<PickId> {
        let host = self.host.as_ref()?;
        if !screen.is_finite() || screen.x < 0.0 || screen.y < 0.0 {
            return None;
        }
        let texel = UVec2::new(screen.x as u32, screen.y as u32) / self.options.downscale;
        let id = host.color_at(texel)?.id();
        (id != NO_PICK_ID).then_some(id)
    }

    /// Returns the object visible at `screen` (in viewport pixels), if any.
    pub fn pick_at(&self, screen: Vec2) -> Option<Arc<dyn PickHandle>> {
        self.context.lookup(self.id_at(screen)?)
    }
}
